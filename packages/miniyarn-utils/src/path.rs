use std::os::unix::ffi::OsStrExt;

use crate::{impl_serialization_traits, DataType, FromFileString, OkMissing, PathError, ToFileString, ToHumanString};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path {
    path: String,
}

fn resolve_path(input: &str) -> String {
    let is_absolute
        = input.starts_with('/');

    let mut components: Vec<&str>
        = Vec::new();

    for component in input.split('/') {
        match component {
            "" | "." => {},

            ".." => match components.last().copied() {
                Some("..") | None if !is_absolute => components.push(".."),
                Some(_) => { components.pop(); },
                None => {},
            },

            _ => components.push(component),
        }
    }

    let joined
        = components.join("/");

    match (is_absolute, joined.is_empty()) {
        (true, _) => format!("/{}", joined),
        (false, true) if !input.is_empty() => ".".to_string(),
        (false, _) => joined,
    }
}

impl Path {
    pub fn temp_dir_pattern(str: &str) -> Result<Path, PathError> {
        let name = str.find("<>").map_or_else(|| str.to_string(), |index| {
            let before = &str[..index];
            let after = &str[index + 2..];

            let nonce = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|duration| duration.as_nanos())
                .unwrap_or_default();

            format!("{}{:032x}{}", before, nonce, after)
        });

        let mut iteration: usize = 0;

        loop {
            let dir
                = Path::temp_root_dir()?
                    .with_join_str(format!("{}-{}-{}", name, std::process::id(), iteration));

            match dir.fs_create_dir() {
                Ok(_) => {
                    return Ok(dir);
                },

                Err(e) if e.io_kind() == Some(std::io::ErrorKind::AlreadyExists) => {
                    iteration += 1;
                },

                Err(e) => {
                    return Err(e);
                },
            }
        }
    }

    pub fn temp_root_dir() -> Result<Path, PathError> {
        Path::try_from(std::env::temp_dir())
    }

    pub fn temp_dir() -> Result<Path, PathError> {
        Self::temp_dir_pattern("miniyarn-<>")
    }

    /// Reserves a fresh file path inside its own temporary directory. The file
    /// itself isn't created.
    pub fn temp_file(name: &str) -> Result<Path, PathError> {
        Ok(Self::temp_dir()?.with_join_str(name))
    }

    pub fn current_dir() -> Result<Path, PathError> {
        Path::try_from(std::env::current_dir()?)
    }

    pub fn home_dir() -> Result<Option<Path>, PathError> {
        std::env::var("HOME")
            .ok()
            .filter(|s| !s.is_empty())
            .map(|s| Path::try_from(s.as_str()))
            .transpose()
    }

    pub fn empty() -> Self {
        Path {path: "".to_string()}
    }

    pub fn root() -> Self {
        Path {path: "/".to_string()}
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    pub fn dirname(&self) -> Option<Path> {
        if self.is_root() || self.path.is_empty() {
            return None;
        }

        match self.path.rfind('/') {
            Some(0) => Some(Path::root()),
            Some(index) => Some(Path {path: self.path[..index].to_string()}),
            None => Some(Path {path: ".".to_string()}),
        }
    }

    pub fn basename(&self) -> Option<&str> {
        let first_basename_char = self.path
            .rfind('/')
            .map(|i| i + 1)
            .unwrap_or(0);

        if first_basename_char < self.path.len() {
            Some(&self.path[first_basename_char..])
        } else {
            None
        }
    }

    pub fn extname(&self) -> Option<&str> {
        self.basename().and_then(|basename| {
            match basename.rfind('.') {
                Some(0) | None => None,
                Some(last_dot) => Some(&basename[last_dot..]),
            }
        })
    }

    pub fn as_str(&self) -> &str {
        self.path.as_str()
    }

    pub fn to_path_buf(&self) -> std::path::PathBuf {
        std::path::PathBuf::from(&self.path)
    }

    pub fn is_root(&self) -> bool {
        self.path == "/"
    }

    pub fn is_absolute(&self) -> bool {
        self.path.starts_with('/')
    }

    pub fn is_relative(&self) -> bool {
        !self.is_absolute()
    }

    pub fn is_extern(&self) -> bool {
        self.path.starts_with("../") || self.path == ".."
    }

    pub fn is_forward(&self) -> bool {
        self.is_relative() && !self.is_extern()
    }

    pub fn to_home_string(&self) -> String {
        let home
            = Path::home_dir()
                .unwrap_or_default();

        if let Some(home) = home {
            if let Some(relative_path) = self.forward_relative_to(&home) {
                return format!("~/{}", relative_path.to_file_string());
            }
        }

        self.to_file_string()
    }

    pub fn fs_create_parent(&self) -> Result<&Self, PathError> {
        if let Some(parent) = self.dirname() {
            parent.fs_create_dir_all()?;
        }

        Ok(self)
    }

    pub fn fs_create_dir_all(&self) -> Result<&Self, PathError> {
        std::fs::create_dir_all(&self.path)?;
        Ok(self)
    }

    pub fn fs_create_dir(&self) -> Result<&Self, PathError> {
        std::fs::create_dir(&self.path)?;
        Ok(self)
    }

    pub fn fs_set_permissions(&self, permissions: std::fs::Permissions) -> Result<&Self, PathError> {
        std::fs::set_permissions(&self.path, permissions)?;
        Ok(self)
    }

    pub fn fs_metadata(&self) -> Result<std::fs::Metadata, PathError> {
        Ok(std::fs::metadata(&self.path)?)
    }

    pub fn fs_symlink_metadata(&self) -> Result<std::fs::Metadata, PathError> {
        Ok(std::fs::symlink_metadata(&self.path)?)
    }

    pub fn fs_exists(&self) -> bool {
        self.fs_symlink_metadata().is_ok()
    }

    pub fn fs_is_file(&self) -> bool {
        self.fs_metadata().map(|m| m.is_file()).unwrap_or(false)
    }

    pub fn fs_is_dir(&self) -> bool {
        self.fs_metadata().map(|m| m.is_dir()).unwrap_or(false)
    }

    pub fn if_exists(&self) -> Option<Path> {
        if self.fs_exists() {
            Some(self.clone())
        } else {
            None
        }
    }

    pub fn if_file(&self) -> Option<Path> {
        if self.fs_is_file() {
            Some(self.clone())
        } else {
            None
        }
    }

    pub fn if_dir(&self) -> Option<Path> {
        if self.fs_is_dir() {
            Some(self.clone())
        } else {
            None
        }
    }

    pub fn fs_read(&self) -> Result<Vec<u8>, PathError> {
        Ok(std::fs::read(self.to_path_buf())?)
    }

    pub fn fs_read_text(&self) -> Result<String, PathError> {
        Ok(std::fs::read_to_string(self.to_path_buf())?)
    }

    pub fn fs_read_dir(&self) -> Result<std::fs::ReadDir, PathError> {
        Ok(std::fs::read_dir(&self.path)?)
    }

    /// Lists the entry names of the directory, sorted.
    pub fn fs_read_dir_names(&self) -> Result<Vec<String>, PathError> {
        let mut names
            = Vec::new();

        for entry in self.fs_read_dir()? {
            let entry = entry?;
            names.push(std::str::from_utf8(entry.file_name().as_bytes())?.to_string());
        }

        names.sort();
        Ok(names)
    }

    pub fn fs_write<T: AsRef<[u8]>>(&self, data: T) -> Result<&Self, PathError> {
        std::fs::write(self.to_path_buf(), data)?;
        Ok(self)
    }

    pub fn fs_write_text<T: AsRef<str>>(&self, text: T) -> Result<&Self, PathError> {
        self.fs_write(text.as_ref().as_bytes())
    }

    pub fn fs_set_executable(&self) -> Result<&Self, PathError> {
        use std::os::unix::fs::PermissionsExt;

        self.fs_set_permissions(std::fs::Permissions::from_mode(0o755))
    }

    pub fn fs_rename(&self, new_path: &Path) -> Result<&Self, PathError> {
        std::fs::rename(self.to_path_buf(), new_path.to_path_buf())?;
        Ok(self)
    }

    pub fn fs_copy_file(&self, new_path: &Path) -> Result<&Self, PathError> {
        std::fs::copy(self.to_path_buf(), new_path.to_path_buf())?;
        Ok(self)
    }

    pub fn fs_copy(&self, new_path: &Path) -> Result<&Self, PathError> {
        self.fs_copy_filtered(new_path, &|_| true)
    }

    /// Recursively copies the entry to `new_path`. The filter receives each
    /// entry's path relative to `self` and returns false to skip it (and, for
    /// directories, their content). Symlinks are copied as symlinks.
    pub fn fs_copy_filtered(&self, new_path: &Path, filter: &dyn Fn(&Path) -> bool) -> Result<&Self, PathError> {
        self.copy_entry(new_path, &Path::empty(), filter)?;
        Ok(self)
    }

    fn copy_entry(&self, new_path: &Path, relative_path: &Path, filter: &dyn Fn(&Path) -> bool) -> Result<(), PathError> {
        let metadata
            = self.fs_symlink_metadata()?;

        if metadata.is_symlink() {
            let target
                = Path::try_from(std::fs::read_link(self.to_path_buf())?)?;

            new_path.fs_create_parent()?;
            new_path.fs_symlink(&target)?;
        } else if metadata.is_dir() {
            new_path.fs_create_dir_all()?;

            for name in self.fs_read_dir_names()? {
                let entry_relative_path
                    = relative_path.with_join_str(&name);

                if !filter(&entry_relative_path) {
                    continue;
                }

                self.with_join_str(&name)
                    .copy_entry(&new_path.with_join_str(&name), &entry_relative_path, filter)?;
            }
        } else {
            new_path.fs_create_parent()?;
            std::fs::copy(self.to_path_buf(), new_path.to_path_buf())?;
        }

        Ok(())
    }

    pub fn fs_move(&self, new_path: &Path) -> Result<&Self, PathError> {
        new_path.fs_create_parent()?;

        match std::fs::rename(self.to_path_buf(), new_path.to_path_buf()) {
            Ok(_) => Ok(self),
            Err(err) if err.kind() == std::io::ErrorKind::CrossesDevices => {
                self.fs_copy(new_path)?;
                self.fs_rm()
            },
            Err(err) => Err(err.into()),
        }
    }

    pub fn fs_rm_file(&self) -> Result<&Self, PathError> {
        std::fs::remove_file(self.to_path_buf())?;
        Ok(self)
    }

    pub fn fs_rm(&self) -> Result<&Self, PathError> {
        let metadata
            = self.fs_symlink_metadata()?;

        match metadata.is_dir() {
            true => std::fs::remove_dir_all(self.to_path_buf()),
            false => std::fs::remove_file(self.to_path_buf()),
        }?;

        Ok(self)
    }

    /// Removes the entry, silently succeeding if it didn't exist.
    pub fn fs_rm_if_exists(&self) -> Result<&Self, PathError> {
        self.fs_rm().ok_missing()?;
        Ok(self)
    }

    pub fn fs_symlink(&self, target: &Path) -> Result<&Self, PathError> {
        std::os::unix::fs::symlink(&target.path, &self.path)?;
        Ok(self)
    }

    /// Creates a symlink at `self` pointing to `target`, replacing whatever
    /// was already there.
    pub fn fs_ensure_symlink(&self, target: &Path) -> Result<&Self, PathError> {
        self.fs_create_parent()?;
        self.fs_rm_if_exists()?;
        self.fs_symlink(target)
    }

    pub fn with_join(&self, other: &Path) -> Path {
        let mut copy = self.clone();
        copy.join(other);
        copy
    }

    pub fn with_join_str<T>(&self, other: T) -> Path
    where
        T: AsRef<str>,
    {
        let mut copy = self.clone();
        copy.join_str(other);
        copy
    }

    pub fn join(&mut self, other: &Path) -> &mut Self {
        if !other.path.is_empty() {
            if self.path.is_empty() || other.is_absolute() {
                self.path = other.path.clone();
            } else {
                self.path = resolve_path(&format!("{}/{}", self.path, other.path));
            }
        }

        self
    }

    pub fn join_str<T>(&mut self, other: T) -> &mut Self where T: AsRef<str> {
        self.join(&Path {path: resolve_path(other.as_ref())})
    }

    pub fn contains(&self, other: &Path) -> bool {
        other == self || self.is_root() || other.path.starts_with(&format!("{}/", self.path))
    }

    pub fn forward_relative_to(&self, other: &Path) -> Option<Path> {
        if other.contains(self) {
            Some(self.relative_to(other))
        } else {
            None
        }
    }

    /// Computes the path that leads from `other` to `self`. Both must be
    /// absolute; relative inputs are compared component-wise as-is.
    pub fn relative_to(&self, other: &Path) -> Path {
        let self_components: Vec<&str> = self.path.split('/').filter(|s| !s.is_empty()).collect();
        let other_components: Vec<&str> = other.path.split('/').filter(|s| !s.is_empty()).collect();

        let common_prefix_length = self_components.iter()
            .zip(other_components.iter())
            .take_while(|(a, b)| a == b)
            .count();

        let mut relative_path = vec![];

        for _ in common_prefix_length..other_components.len() {
            relative_path.push("..");
        }

        for component in self_components[common_prefix_length..].iter() {
            relative_path.push(*component);
        }

        Path {path: relative_path.join("/")}
    }

    /// Resolves the path against `base` unless it's already absolute.
    pub fn resolve_from(&self, base: &Path) -> Path {
        base.with_join(self)
    }
}

impl Default for Path {
    fn default() -> Self {
        Path::empty()
    }
}

impl TryFrom<&std::ffi::OsStr> for Path {
    type Error = PathError;

    fn try_from(value: &std::ffi::OsStr) -> Result<Self, Self::Error> {
        Ok(Path {path: resolve_path(std::str::from_utf8(value.as_bytes())?)})
    }
}

impl TryFrom<std::path::PathBuf> for Path {
    type Error = PathError;

    fn try_from(value: std::path::PathBuf) -> Result<Self, Self::Error> {
        Path::try_from(value.as_os_str())
    }
}

impl TryFrom<&std::path::Path> for Path {
    type Error = PathError;

    fn try_from(value: &std::path::Path) -> Result<Self, Self::Error> {
        Path::try_from(value.as_os_str())
    }
}

impl FromFileString for Path {
    type Error = PathError;

    fn from_file_string(s: &str) -> Result<Self, Self::Error> {
        Ok(Path {path: resolve_path(s)})
    }
}

impl ToFileString for Path {
    fn to_file_string(&self) -> String {
        self.path.clone()
    }
}

impl ToHumanString for Path {
    fn to_print_string(&self) -> String {
        DataType::Path.colorize(&self.to_home_string())
    }
}

impl_serialization_traits!(Path);
