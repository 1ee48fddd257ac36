use std::{io::Read, os::unix::fs::PermissionsExt};

use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use miniyarn_utils::{FromFileString, Path};

use crate::error::Error;

/// Timestamp written on every entry so that packing the same content twice
/// yields the same bytes (1985-10-26T08:15:00Z, as npm does).
const FIXED_MTIME: u64 = 499162500;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Symlink(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub mode: u32,
    pub kind: EntryKind,
    pub data: Vec<u8>,
}

impl Entry {
    pub fn file(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Entry {
        Entry {name: name.into(), mode: 0o644, kind: EntryKind::File, data: data.into()}
    }

    pub fn with_mode(self, mode: u32) -> Entry {
        Entry {mode, ..self}
    }

    fn normalized_mode(&self) -> u32 {
        match self.mode & 0o111 {
            0 => 0o644,
            _ => 0o755,
        }
    }
}

/// Turns a raw archive path into a clean relative one. Returns `None` for
/// paths designating the archive root itself.
fn normalize_entry_name(raw: &str) -> Result<Option<String>, Error> {
    let mut components = vec![];

    for component in raw.split('/') {
        match component {
            "" | "." => {},
            ".." => return Err(Error::UnsafeArchivePath(raw.to_string())),
            _ => components.push(component),
        }
    }

    match components.is_empty() {
        true => Ok(None),
        false => Ok(Some(components.join("/"))),
    }
}

/// Strips the virtual root from an entry name. Entries living under another
/// top-level directory get that directory stripped instead, since some
/// registries don't use `package/` as root; top-level files are discarded.
fn strip_virtual_root(name: &str, virtual_path: &str) -> Option<String> {
    if let Some(rest) = name.strip_prefix(virtual_path).and_then(|rest| rest.strip_prefix('/')) {
        return Some(rest.to_string());
    }

    name.split_once('/')
        .map(|(_, rest)| rest.to_string())
}

/// Lists the files and symlinks of a gzipped tarball. When `virtual_path` is
/// set, the entries are re-rooted at this directory.
pub fn read_entries(bytes: &[u8], virtual_path: Option<&str>) -> Result<Vec<Entry>, Error> {
    let virtual_path = virtual_path
        .map(|virtual_path| virtual_path.trim_matches('/'))
        .filter(|virtual_path| !virtual_path.is_empty());

    let mut archive
        = tar::Archive::new(GzDecoder::new(bytes));

    let mut entries
        = vec![];

    let archive_entries = archive.entries()
        .map_err(|err| Error::InvalidArchive(err.to_string()))?;

    for entry in archive_entries {
        let mut entry = entry
            .map_err(|err| Error::InvalidArchive(err.to_string()))?;

        let kind = match entry.header().entry_type() {
            tar::EntryType::Regular | tar::EntryType::Continuous => EntryKind::File,

            tar::EntryType::Symlink => {
                let target = entry.link_name()
                    .map_err(|err| Error::InvalidArchive(err.to_string()))?
                    .map(|target| target.to_string_lossy().to_string())
                    .unwrap_or_default();

                EntryKind::Symlink(target)
            },

            _ => continue,
        };

        let raw_name = entry.path()
            .map_err(|err| Error::InvalidArchive(err.to_string()))?
            .to_string_lossy()
            .to_string();

        let Some(name) = normalize_entry_name(&raw_name)? else {
            continue;
        };

        let name = match virtual_path {
            Some(virtual_path) => match strip_virtual_root(&name, virtual_path) {
                Some(name) => name,
                None => continue,
            },
            None => name,
        };

        let mode
            = entry.header().mode().unwrap_or(0o644);

        let mut data
            = vec![];

        if kind == EntryKind::File {
            entry.read_to_end(&mut data)?;
        }

        entries.push(Entry {name, mode, kind, data});
    }

    Ok(entries)
}

/// Reads a single file from a gzipped tarball without extracting it.
pub fn read_file(bytes: &[u8], name: &str) -> Result<Option<Vec<u8>>, Error> {
    let entry = read_entries(bytes, None)?
        .into_iter()
        .find(|entry| entry.name == name && entry.kind == EntryKind::File);

    Ok(entry.map(|entry| entry.data))
}

/// Serializes the entries into a gzipped tarball. Entries are sorted and all
/// metadata except the executable bit is normalized, so equal inputs always
/// give equal archives.
pub fn write_tgz(entries: &[Entry]) -> Result<Vec<u8>, Error> {
    let mut sorted_entries
        = entries.iter().collect::<Vec<_>>();

    sorted_entries.sort_by(|a, b| a.name.cmp(&b.name));

    let mut builder
        = tar::Builder::new(GzEncoder::new(vec![], Compression::default()));

    for entry in sorted_entries {
        let mut header
            = tar::Header::new_gnu();

        header.set_mtime(FIXED_MTIME);
        header.set_uid(0);
        header.set_gid(0);

        match &entry.kind {
            EntryKind::File => {
                header.set_entry_type(tar::EntryType::Regular);
                header.set_mode(entry.normalized_mode());
                header.set_size(entry.data.len() as u64);

                builder.append_data(&mut header, &entry.name, entry.data.as_slice())?;
            },

            EntryKind::Symlink(target) => {
                header.set_entry_type(tar::EntryType::Symlink);
                header.set_mode(0o777);
                header.set_size(0);

                builder.append_link(&mut header, &entry.name, target)?;
            },
        }
    }

    let encoder
        = builder.into_inner()?;

    Ok(encoder.finish()?)
}

/// Writes the entries below `destination`. Symlinks pointing outside of the
/// destination are rejected.
pub fn extract_entries(entries: &[Entry], destination: &Path) -> Result<(), Error> {
    destination.fs_create_dir_all()?;

    for entry in entries {
        let Some(name) = normalize_entry_name(&entry.name)? else {
            continue;
        };

        let entry_path
            = destination.with_join_str(&name);

        entry_path.fs_create_parent()?;

        match &entry.kind {
            EntryKind::File => {
                entry_path
                    .fs_write(&entry.data)?
                    .fs_set_permissions(std::fs::Permissions::from_mode(entry.normalized_mode()))?;
            },

            EntryKind::Symlink(target) => {
                let target = Path::from_file_string(target)?;
                let parent = entry_path.dirname().unwrap_or_else(|| destination.clone());

                if target.is_absolute() || !destination.contains(&parent.with_join(&target)) {
                    return Err(Error::UnsafeArchivePath(entry.name.clone()));
                }

                entry_path.fs_ensure_symlink(&target)?;
            },
        }
    }

    Ok(())
}

pub fn extract_tgz(bytes: &[u8], destination: &Path) -> Result<(), Error> {
    extract_entries(&read_entries(bytes, None)?, destination)
}

/// Collects the content of a directory as archive entries named relative to
/// it. The filter receives relative paths and can skip whole subtrees.
pub fn pack_directory(source: &Path, filter: &dyn Fn(&Path) -> bool) -> Result<Vec<Entry>, Error> {
    let mut entries = vec![];

    collect_entries(source, &Path::empty(), filter, &mut entries)?;

    Ok(entries)
}

fn collect_entries(source: &Path, relative_path: &Path, filter: &dyn Fn(&Path) -> bool, entries: &mut Vec<Entry>) -> Result<(), Error> {
    for name in source.with_join(relative_path).fs_read_dir_names()? {
        let entry_relative_path
            = relative_path.with_join_str(&name);

        if !filter(&entry_relative_path) {
            continue;
        }

        let entry_path
            = source.with_join(&entry_relative_path);
        let metadata
            = entry_path.fs_symlink_metadata()?;

        if metadata.is_symlink() {
            let target = std::fs::read_link(entry_path.to_path_buf())?
                .to_string_lossy()
                .to_string();

            entries.push(Entry {
                name: entry_relative_path.as_str().to_string(),
                mode: 0o777,
                kind: EntryKind::Symlink(target),
                data: vec![],
            });
        } else if metadata.is_dir() {
            collect_entries(source, &entry_relative_path, filter, entries)?;
        } else {
            entries.push(Entry {
                name: entry_relative_path.as_str().to_string(),
                mode: metadata.permissions().mode(),
                kind: EntryKind::File,
                data: entry_path.fs_read()?,
            });
        }
    }

    Ok(())
}

/// Moves every entry below `prefix`.
pub fn with_prefix(entries: Vec<Entry>, prefix: &str) -> Vec<Entry> {
    entries.into_iter()
        .map(|entry| Entry {name: format!("{}/{}", prefix, entry.name), ..entry})
        .collect()
}
