use miniyarn_utils::{impl_serialization_traits, DataType, FromFileString, ToFileString, ToHumanString};

use crate::{extract::extract_version, Error};

#[cfg(test)]
#[path = "./version.test.rs"]
mod version_tests;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VersionRc {
    Number(u32),
    String(String),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub rc: Option<Vec<VersionRc>>,
}

impl Version {
    pub fn new() -> Version {
        Version::default()
    }

    pub fn new_from_components(major: u32, minor: u32, patch: u32, rc: Option<Vec<VersionRc>>) -> Version {
        Version {
            major,
            minor,
            patch,
            rc,
        }
    }

    pub fn next_major(&self) -> Version {
        Version::new_from_components(self.major + 1, 0, 0, None)
    }

    pub fn next_minor(&self) -> Version {
        Version::new_from_components(self.major, self.minor + 1, 0, None)
    }

    pub fn next_patch(&self) -> Version {
        Version::new_from_components(self.major, self.minor, self.patch + 1, None)
    }

    pub fn is_prerelease(&self) -> bool {
        self.rc.is_some()
    }

    pub fn same_release(&self, other: &Version) -> bool {
        (self.major, self.minor, self.patch) == (other.major, other.minor, other.patch)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.major, self.minor, self.patch, self.rc.is_none(), &self.rc)
            .cmp(&(other.major, other.minor, other.patch, other.rc.is_none(), &other.rc))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl FromFileString for Version {
    type Error = Error;

    fn from_file_string(src: &str) -> Result<Self, Error> {
        let mut iter = src.chars().peekable();

        let version = extract_version(&mut iter)
            .ok_or_else(|| Error::InvalidVersion(src.to_string()))?;

        if iter.peek().is_some() {
            return Err(Error::InvalidVersion(src.to_string()));
        }

        Ok(version)
    }
}

impl ToFileString for Version {
    fn to_file_string(&self) -> String {
        let mut res = format!("{}.{}.{}", self.major, self.minor, self.patch);

        if let Some(rc) = &self.rc {
            let segments = rc.iter().map(|segment| match segment {
                VersionRc::Number(n) => n.to_string(),
                VersionRc::String(s) => s.clone(),
            }).collect::<Vec<_>>();

            res.push('-');
            res.push_str(&segments.join("."));
        }

        res
    }
}

impl ToHumanString for Version {
    fn to_print_string(&self) -> String {
        DataType::Number.colorize(&self.to_file_string())
    }
}

impl_serialization_traits!(Version);
