use miniyarn_utils::{impl_serialization_traits, DataType, FromFileString, ToFileString, ToHumanString};

use crate::{parse_identifier, Error, Ident, PackageLocator};

/// A dependency request: a name plus a reference that may still be a range,
/// a tag, a git treeish, or a path.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageRange {
    pub name: Ident,
    pub reference: String,
}

impl PackageRange {
    pub fn new(name: Ident, reference: impl Into<String>) -> PackageRange {
        PackageRange {name, reference: reference.into()}
    }

    pub fn with_reference(&self, reference: impl Into<String>) -> PackageRange {
        PackageRange {name: self.name.clone(), reference: reference.into()}
    }

    pub fn to_locator(&self) -> PackageLocator {
        PackageLocator::new(self.name.clone(), self.reference.clone())
    }
}

impl FromFileString for PackageRange {
    type Error = Error;

    /// A missing reference means the latest published version.
    fn from_file_string(src: &str) -> Result<Self, Self::Error> {
        let (name, reference) = parse_identifier(src)?;

        Ok(PackageRange::new(name, reference.unwrap_or_else(|| "latest".to_string())))
    }
}

impl ToFileString for PackageRange {
    fn to_file_string(&self) -> String {
        format!("{}@{}", self.name.as_str(), self.reference)
    }
}

impl ToHumanString for PackageRange {
    fn to_print_string(&self) -> String {
        format!("{}{}", self.name.to_print_string(), DataType::Reference.colorize(&format!("@{}", self.reference)))
    }
}

impl_serialization_traits!(PackageRange);
