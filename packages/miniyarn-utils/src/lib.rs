mod colors;
mod errors;
mod glob;
mod hash;
mod misc;
mod path;

pub use colors::DataType;
pub use errors::{render_backtrace, PathError};
pub use glob::{Glob, GlobError, GlobList};
pub use hash::Hash64;
pub use misc::OkMissing;
pub use path::Path;

pub trait FromFileString {
    type Error;

    fn from_file_string(s: &str) -> Result<Self, Self::Error>
        where Self: Sized;
}

pub trait ToFileString {
    fn to_file_string(&self) -> String;
}

pub trait ToHumanString {
    fn to_print_string(&self) -> String;
}

impl FromFileString for String {
    type Error = std::convert::Infallible;

    fn from_file_string(s: &str) -> Result<Self, Self::Error> {
        Ok(s.to_string())
    }
}

impl ToFileString for String {
    fn to_file_string(&self) -> String {
        self.clone()
    }
}

impl ToHumanString for String {
    fn to_print_string(&self) -> String {
        DataType::String.colorize(&serde_json::to_string(self).unwrap_or_else(|_| self.clone()))
    }
}

#[macro_export]
macro_rules! impl_serialization_traits(($type:ty) => {
    impl std::str::FromStr for $type {
        type Err = <$type as $crate::FromFileString>::Error;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            <$type as $crate::FromFileString>::from_file_string(s)
        }
    }

    impl std::convert::TryFrom<&str> for $type {
        type Error = <$type as $crate::FromFileString>::Error;

        fn try_from(value: &str) -> Result<Self, Self::Error> {
            <$type as $crate::FromFileString>::from_file_string(value)
        }
    }

    impl serde::Serialize for $type {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error> where S: serde::Serializer {
            serializer.serialize_str(&$crate::ToFileString::to_file_string(self))
        }
    }

    impl<'de> serde::Deserialize<'de> for $type {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error> where D: serde::Deserializer<'de> {
            let s = <String as serde::Deserialize>::deserialize(deserializer)?;
            <$type as $crate::FromFileString>::from_file_string(&s).map_err(serde::de::Error::custom)
        }
    }

    impl std::fmt::Display for $type {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", $crate::ToFileString::to_file_string(self))
        }
    }
});
