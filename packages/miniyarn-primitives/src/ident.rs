use std::sync::LazyLock;

use colored::Colorize;
use miniyarn_utils::{impl_serialization_traits, DataType, FromFileString, ToFileString, ToHumanString};

use crate::Error;

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ident(String);

impl Ident {
    pub fn new<P: AsRef<str>>(full: P) -> Ident {
        Ident(full.as_ref().to_string())
    }

    pub fn scope(&self) -> Option<&str> {
        self.0.split_once('/').map(|(scope, _)| scope)
    }

    pub fn name(&self) -> &str {
        self.0.split_once('/').map(|(_, name)| name).unwrap_or(self.0.as_str())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn slug(&self) -> String {
        self.0.replace('/', "-")
    }

    /// Registry urls encode the scope separator (`@scope%2fname`).
    pub fn registry_path(&self) -> String {
        self.0.replace('/', "%2f")
    }
}

impl AsRef<str> for Ident {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

static IDENTIFIER_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"(?i)^((?:@([a-z0-9][a-z0-9_.-]*)/)?([a-z0-9][a-z0-9_.-]*))(?:@(.+))?$").unwrap()
});

/// Splits `name@reference` (with an optional scope) into its parts.
pub fn parse_identifier(src: &str) -> Result<(Ident, Option<String>), Error> {
    let captures = IDENTIFIER_REGEX.captures(src)
        .ok_or_else(|| Error::InvalidIdentifier(src.to_string()))?;

    let name
        = Ident::new(&captures[1]);
    let reference
        = captures.get(4).map(|m| m.as_str().to_string());

    Ok((name, reference))
}

impl FromFileString for Ident {
    type Error = Error;

    fn from_file_string(src: &str) -> Result<Self, Self::Error> {
        match parse_identifier(src) {
            Ok((ident, None)) => Ok(ident),
            _ => Err(Error::InvalidIdent(src.to_string())),
        }
    }
}

impl ToFileString for Ident {
    fn to_file_string(&self) -> String {
        self.0.clone()
    }
}

impl ToHumanString for Ident {
    fn to_print_string(&self) -> String {
        match self.scope() {
            Some(scope) => format!("{}{}", DataType::Ident.colorize(&format!("{}/", scope)), DataType::Ident.colorize(self.name()).bold()),
            None => DataType::Ident.colorize(self.name()).bold().to_string(),
        }
    }
}

impl_serialization_traits!(Ident);

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("no-deps", "no-deps", None, None)]
    #[case("no-deps@1.0.0", "no-deps", None, Some("1.0.0"))]
    #[case("@scope/pkg", "@scope/pkg", Some("@scope"), None)]
    #[case("@scope/pkg@^2.0.0", "@scope/pkg", Some("@scope"), Some("^2.0.0"))]
    #[case("pkg@git+ssh://git@github.com/a/b.git#v1", "pkg", None, Some("git+ssh://git@github.com/a/b.git#v1"))]
    fn test_parse_identifier(#[case] src: &str, #[case] name: &str, #[case] scope: Option<&str>, #[case] reference: Option<&str>) {
        let (ident, parsed_reference) = parse_identifier(src).unwrap();

        assert_eq!(ident.as_str(), name);
        assert_eq!(ident.scope(), scope);
        assert_eq!(parsed_reference.as_deref(), reference);
    }

    #[rstest]
    #[case("")]
    #[case("@scope")]
    #[case("-leading")]
    #[case("with space")]
    fn test_invalid_ident(#[case] src: &str) {
        assert!(Ident::from_file_string(src).is_err());
    }

    #[test]
    fn test_registry_path() {
        assert_eq!(Ident::new("@scope/pkg").registry_path(), "@scope%2fpkg");
        assert_eq!(Ident::new("pkg").registry_path(), "pkg");
    }
}
