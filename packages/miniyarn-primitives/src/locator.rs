use std::sync::LazyLock;

use miniyarn_utils::{DataType, Hash64, ToFileString, ToHumanString};

use crate::Ident;

static SLUG_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"[^a-zA-Z0-9._-]+").unwrap()
});

const SLUG_PREFIX_MAX_LENGTH: usize = 64;

static DASHES_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"-+").unwrap()
});

/// The identity of a resolved package. The root package of a project is the
/// only one without a reference, and may lack a name too.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageLocator {
    pub name: Option<Ident>,
    pub reference: Option<String>,
}

impl PackageLocator {
    pub fn new(name: Ident, reference: impl Into<String>) -> PackageLocator {
        PackageLocator {name: Some(name), reference: Some(reference.into())}
    }

    pub fn root(name: Option<Ident>) -> PackageLocator {
        PackageLocator {name, reference: None}
    }

    pub fn with_reference(&self, reference: impl Into<String>) -> PackageLocator {
        PackageLocator {name: self.name.clone(), reference: Some(reference.into())}
    }

    pub fn is_root(&self) -> bool {
        self.reference.is_none()
    }

    /// Filesystem-safe identifier of the reference: a sanitized prefix for
    /// readability followed by a digest of the full reference. Only depends on
    /// the locator, so cache and mirror paths can be computed without I/O.
    pub fn slug(&self) -> Option<String> {
        let reference
            = self.reference.as_deref()?;

        let sanitized
            = SLUG_REGEX.replace_all(reference, "-");
        let collapsed
            = DASHES_REGEX.replace_all(&sanitized, "-");

        // Sanitized references are ascii-only
        let prefix
            = &collapsed[..collapsed.len().min(SLUG_PREFIX_MAX_LENGTH)];

        let hash
            = Hash64::from_data(reference.as_bytes());

        Some(format!("{}-{}", prefix.trim_matches('-'), hash.short()))
    }
}

impl ToFileString for PackageLocator {
    fn to_file_string(&self) -> String {
        format!(
            "{}@{}",
            self.name.as_ref().map(|name| name.as_str()).unwrap_or("<unnamed>"),
            self.reference.as_deref().unwrap_or("<unversioned>"),
        )
    }
}

impl ToHumanString for PackageLocator {
    fn to_print_string(&self) -> String {
        let name = match &self.name {
            Some(name) => name.to_print_string(),
            None => DataType::Code.colorize("<unnamed>"),
        };

        format!("{}{}", name, DataType::Reference.colorize(&format!("@{}", self.reference.as_deref().unwrap_or("<unversioned>"))))
    }
}

impl std::fmt::Display for PackageLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_file_string())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("1.0.0", "1.0.0-")]
    #[case("https://example.com/pkg.tgz", "https-example.com-pkg.tgz-")]
    #[case("/abs/path", "abs-path-")]
    #[case("git@github.com:a/b.git#v1", "git-github.com-a-b.git-v1-")]
    fn test_slug_prefix(#[case] reference: &str, #[case] prefix: &str) {
        let locator = PackageLocator::new(Ident::new("pkg"), reference);
        let slug = locator.slug().unwrap();

        assert!(slug.starts_with(prefix), "{} should start with {}", slug, prefix);
        assert_eq!(slug.len(), prefix.len() + 16);
    }

    #[test]
    fn test_slug_of_long_reference() {
        let long_url = format!("https://example.com/{}/pkg-1.0.0.tgz", "nested/".repeat(60));
        let slug = PackageLocator::new(Ident::new("pkg"), long_url.as_str()).slug().unwrap();

        assert!(slug.len() <= SLUG_PREFIX_MAX_LENGTH + 17);
        assert!(slug.starts_with("https-example.com-nested-nested-"));

        let other_url = long_url.replace("1.0.0", "1.0.1");
        assert_ne!(PackageLocator::new(Ident::new("pkg"), other_url).slug().unwrap(), slug);
    }

    #[test]
    fn test_slug_is_pure() {
        let a = PackageLocator::new(Ident::new("pkg"), "1.0.0");
        let b = PackageLocator::new(Ident::new("other"), "1.0.0");

        assert_eq!(a.slug(), b.slug());
        assert_ne!(a.slug(), a.with_reference("1.0.1").slug());
        assert_eq!(PackageLocator::root(None).slug(), None);
    }

    #[test]
    fn test_identifier() {
        assert_eq!(PackageLocator::new(Ident::new("pkg"), "1.0.0").to_file_string(), "pkg@1.0.0");
        assert_eq!(PackageLocator::root(None).to_file_string(), "<unnamed>@<unversioned>");
    }
}
