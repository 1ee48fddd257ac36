use rstest::rstest;
use miniyarn_utils::{FromFileString, ToFileString};

use crate::{Version, VersionRc};

#[rstest]
#[case("1.2.3", Version::new_from_components(1, 2, 3, None))]
#[case("0.0.0", Version::new_from_components(0, 0, 0, None))]
#[case("1.2.3-rc.1", Version::new_from_components(1, 2, 3, Some(vec![VersionRc::String("rc".to_string()), VersionRc::Number(1)])))]
#[case("1.2.3-0", Version::new_from_components(1, 2, 3, Some(vec![VersionRc::Number(0)])))]
#[case("1.2.3+build.5", Version::new_from_components(1, 2, 3, None))]
fn test_parse(#[case] input: &str, #[case] expected: Version) {
    assert_eq!(Version::from_file_string(input), Ok(expected));
}

#[rstest]
#[case("1.2")]
#[case("1.2.3.4")]
#[case("^1.2.3")]
#[case("a.b.c")]
#[case("1.2.3-")]
#[case("99999999999999999.0.0")]
fn test_parse_invalid(#[case] input: &str) {
    assert!(Version::from_file_string(input).is_err());
}

#[rstest]
#[case("1.0.0", "2.0.0")]
#[case("1.0.0", "1.1.0")]
#[case("1.0.0-rc.1", "1.0.0")]
#[case("1.0.0-alpha", "1.0.0-beta")]
#[case("1.0.0-1", "1.0.0-alpha")]
#[case("1.0.0-rc.2", "1.0.0-rc.10")]
#[case("1.0.0-rc", "1.0.0-rc.1")]
fn test_ordering(#[case] lower: &str, #[case] higher: &str) {
    let lower = Version::from_file_string(lower).unwrap();
    let higher = Version::from_file_string(higher).unwrap();

    assert!(lower < higher);
}

#[test]
fn test_to_file_string() {
    let version = Version::from_file_string("1.2.3-beta.4").unwrap();
    assert_eq!(version.to_file_string(), "1.2.3-beta.4");
}
