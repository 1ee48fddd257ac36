use rstest::rstest;
use miniyarn_utils::FromFileString;

use crate::{Range, Version};

#[rstest]
#[case("1.2.3", "1.2.3", true)]
#[case("1.2.3", "1.2.4", false)]
#[case("=1.2.3", "1.2.3", true)]
#[case("v1.2.3", "1.2.3", true)]

#[case("^1.2.3", "1.2.0", false)]
#[case("^1.2.3", "1.2.3", true)]
#[case("^1.2.3", "1.2.10", true)]
#[case("^1.2.3", "1.10.0", true)]
#[case("^1.2.3", "1.10.0-rc", false)]
#[case("^1.2.3", "2.0.0-rc", false)]
#[case("^1.2.3", "2.0.0", false)]
#[case("^1.2.3-rc.1", "1.2.3-rc.15", true)]
#[case("^1.2.3-rc.1", "1.3.0-rc.15", false)]
#[case("^1.2.3-rc.1", "2.0.0-rc.15", false)]
#[case("^1.2.3-rc.1", "1.5.0", true)]

#[case("~1.2.3", "1.2.0", false)]
#[case("~1.2.3", "1.2.3", true)]
#[case("~1.2.3", "1.2.10", true)]
#[case("~1.2.3", "1.2.10-rc", false)]
#[case("~1.2.3", "1.10.0", false)]
#[case("~1", "1.9.0", true)]
#[case("~1", "2.0.0", false)]

#[case("^0.7.0", "0.7.45", true)]
#[case("^0.7.0", "0.8.0", false)]
#[case("^0.0.3", "0.0.3", true)]
#[case("^0.0.3", "0.0.4", false)]
#[case("^0", "0.9.9", true)]
#[case("^0", "1.0.0", false)]

#[case(">1.2.3", "1.2.3", false)]
#[case(">1.2.3", "1.2.10", true)]
#[case(">1.2", "1.2.9", false)]
#[case(">1.2", "1.3.0", true)]
#[case(">=1.2.3", "1.2.3", true)]
#[case(">= 1.2.3", "1.2.3", true)]
#[case(">=1.2.3", "1.2.0", false)]
#[case("<1.2.3", "1.2.0", true)]
#[case("<1.2.3", "1.2.3", false)]
#[case("<=1.2.3", "1.2.3", true)]
#[case("<=1.2", "1.2.99", true)]
#[case("<=1.2", "1.3.0", false)]

#[case("1.x", "1.4.2", true)]
#[case("1.x", "2.0.0", false)]
#[case("1.2.x", "1.2.9", true)]
#[case("1.2", "1.3.0", false)]
#[case("*", "3.1.4", true)]
#[case("*", "3.1.4-rc.1", false)]
#[case("", "0.0.1", true)]

#[case("1.2.3 - 2.3.4", "1.2.3", true)]
#[case("1.2.3 - 2.3.4", "2.3.4", true)]
#[case("1.2.3 - 2.3.4", "2.3.5", false)]
#[case("1.2.3 - 2.3", "2.3.9", true)]
#[case("1.2.3 - 2", "2.9.0", true)]

#[case(">=1.0.0 <2.0.0", "1.5.0", true)]
#[case(">=1.0.0 <2.0.0", "2.0.0", false)]
#[case("^1.0.0 || ^3.0.0", "3.1.0", true)]
#[case("^1.0.0 || ^3.0.0", "2.1.0", false)]
fn test_check(#[case] range: &str, #[case] version: &str, #[case] expected: bool) {
    let range = Range::from_file_string(range).unwrap();
    let version = Version::from_file_string(version).unwrap();

    assert_eq!(range.check(&version), expected, "{} vs {}", range.source(), version);
}

#[rstest]
#[case("latest")]
#[case("owner/repo")]
#[case("./local")]
#[case("https://example.com/pkg.tgz")]
#[case(">=")]
#[case("1.2.3 -")]
fn test_invalid(#[case] range: &str) {
    assert!(Range::from_file_string(range).is_err());
}

#[rstest]
#[case("^1.0.0", &["0.9.0", "1.0.0", "1.4.0", "2.0.0"], Some("1.4.0"))]
#[case("~1.0.0", &["1.0.0", "1.0.5", "1.1.0"], Some("1.0.5"))]
#[case("^3.0.0", &["1.0.0", "2.0.0"], None)]
#[case("*", &["1.0.0", "2.0.0-rc.1"], Some("1.0.0"))]
fn test_max_satisfying(#[case] range: &str, #[case] versions: &[&str], #[case] expected: Option<&str>) {
    let range = Range::from_file_string(range).unwrap();

    let versions = versions.iter()
        .map(|version| Version::from_file_string(version).unwrap())
        .collect::<Vec<_>>();

    let expected = expected
        .map(|version| Version::from_file_string(version).unwrap());

    assert_eq!(range.max_satisfying(versions.iter()).cloned(), expected);
}

#[rstest]
#[case("1.0.0", Some("1.0.0"))]
#[case("=2.1.0", Some("2.1.0"))]
#[case("^1.0.0", None)]
#[case("1.x", None)]
fn test_exact_version(#[case] range: &str, #[case] expected: Option<&str>) {
    let range = Range::from_file_string(range).unwrap();
    let expected = expected.map(|version| Version::from_file_string(version).unwrap());

    assert_eq!(range.exact_version(), expected);
}
