use std::sync::LazyLock;

use miniyarn_semver::Range;
use miniyarn_utils::FromFileString;

static GIT_REFERENCE_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^((git|ssh|http(s)?)|(git@[\w\.]+))(:(//)?)([\w\.@:/\-~]+)(\.git)(/)?(#|$)").unwrap()
});

static GIT_PLUS_REFERENCE_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^git\+(ssh|https?|file)://").unwrap()
});

static GITHUB_REFERENCE_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^(github:)?[\w.-]+/[\w.-]+(#.*)?$").unwrap()
});

static TAG_REFERENCE_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^[a-zA-Z][a-zA-Z0-9._-]*$").unwrap()
});

/// References that can only be filesystem paths, as opposed to names that
/// merely could be (`foo/bar` is a github shorthand, `./foo/bar` is a path).
pub fn is_path_reference(reference: &str) -> bool {
    let reference
        = strip_path_protocol(reference);

    reference == "."
        || reference == ".."
        || reference.starts_with('/')
        || reference.starts_with("./")
        || reference.starts_with("../")
}

pub fn strip_path_protocol(reference: &str) -> &str {
    reference.strip_prefix("file:").unwrap_or(reference)
}

pub fn is_git_reference(reference: &str) -> bool {
    GIT_REFERENCE_REGEX.is_match(reference) || GIT_PLUS_REFERENCE_REGEX.is_match(reference)
}

pub fn is_github_reference(reference: &str) -> bool {
    !is_path_reference(reference) && !is_git_reference(reference) && GITHUB_REFERENCE_REGEX.is_match(reference)
}

pub fn is_http_reference(reference: &str) -> bool {
    let Ok(url) = url::Url::parse(reference) else {
        return false;
    };

    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }

    if url.host_str().is_none_or(|host| host.is_empty()) {
        return false;
    }

    !url.path().ends_with(".git")
}

pub fn is_semver_reference(reference: &str) -> bool {
    Range::from_file_string(reference).is_ok()
}

/// Dist-tags such as `latest` or `next`; anything that's a valid range wins.
pub fn is_tag_reference(reference: &str) -> bool {
    !is_semver_reference(reference) && TAG_REFERENCE_REGEX.is_match(reference)
}

/// Splits `url#treeish` into the repository url and the treeish to check out,
/// the latter defaulting to `HEAD`.
pub fn split_git_reference(reference: &str) -> (&str, &str) {
    let reference
        = reference.strip_prefix("git+").unwrap_or(reference);

    match reference.split_once('#') {
        Some((url, treeish)) if !treeish.is_empty() => (url, treeish),
        Some((url, _)) => (url, "HEAD"),
        None => (reference, "HEAD"),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("./local", true)]
    #[case("../sibling", true)]
    #[case("/abs/path.tgz", true)]
    #[case("file:./local", true)]
    #[case(".", true)]
    #[case("owner/repo", false)]
    #[case("1.0.0", false)]
    fn test_is_path_reference(#[case] reference: &str, #[case] expected: bool) {
        assert_eq!(is_path_reference(reference), expected);
    }

    #[rstest]
    #[case("https://github.com/yarnpkg/yarn.git", true)]
    #[case("https://github.com/yarnpkg/yarn.git#v1.0.0", true)]
    #[case("git@github.com:yarnpkg/yarn.git", true)]
    #[case("git://github.com/yarnpkg/yarn.git#master", true)]
    #[case("git+ssh://git@github.com/yarnpkg/yarn", true)]
    #[case("https://example.com/pkg.tgz", false)]
    #[case("yarnpkg/yarn", false)]
    fn test_is_git_reference(#[case] reference: &str, #[case] expected: bool) {
        assert_eq!(is_git_reference(reference), expected);
    }

    #[rstest]
    #[case("yarnpkg/yarn", true)]
    #[case("yarnpkg/yarn#v1.0.0", true)]
    #[case("github:yarnpkg/yarn", true)]
    #[case("./yarnpkg/yarn", false)]
    #[case("https://github.com/yarnpkg/yarn.git", false)]
    #[case("^1.0.0", false)]
    fn test_is_github_reference(#[case] reference: &str, #[case] expected: bool) {
        assert_eq!(is_github_reference(reference), expected);
    }

    #[rstest]
    #[case("https://example.com/pkg-1.0.0.tgz", true)]
    #[case("http://localhost:4873/pkg.tgz", true)]
    #[case("https://github.com/yarnpkg/yarn.git", false)]
    #[case("ftp://example.com/pkg.tgz", false)]
    #[case("1.0.0", false)]
    fn test_is_http_reference(#[case] reference: &str, #[case] expected: bool) {
        assert_eq!(is_http_reference(reference), expected);
    }

    #[rstest]
    #[case("latest", true)]
    #[case("next", true)]
    #[case("x", false)]
    #[case("1.0.0", false)]
    #[case("owner/repo", false)]
    fn test_is_tag_reference(#[case] reference: &str, #[case] expected: bool) {
        assert_eq!(is_tag_reference(reference), expected);
    }

    #[rstest]
    #[case("https://host/repo.git#v1", "https://host/repo.git", "v1")]
    #[case("https://host/repo.git", "https://host/repo.git", "HEAD")]
    #[case("git+ssh://git@host/repo.git#abc", "ssh://git@host/repo.git", "abc")]
    fn test_split_git_reference(#[case] reference: &str, #[case] url: &str, #[case] treeish: &str) {
        assert_eq!(split_git_reference(reference), (url, treeish));
    }
}
