use futures::future::BoxFuture;
use miniyarn_primitives::{is_path_reference, strip_path_protocol, PackageInfo, PackageLocator};
use miniyarn_utils::{FromFileString, Glob, Path};

use crate::{config::Environment, error::Error, handler::Handler};

use super::{FetchContext, FetchResult, Fetcher};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FsEntryKind {
    File,
    Directory,
}

/// Turns a path reference into an absolute path. Relative references are
/// resolved from the configured base directory.
pub fn resolve_path_reference(reference: &str, env: &Environment) -> Result<Path, Error> {
    let stripped
        = strip_path_protocol(reference);

    let path
        = Path::from_file_string(stripped)?;

    if path.is_absolute() {
        return Ok(path);
    }

    let base = env.relative_dependencies_path.as_ref()
        .ok_or_else(|| Error::RelativePathWithoutBase(reference.to_string()))?;

    Ok(path.resolve_from(base))
}

/// Serves files or directories from the local filesystem, in place.
#[derive(Debug)]
pub struct FsEntryFetcher {
    kind: FsEntryKind,
    pattern: Option<Glob>,
    excluded_pattern: Option<Glob>,
}

impl FsEntryFetcher {
    pub fn new(kind: FsEntryKind) -> FsEntryFetcher {
        FsEntryFetcher {kind, pattern: None, excluded_pattern: None}
    }

    pub fn with_pattern(self, pattern: Glob) -> FsEntryFetcher {
        FsEntryFetcher {pattern: Some(pattern), ..self}
    }

    pub fn without_pattern(self, excluded_pattern: Glob) -> FsEntryFetcher {
        FsEntryFetcher {excluded_pattern: Some(excluded_pattern), ..self}
    }
}

impl Fetcher for FsEntryFetcher {
    fn supports(&self, locator: &PackageLocator, _ctx: &FetchContext) -> bool {
        let Some(reference) = locator.reference.as_deref() else {
            return false;
        };

        if !is_path_reference(reference) {
            return false;
        }

        let path
            = strip_path_protocol(reference);

        self.pattern.as_ref().is_none_or(|pattern| pattern.is_match_base(path))
            && self.excluded_pattern.as_ref().is_none_or(|pattern| !pattern.is_match_base(path))
    }

    fn fetch<'a>(&'a self, locator: &'a PackageLocator, ctx: &'a FetchContext) -> BoxFuture<'a, Result<FetchResult, Error>> {
        Box::pin(async move {
            let reference = locator.reference.as_deref()
                .ok_or_else(|| Error::NoFetcherFound(locator.clone()))?;

            let path
                = resolve_path_reference(reference, &ctx.env)?;

            let (is_expected_type, expected) = match self.kind {
                FsEntryKind::File => (path.fs_is_file(), "file"),
                FsEntryKind::Directory => (path.fs_is_dir(), "directory"),
            };

            if !is_expected_type {
                return Err(Error::UnexpectedEntryType {path: path.to_string(), expected});
            }

            Ok(FetchResult::new(PackageInfo::from_locator(locator), Handler::new(path)))
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use miniyarn_primitives::Ident;

    use super::*;
    use crate::fetchers::tests::fetch_context;

    #[rstest]
    #[case("./archive.tgz", true, false)]
    #[case("file:../archives/pkg.tar.gz", true, false)]
    #[case("./local-package", false, true)]
    #[case("/abs/local-package", false, true)]
    #[case("https://example.com/pkg.tgz", false, false)]
    fn test_supports(#[case] reference: &str, #[case] as_archive: bool, #[case] as_directory: bool) {
        let archive_pattern = Glob::parse("*.{tar.gz,tgz}").unwrap();

        let archives = FsEntryFetcher::new(FsEntryKind::File).with_pattern(archive_pattern.clone());
        let directories = FsEntryFetcher::new(FsEntryKind::Directory).without_pattern(archive_pattern);

        let locator = PackageLocator::new(Ident::new("pkg"), reference);
        let ctx = fetch_context();

        assert_eq!(archives.supports(&locator, &ctx), as_archive);
        assert_eq!(directories.supports(&locator, &ctx), as_directory);
    }

    #[test]
    fn test_resolve_path_reference() {
        let env = Environment::default().with_relative_dependencies_path(Some(Path::from_file_string("/project").unwrap()));

        assert_eq!(resolve_path_reference("./pkg", &env).unwrap().as_str(), "/project/pkg");
        assert_eq!(resolve_path_reference("file:../pkg", &env).unwrap().as_str(), "/pkg");
        assert_eq!(resolve_path_reference("/abs/pkg", &env).unwrap().as_str(), "/abs/pkg");

        let env = env.with_relative_dependencies_path(None);
        assert!(matches!(resolve_path_reference("./pkg", &env), Err(Error::RelativePathWithoutBase(_))));
    }

    #[tokio::test]
    async fn test_fetch_checks_entry_type() {
        let dir = Path::temp_dir().unwrap();
        let locator = PackageLocator::new(Ident::new("pkg"), dir.as_str());
        let ctx = fetch_context();

        let result = FsEntryFetcher::new(FsEntryKind::File).fetch(&locator, &ctx).await;
        assert!(matches!(result, Err(Error::UnexpectedEntryType {expected: "file", ..})));

        let result = FsEntryFetcher::new(FsEntryKind::Directory).fetch(&locator, &ctx).await.unwrap();
        assert_eq!(result.handler.path(), &dir);
        assert!(!result.handler.is_temporary());
    }
}
