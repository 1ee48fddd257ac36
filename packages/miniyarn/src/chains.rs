use miniyarn_utils::Glob;

use crate::{
    error::Error,
    fetchers::{ArchiveFetcher, CacheFetcher, DirectoryFetcher, FsEntryFetcher, FsEntryKind, GitFetcher, HttpFetcher, MirrorLoadFetcher, MirrorSaveFetcher, MultiFetcher, TransformFetcher, UnpackFetcher},
    linkers::{MultiLinker, NodeModulesLinker, RootLinker},
    resolvers::{FileResolver, GitResolver, HttpResolver, MultiResolver, RegistryResolver, TransformResolver},
};

const ARCHIVE_PATTERN: &str = "*.{tar.gz,tgz}";

/// Remote packages go through the mirror and the cache, local archives only
/// through the mirror, and local directories are read as-is.
pub fn default_fetcher() -> Result<MultiFetcher, Error> {
    let archive_pattern
        = Glob::parse(ARCHIVE_PATTERN)?;

    let remote_archives = MultiFetcher::new()
        .with(HttpFetcher::new().with_pattern(archive_pattern.clone()))
        .with(TransformFetcher::registry(HttpFetcher::new()));

    let remote_sources = MultiFetcher::new()
        .with(ArchiveFetcher::new(GitFetcher::new()))
        .with(ArchiveFetcher::new(remote_archives).with_virtual_path("package"));

    let remote = MirrorSaveFetcher::new(
        CacheFetcher::new(
            UnpackFetcher::new(
                MirrorLoadFetcher::new(remote_sources),
            ),
        ),
    );

    let local_archives = MirrorSaveFetcher::new(
        UnpackFetcher::new(
            MirrorLoadFetcher::new(
                ArchiveFetcher::new(FsEntryFetcher::new(FsEntryKind::File).with_pattern(archive_pattern.clone()))
                    .with_virtual_path("package"),
            ),
        ),
    );

    let local_directories
        = DirectoryFetcher::new(FsEntryFetcher::new(FsEntryKind::Directory).without_pattern(archive_pattern));

    Ok(MultiFetcher::new()
        .with(remote)
        .with(local_archives)
        .with(local_directories))
}

pub fn default_resolver() -> MultiResolver {
    MultiResolver::new()
        .with(RegistryResolver::new())
        .with(HttpResolver::new())
        .with(FileResolver::new())
        .with(GitResolver::new())
        .with(TransformResolver::github())
}

pub fn default_linker() -> MultiLinker {
    MultiLinker::new()
        .with(RootLinker::new())
        .with(NodeModulesLinker::new())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use miniyarn_primitives::{Ident, PackageLocator, PackageRange};

    use super::*;
    use crate::{fetchers::{tests::fetch_context, Fetcher}, resolvers::{tests::resolve_context, Resolver}};

    #[rstest]
    #[case("1.0.0")]
    #[case("https://example.com/no-deps-1.0.0.tgz")]
    #[case("https://github.com/yarnpkg/example.git#0123456789abcdef0123456789abcdef01234567")]
    #[case("/tmp/no-deps-1.0.0.tgz")]
    #[case("/tmp/no-deps")]
    fn test_fetcher_routing(#[case] reference: &str) {
        let ctx = fetch_context();
        let fetcher = default_fetcher().unwrap();

        let locator = PackageLocator::new(Ident::new("no-deps"), reference);

        assert!(fetcher.select(&locator, &ctx).is_ok(), "{} should have exactly one fetcher", reference);
    }

    #[rstest]
    #[case("^1.0.0")]
    #[case("latest")]
    #[case("https://example.com/no-deps-1.0.0.tgz")]
    #[case("./no-deps-1.0.0.tgz")]
    #[case("file:../no-deps")]
    #[case("https://github.com/yarnpkg/example.git#main")]
    #[case("yarnpkg/example")]
    fn test_resolver_routing(#[case] reference: &str) {
        let ctx = resolve_context();
        let resolver = default_resolver();

        let range = PackageRange::new(Ident::new("no-deps"), reference);

        assert!(resolver.supports(&range, &ctx));
        assert!(resolver.select(&range, &ctx).is_ok(), "{} should have exactly one resolver", reference);
    }
}
