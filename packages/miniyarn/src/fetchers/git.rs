use futures::future::BoxFuture;
use miniyarn_primitives::{is_git_reference, split_git_reference, PackageInfo, PackageLocator};

use crate::{error::Error, git, handler::Handler};

use super::{FetchContext, FetchResult, Fetcher};

/// Packs the tree of a git repository at a given commit into an archive
/// whose entries sit at the repository root.
#[derive(Debug, Default)]
pub struct GitFetcher;

impl GitFetcher {
    pub fn new() -> GitFetcher {
        GitFetcher
    }
}

impl Fetcher for GitFetcher {
    fn supports(&self, locator: &PackageLocator, _ctx: &FetchContext) -> bool {
        locator.reference.as_deref().is_some_and(is_git_reference)
    }

    fn fetch<'a>(&'a self, locator: &'a PackageLocator, ctx: &'a FetchContext) -> BoxFuture<'a, Result<FetchResult, Error>> {
        Box::pin(async move {
            let reference = locator.reference.as_deref()
                .ok_or_else(|| Error::NoFetcherFound(locator.clone()))?;

            if !ctx.env.enable_network {
                return Err(Error::NetworkDisabledError(reference.to_string()));
            }

            let (url, treeish)
                = split_git_reference(reference);

            let scratch
                = Handler::scratch()?;

            let archive
                = git::fetch_repository_archive(url, treeish, scratch.path()).await?;

            let archive_path
                = scratch.path().with_join_str("archive.tgz");

            archive_path.fs_write(&archive)?;

            Ok(FetchResult::new(PackageInfo::from_locator(locator), scratch.with_path(archive_path)))
        })
    }
}
