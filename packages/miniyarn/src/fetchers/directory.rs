use futures::future::BoxFuture;
use miniyarn_primitives::{PackageInfo, PackageLocator};
use miniyarn_utils::OkMissing;

use crate::{error::Error, handler::Handler};

use super::{FetchContext, FetchResult, Fetcher};

/// Snapshots a local directory (as returned by its inner fetcher) into a
/// scratch directory, and records its info file there.
pub struct DirectoryFetcher {
    inner: Box<dyn Fetcher>,
}

impl DirectoryFetcher {
    pub fn new<F: Fetcher + 'static>(inner: F) -> DirectoryFetcher {
        DirectoryFetcher {inner: Box::new(inner)}
    }
}

impl Fetcher for DirectoryFetcher {
    fn supports(&self, locator: &PackageLocator, ctx: &FetchContext) -> bool {
        self.inner.supports(locator, ctx)
    }

    fn fetch<'a>(&'a self, locator: &'a PackageLocator, ctx: &'a FetchContext) -> BoxFuture<'a, Result<FetchResult, Error>> {
        Box::pin(async move {
            let FetchResult {package_info, handler}
                = self.inner.fetch(locator, ctx).await?;

            let package_handler
                = Handler::scratch()?;

            let source = handler.path().clone();
            let destination = package_handler.path().clone();
            let env = ctx.env.clone();
            let owned_locator = locator.clone();

            let package_info = tokio::task::spawn_blocking(move || {
                source.fs_copy_filtered(&destination, &|path| {
                    path.as_str() != "node_modules" && !env.is_bookkeeping_file(path)
                })?;

                let package_info = match destination.with_join_str("package.json").fs_read_text().ok_missing()? {
                    Some(manifest) => PackageInfo::from_manifest_str(&manifest)?,
                    None => package_info,
                }.with_locator(&owned_locator);

                env.info_path(&destination).fs_write_text(package_info.to_json_string())?;

                Ok::<_, Error>(package_info)
            }).await??;

            Ok(FetchResult::new(package_info, package_handler))
        })
    }
}
