use futures::future::BoxFuture;
use miniyarn_primitives::PackageLocator;

use crate::{archive, error::Error, handler::Handler};

use super::{FetchContext, FetchResult, Fetcher};

/// Extracts the normalized archive produced by its inner fetcher into a
/// directory, keeping a copy of the archive itself inside it.
pub struct UnpackFetcher {
    inner: Box<dyn Fetcher>,
}

impl UnpackFetcher {
    pub fn new<F: Fetcher + 'static>(inner: F) -> UnpackFetcher {
        UnpackFetcher {inner: Box::new(inner)}
    }
}

impl Fetcher for UnpackFetcher {
    fn supports(&self, locator: &PackageLocator, ctx: &FetchContext) -> bool {
        self.inner.supports(locator, ctx)
    }

    fn fetch<'a>(&'a self, locator: &'a PackageLocator, ctx: &'a FetchContext) -> BoxFuture<'a, Result<FetchResult, Error>> {
        Box::pin(async move {
            let FetchResult {package_info, handler}
                = self.inner.fetch(locator, ctx).await?;

            let package_handler
                = Handler::scratch()?;

            let archive_path = handler.path().clone();
            let destination = package_handler.path().clone();
            let archive_filename = ctx.env.archive_filename.clone();

            tokio::task::spawn_blocking(move || {
                let bytes = archive_path.fs_read()?;

                archive::extract_tgz(&bytes, &destination)?;
                destination.with_join_str(&archive_filename).fs_write(&bytes)?;

                Ok::<_, Error>(())
            }).await??;

            Ok(FetchResult::new(package_info, package_handler))
        })
    }
}
