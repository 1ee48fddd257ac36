use futures::future::BoxFuture;
use miniyarn_primitives::{PackageInfo, PackageLocator};
use miniyarn_utils::{OkMissing, Path, ToFileString};

use crate::{config::Environment, error::Error, handler::Handler};

use super::{FetchContext, FetchResult, Fetcher};

/// Keeps unpacked packages in the cache directory. An entry is only trusted
/// once its atomic marker exists and its info file matches the locator.
pub struct CacheFetcher {
    inner: Box<dyn Fetcher>,
}

impl CacheFetcher {
    pub fn new<F: Fetcher + 'static>(inner: F) -> CacheFetcher {
        CacheFetcher {inner: Box::new(inner)}
    }
}

pub fn cache_path(locator: &PackageLocator, env: &Environment) -> Option<Path> {
    let cache_path = env.cache_path.as_ref()?;
    let name = locator.name.as_ref()?;
    let slug = locator.slug()?;

    Some(cache_path.with_join_str(name.slug()).with_join_str(slug))
}

fn read_cache_entry(cache_path: &Path, locator: &PackageLocator, env: &Environment) -> Result<Option<PackageInfo>, Error> {
    if !env.atomic_path(cache_path).fs_exists() {
        return Ok(None);
    }

    let Some(info_text) = env.info_path(cache_path).fs_read_text().ok_missing()? else {
        return Ok(None);
    };

    let package_info = match serde_json::from_str::<PackageInfo>(&info_text) {
        Ok(package_info) => package_info,
        Err(_) => return Ok(None),
    };

    if package_info.reference != locator.reference {
        return Ok(None);
    }

    Ok(Some(package_info.with_locator(locator)))
}

impl Fetcher for CacheFetcher {
    fn supports(&self, locator: &PackageLocator, ctx: &FetchContext) -> bool {
        self.inner.supports(locator, ctx)
    }

    fn fetch<'a>(&'a self, locator: &'a PackageLocator, ctx: &'a FetchContext) -> BoxFuture<'a, Result<FetchResult, Error>> {
        Box::pin(async move {
            let Some(cache_path) = cache_path(locator, &ctx.env) else {
                return self.inner.fetch(locator, ctx).await;
            };

            if let Some(package_info) = read_cache_entry(&cache_path, locator, &ctx.env)? {
                log::debug!("Cache hit for {}", locator);
                return Ok(FetchResult::new(package_info, Handler::new(cache_path)));
            }

            // The marker goes away before anything else touches the entry, so
            // that an interrupted refresh can't leave it over partial content
            ctx.env.atomic_path(&cache_path).fs_rm_if_exists()?;

            let FetchResult {package_info, handler}
                = self.inner.fetch(locator, ctx).await?;

            let env = ctx.env.clone();
            let marker = locator.to_file_string();

            let cache_path = tokio::task::spawn_blocking(move || {
                let cache_path
                    = handler.steal(&cache_path)?;

                env.atomic_path(&cache_path).fs_write_text(marker)?;

                Ok::<_, Error>(cache_path)
            }).await??;

            Ok(FetchResult::new(package_info, Handler::new(cache_path)))
        })
    }
}
