use std::sync::Arc;

use futures::future::BoxFuture;
use miniyarn_primitives::{PackageInfo, PackageLocator};

use crate::{config::Environment, error::Error, handler::Handler, http::HttpClient};

mod archive;
mod cache;
mod directory;
mod fs_entry;
mod git;
mod http;
mod mirror;
mod transform;
mod unpack;

pub use archive::ArchiveFetcher;
pub use cache::CacheFetcher;
pub use directory::DirectoryFetcher;
pub use fs_entry::{resolve_path_reference, FsEntryFetcher, FsEntryKind};
pub use git::GitFetcher;
pub use http::HttpFetcher;
pub use mirror::{MirrorLoadFetcher, MirrorSaveFetcher};
pub use transform::TransformFetcher;
pub use unpack::UnpackFetcher;

#[derive(Clone, Debug)]
pub struct FetchContext {
    pub env: Arc<Environment>,
    pub http: Arc<HttpClient>,
}

impl FetchContext {
    pub fn new(env: Arc<Environment>, http: Arc<HttpClient>) -> FetchContext {
        FetchContext {env, http}
    }
}

#[derive(Debug)]
pub struct FetchResult {
    pub package_info: PackageInfo,
    pub handler: Handler,
}

impl FetchResult {
    pub fn new(package_info: PackageInfo, handler: Handler) -> FetchResult {
        FetchResult {package_info, handler}
    }
}

/// Materializes a locator somewhere on disk. Fetchers compose: most of them
/// wrap another fetcher and post-process (or short-circuit) its result.
pub trait Fetcher: Send + Sync {
    fn supports(&self, locator: &PackageLocator, ctx: &FetchContext) -> bool;

    fn fetch<'a>(&'a self, locator: &'a PackageLocator, ctx: &'a FetchContext) -> BoxFuture<'a, Result<FetchResult, Error>>;
}

/// Dispatches each locator to the single child fetcher supporting it.
#[derive(Default)]
pub struct MultiFetcher {
    fetchers: Vec<Box<dyn Fetcher>>,
}

impl MultiFetcher {
    pub fn new() -> MultiFetcher {
        MultiFetcher::default()
    }

    pub fn with<F: Fetcher + 'static>(mut self, fetcher: F) -> MultiFetcher {
        self.fetchers.push(Box::new(fetcher));
        self
    }

    pub fn select(&self, locator: &PackageLocator, ctx: &FetchContext) -> Result<&dyn Fetcher, Error> {
        let mut candidates = self.fetchers.iter()
            .filter(|fetcher| fetcher.supports(locator, ctx));

        match (candidates.next(), candidates.next()) {
            (Some(fetcher), None) => Ok(fetcher.as_ref()),
            (None, _) => Err(Error::NoFetcherFound(locator.clone())),
            (Some(_), Some(_)) => Err(Error::AmbiguousFetcher(locator.clone())),
        }
    }
}

impl Fetcher for MultiFetcher {
    fn supports(&self, locator: &PackageLocator, ctx: &FetchContext) -> bool {
        self.fetchers.iter().any(|fetcher| fetcher.supports(locator, ctx))
    }

    fn fetch<'a>(&'a self, locator: &'a PackageLocator, ctx: &'a FetchContext) -> BoxFuture<'a, Result<FetchResult, Error>> {
        Box::pin(async move {
            self.select(locator, ctx)?
                .fetch(locator, ctx)
                .await
        })
    }
}

impl<T: Fetcher + ?Sized> Fetcher for Arc<T> {
    fn supports(&self, locator: &PackageLocator, ctx: &FetchContext) -> bool {
        self.as_ref().supports(locator, ctx)
    }

    fn fetch<'a>(&'a self, locator: &'a PackageLocator, ctx: &'a FetchContext) -> BoxFuture<'a, Result<FetchResult, Error>> {
        self.as_ref().fetch(locator, ctx)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use miniyarn_primitives::Ident;
    use miniyarn_utils::Path;

    use super::*;

    /// Serves every locator whose reference starts with the given prefix out
    /// of a fresh temporary directory.
    pub struct PrefixFetcher(pub &'static str);

    impl Fetcher for PrefixFetcher {
        fn supports(&self, locator: &PackageLocator, _ctx: &FetchContext) -> bool {
            locator.reference.as_deref().is_some_and(|reference| reference.starts_with(self.0))
        }

        fn fetch<'a>(&'a self, locator: &'a PackageLocator, _ctx: &'a FetchContext) -> BoxFuture<'a, Result<FetchResult, Error>> {
            Box::pin(async move {
                let dir = Path::temp_dir()?;

                Ok(FetchResult::new(PackageInfo::from_locator(locator), Handler::temporary(dir)))
            })
        }
    }

    pub fn fetch_context() -> FetchContext {
        let env = Arc::new(Environment::default().with_cache_path(None));
        let http = HttpClient::new(&env).unwrap();

        FetchContext::new(env, http)
    }

    #[tokio::test]
    async fn test_multi_fetcher_selection() {
        let ctx = fetch_context();

        let fetcher = MultiFetcher::new()
            .with(PrefixFetcher("a"))
            .with(PrefixFetcher("ab"));

        let single = PackageLocator::new(Ident::new("pkg"), "a1");
        let result = fetcher.fetch(&single, &ctx).await.unwrap();
        assert_eq!(result.package_info.reference.as_deref(), Some("a1"));

        let ambiguous = PackageLocator::new(Ident::new("pkg"), "ab1");
        assert!(matches!(fetcher.fetch(&ambiguous, &ctx).await, Err(Error::AmbiguousFetcher(_))));

        let missing = PackageLocator::new(Ident::new("pkg"), "z1");
        assert!(matches!(fetcher.fetch(&missing, &ctx).await, Err(Error::NoFetcherFound(_))));
    }
}
