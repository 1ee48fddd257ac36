use futures::future::BoxFuture;
use miniyarn_primitives::PackageLocator;
use miniyarn_semver::Version;
use miniyarn_utils::FromFileString;

use crate::{config::Environment, error::Error};

use super::{FetchContext, FetchResult, Fetcher};

type SupportsFn = fn(&PackageLocator, &Environment) -> bool;
type TransformFn = fn(&PackageLocator, &Environment) -> Result<PackageLocator, Error>;

/// Rewrites locators into something its inner fetcher understands, then
/// reports the result under the original locator.
pub struct TransformFetcher {
    inner: Box<dyn Fetcher>,
    supports: SupportsFn,
    transform: TransformFn,
}

impl TransformFetcher {
    pub fn new<F: Fetcher + 'static>(inner: F, supports: SupportsFn, transform: TransformFn) -> TransformFetcher {
        TransformFetcher {inner: Box::new(inner), supports, transform}
    }

    /// Maps exact registry versions to the tarball url the registry serves
    /// them from.
    pub fn registry<F: Fetcher + 'static>(inner: F) -> TransformFetcher {
        TransformFetcher::new(inner, is_registry_locator, registry_tarball_locator)
    }
}

fn is_registry_locator(locator: &PackageLocator, _env: &Environment) -> bool {
    locator.name.is_some() && locator.reference.as_deref().is_some_and(|reference| Version::from_file_string(reference).is_ok())
}

pub fn registry_tarball_url(locator: &PackageLocator, env: &Environment) -> Option<String> {
    let name = locator.name.as_ref()?;
    let version = locator.reference.as_deref()?;

    Some(format!("{}/{}/-/{}-{}.tgz", env.registry_url, name.as_str(), name.name(), version))
}

fn registry_tarball_locator(locator: &PackageLocator, env: &Environment) -> Result<PackageLocator, Error> {
    let url = registry_tarball_url(locator, env)
        .ok_or_else(|| Error::NoFetcherFound(locator.clone()))?;

    Ok(locator.with_reference(url))
}

impl Fetcher for TransformFetcher {
    fn supports(&self, locator: &PackageLocator, ctx: &FetchContext) -> bool {
        (self.supports)(locator, &ctx.env)
    }

    fn fetch<'a>(&'a self, locator: &'a PackageLocator, ctx: &'a FetchContext) -> BoxFuture<'a, Result<FetchResult, Error>> {
        Box::pin(async move {
            let transformed
                = (self.transform)(locator, &ctx.env)?;

            if !self.inner.supports(&transformed, ctx) {
                return Err(Error::TransformUnsupported(transformed.reference.unwrap_or_default()));
            }

            let FetchResult {package_info, handler}
                = self.inner.fetch(&transformed, ctx).await?;

            Ok(FetchResult::new(package_info.with_locator(locator), handler))
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use miniyarn_primitives::Ident;

    use super::*;
    use crate::fetchers::{tests::{fetch_context, PrefixFetcher}, HttpFetcher};

    #[rstest]
    #[case("no-deps", "1.0.0", "https://registry.yarnpkg.com/no-deps/-/no-deps-1.0.0.tgz")]
    #[case("@types/node", "20.1.0", "https://registry.yarnpkg.com/@types/node/-/node-20.1.0.tgz")]
    fn test_registry_tarball_url(#[case] name: &str, #[case] version: &str, #[case] expected: &str) {
        let locator = PackageLocator::new(Ident::new(name), version);

        assert_eq!(registry_tarball_url(&locator, &Environment::default()).as_deref(), Some(expected));
    }

    #[rstest]
    #[case("1.0.0", true)]
    #[case("^1.0.0", false)]
    #[case("latest", false)]
    #[case("https://example.com/a.tgz", false)]
    fn test_supports(#[case] reference: &str, #[case] expected: bool) {
        let fetcher = TransformFetcher::registry(HttpFetcher::new());
        let locator = PackageLocator::new(Ident::new("pkg"), reference);

        assert_eq!(fetcher.supports(&locator, &fetch_context()), expected);
    }

    #[tokio::test]
    async fn test_transform_unsupported() {
        let fetcher = TransformFetcher::registry(PrefixFetcher("git+"));
        let locator = PackageLocator::new(Ident::new("pkg"), "1.0.0");

        let result = fetcher.fetch(&locator, &fetch_context()).await;

        assert!(matches!(result, Err(Error::TransformUnsupported(reference)) if reference.ends_with("/pkg/-/pkg-1.0.0.tgz")));
    }
}
