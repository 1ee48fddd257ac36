use std::{collections::BTreeSet, sync::Arc};

use futures::future::BoxFuture;
use miniyarn_primitives::{DependencyKind, PackageInfo, PackageLocator, PackageRange, PackageResolution};

use crate::{error::Error, fetchers::{FetchContext, Fetcher}};

mod file;
mod git;
mod http;
mod registry;
mod transform;

pub use file::FileResolver;
pub use git::GitResolver;
pub use http::HttpResolver;
pub use registry::{Packument, RegistryResolver};
pub use transform::TransformResolver;

#[derive(Clone)]
pub struct ResolveContext {
    pub fetch: FetchContext,
    pub fetcher: Arc<dyn Fetcher>,
}

impl ResolveContext {
    pub fn new(fetch: FetchContext, fetcher: Arc<dyn Fetcher>) -> ResolveContext {
        ResolveContext {fetch, fetcher}
    }
}

/// Turns ranges into concrete locators, along with the ranges of their own
/// dependencies.
pub trait Resolver: Send + Sync {
    fn supports(&self, range: &PackageRange, ctx: &ResolveContext) -> bool;

    /// Whether an already-resolved locator can be reused for the range,
    /// avoiding a new resolution.
    fn is_satisfied(&self, range: &PackageRange, locator: &PackageLocator, ctx: &ResolveContext) -> Result<bool, Error>;

    fn get_candidates<'a>(&'a self, range: &'a PackageRange, ctx: &'a ResolveContext) -> BoxFuture<'a, Result<BTreeSet<String>, Error>>;

    fn resolve<'a>(&'a self, range: &'a PackageRange, ctx: &'a ResolveContext) -> BoxFuture<'a, Result<PackageResolution, Error>>;
}

/// Fetches the package to read its manifest, for reference kinds whose
/// metadata only exists inside the package itself.
pub(crate) async fn resolve_by_fetching(locator: PackageLocator, ctx: &ResolveContext) -> Result<PackageResolution, Error> {
    let result
        = ctx.fetcher.fetch(&locator, &ctx.fetch).await?;

    Ok(resolution_from_package_info(locator, &result.package_info))
}

pub(crate) fn resolution_from_package_info(locator: PackageLocator, package_info: &PackageInfo) -> PackageResolution {
    PackageResolution::new(locator)
        .with_dependencies(package_info.dependency_ranges(&[DependencyKind::Regular]))
}

/// Dispatches each range to the single child resolver supporting it.
#[derive(Default)]
pub struct MultiResolver {
    resolvers: Vec<Box<dyn Resolver>>,
}

impl MultiResolver {
    pub fn new() -> MultiResolver {
        MultiResolver::default()
    }

    pub fn with<R: Resolver + 'static>(mut self, resolver: R) -> MultiResolver {
        self.resolvers.push(Box::new(resolver));
        self
    }

    pub fn select(&self, range: &PackageRange, ctx: &ResolveContext) -> Result<&dyn Resolver, Error> {
        let mut candidates = self.resolvers.iter()
            .filter(|resolver| resolver.supports(range, ctx));

        match (candidates.next(), candidates.next()) {
            (Some(resolver), None) => Ok(resolver.as_ref()),
            (None, _) => Err(Error::NoResolverFound(range.clone())),
            (Some(_), Some(_)) => Err(Error::AmbiguousResolver(range.clone())),
        }
    }
}

impl Resolver for MultiResolver {
    fn supports(&self, range: &PackageRange, ctx: &ResolveContext) -> bool {
        self.resolvers.iter().any(|resolver| resolver.supports(range, ctx))
    }

    fn is_satisfied(&self, range: &PackageRange, locator: &PackageLocator, ctx: &ResolveContext) -> Result<bool, Error> {
        // Locators coming from another resolver simply never match, and the
        // range's resolver is the one that knows what it expands into
        self.select(range, ctx)?
            .is_satisfied(range, locator, ctx)
    }

    fn get_candidates<'a>(&'a self, range: &'a PackageRange, ctx: &'a ResolveContext) -> BoxFuture<'a, Result<BTreeSet<String>, Error>> {
        Box::pin(async move {
            self.select(range, ctx)?
                .get_candidates(range, ctx)
                .await
        })
    }

    fn resolve<'a>(&'a self, range: &'a PackageRange, ctx: &'a ResolveContext) -> BoxFuture<'a, Result<PackageResolution, Error>> {
        Box::pin(async move {
            self.select(range, ctx)?
                .resolve(range, ctx)
                .await
        })
    }
}

impl<T: Resolver + ?Sized> Resolver for Arc<T> {
    fn supports(&self, range: &PackageRange, ctx: &ResolveContext) -> bool {
        self.as_ref().supports(range, ctx)
    }

    fn is_satisfied(&self, range: &PackageRange, locator: &PackageLocator, ctx: &ResolveContext) -> Result<bool, Error> {
        self.as_ref().is_satisfied(range, locator, ctx)
    }

    fn get_candidates<'a>(&'a self, range: &'a PackageRange, ctx: &'a ResolveContext) -> BoxFuture<'a, Result<BTreeSet<String>, Error>> {
        self.as_ref().get_candidates(range, ctx)
    }

    fn resolve<'a>(&'a self, range: &'a PackageRange, ctx: &'a ResolveContext) -> BoxFuture<'a, Result<PackageResolution, Error>> {
        self.as_ref().resolve(range, ctx)
    }
}
