use std::collections::BTreeSet;

use futures::future::BoxFuture;
use miniyarn_primitives::{is_path_reference, PackageLocator, PackageRange, PackageResolution};

use crate::{error::Error, fetchers::resolve_path_reference};

use super::{resolve_by_fetching, ResolveContext, Resolver};

/// Resolves local paths (archives or directories) to their absolute form.
#[derive(Debug, Default)]
pub struct FileResolver;

impl FileResolver {
    pub fn new() -> FileResolver {
        FileResolver
    }

    fn normalize(&self, range: &PackageRange, ctx: &ResolveContext) -> Result<String, Error> {
        Ok(resolve_path_reference(&range.reference, &ctx.fetch.env)?.to_string())
    }
}

impl Resolver for FileResolver {
    fn supports(&self, range: &PackageRange, _ctx: &ResolveContext) -> bool {
        is_path_reference(&range.reference)
    }

    fn is_satisfied(&self, range: &PackageRange, locator: &PackageLocator, ctx: &ResolveContext) -> Result<bool, Error> {
        Ok(locator.reference.as_deref() == Some(self.normalize(range, ctx)?.as_str()))
    }

    fn get_candidates<'a>(&'a self, range: &'a PackageRange, ctx: &'a ResolveContext) -> BoxFuture<'a, Result<BTreeSet<String>, Error>> {
        Box::pin(async move {
            Ok(BTreeSet::from([self.normalize(range, ctx)?]))
        })
    }

    fn resolve<'a>(&'a self, range: &'a PackageRange, ctx: &'a ResolveContext) -> BoxFuture<'a, Result<PackageResolution, Error>> {
        Box::pin(async move {
            let locator
                = range.to_locator().with_reference(self.normalize(range, ctx)?);

            resolve_by_fetching(locator, ctx).await
        })
    }
}
