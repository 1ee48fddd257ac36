use std::collections::BTreeSet;

use futures::future::BoxFuture;
use miniyarn_primitives::{is_github_reference, split_git_reference, PackageLocator, PackageRange, PackageResolution};

use crate::error::Error;

use super::{GitResolver, ResolveContext, Resolver};

type SupportsFn = fn(&str) -> bool;
type TransformFn = fn(&str) -> String;

/// Rewrites range references into a form its inner resolver supports, such
/// as GitHub shorthands into full git urls.
pub struct TransformResolver {
    inner: Box<dyn Resolver>,
    supports: SupportsFn,
    transform: TransformFn,
}

impl TransformResolver {
    pub fn new<R: Resolver + 'static>(inner: R, supports: SupportsFn, transform: TransformFn) -> TransformResolver {
        TransformResolver {inner: Box::new(inner), supports, transform}
    }

    pub fn github() -> TransformResolver {
        TransformResolver::new(GitResolver::new(), is_github_reference, github_to_git_url)
    }

    fn transform_range(&self, range: &PackageRange, ctx: &ResolveContext) -> Result<PackageRange, Error> {
        let transformed
            = range.with_reference((self.transform)(&range.reference));

        if !self.inner.supports(&transformed, ctx) {
            return Err(Error::TransformUnsupported(transformed.reference));
        }

        Ok(transformed)
    }
}

pub fn github_to_git_url(reference: &str) -> String {
    let reference
        = reference.strip_prefix("github:").unwrap_or(reference);

    let (repository, treeish)
        = split_git_reference(reference);

    format!("https://github.com/{}.git#{}", repository, treeish)
}

impl Resolver for TransformResolver {
    fn supports(&self, range: &PackageRange, _ctx: &ResolveContext) -> bool {
        (self.supports)(&range.reference)
    }

    fn is_satisfied(&self, range: &PackageRange, locator: &PackageLocator, ctx: &ResolveContext) -> Result<bool, Error> {
        self.inner.is_satisfied(&self.transform_range(range, ctx)?, locator, ctx)
    }

    fn get_candidates<'a>(&'a self, range: &'a PackageRange, ctx: &'a ResolveContext) -> BoxFuture<'a, Result<BTreeSet<String>, Error>> {
        Box::pin(async move {
            let transformed
                = self.transform_range(range, ctx)?;

            self.inner.get_candidates(&transformed, ctx).await
        })
    }

    fn resolve<'a>(&'a self, range: &'a PackageRange, ctx: &'a ResolveContext) -> BoxFuture<'a, Result<PackageResolution, Error>> {
        Box::pin(async move {
            let transformed
                = self.transform_range(range, ctx)?;

            self.inner.resolve(&transformed, ctx).await
        })
    }
}
