use std::collections::BTreeSet;

use futures::future::BoxFuture;
use miniyarn_primitives::{is_http_reference, PackageLocator, PackageRange, PackageResolution};

use crate::error::Error;

use super::{resolve_by_fetching, ResolveContext, Resolver};

/// Resolves archive urls to their normalized form.
#[derive(Debug, Default)]
pub struct HttpResolver;

impl HttpResolver {
    pub fn new() -> HttpResolver {
        HttpResolver
    }

    fn normalize(&self, range: &PackageRange) -> Result<String, Error> {
        let url = url::Url::parse(&range.reference)
            .map_err(|_| Error::InvalidUrl(range.reference.clone()))?;

        Ok(url.to_string())
    }
}

impl Resolver for HttpResolver {
    fn supports(&self, range: &PackageRange, _ctx: &ResolveContext) -> bool {
        is_http_reference(&range.reference)
    }

    fn is_satisfied(&self, range: &PackageRange, locator: &PackageLocator, _ctx: &ResolveContext) -> Result<bool, Error> {
        Ok(locator.reference.as_deref() == Some(self.normalize(range)?.as_str()))
    }

    fn get_candidates<'a>(&'a self, range: &'a PackageRange, _ctx: &'a ResolveContext) -> BoxFuture<'a, Result<BTreeSet<String>, Error>> {
        Box::pin(async move {
            Ok(BTreeSet::from([self.normalize(range)?]))
        })
    }

    fn resolve<'a>(&'a self, range: &'a PackageRange, ctx: &'a ResolveContext) -> BoxFuture<'a, Result<PackageResolution, Error>> {
        Box::pin(async move {
            let locator
                = range.to_locator().with_reference(self.normalize(range)?);

            resolve_by_fetching(locator, ctx).await
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use miniyarn_primitives::Ident;

    use super::*;
    use crate::resolvers::tests::resolve_context;

    #[rstest]
    #[case("https://Example.com/a/../pkg.tgz", "https://example.com/pkg.tgz", true)]
    #[case("https://example.com:443/pkg.tgz", "https://example.com/pkg.tgz", true)]
    #[case("https://example.com/pkg.tgz", "https://example.com/other.tgz", false)]
    fn test_is_satisfied(#[case] range: &str, #[case] reference: &str, #[case] expected: bool) {
        let ctx = resolve_context();
        let range = PackageRange::new(Ident::new("pkg"), range);
        let locator = PackageLocator::new(Ident::new("pkg"), reference);

        assert_eq!(HttpResolver::new().is_satisfied(&range, &locator, &ctx).unwrap(), expected);
    }
}
