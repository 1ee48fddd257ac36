use std::collections::BTreeSet;

use futures::future::BoxFuture;
use miniyarn_primitives::{is_git_reference, split_git_reference, PackageLocator, PackageRange, PackageResolution};

use crate::{error::Error, git};

use super::{resolve_by_fetching, ResolveContext, Resolver};

/// Resolves git references by pinning their treeish to a commit hash.
#[derive(Debug, Default)]
pub struct GitResolver;

impl GitResolver {
    pub fn new() -> GitResolver {
        GitResolver
    }

    async fn pin(&self, range: &PackageRange, ctx: &ResolveContext) -> Result<String, Error> {
        if !ctx.fetch.env.enable_network {
            return Err(Error::NetworkDisabledError(range.reference.clone()));
        }

        let (url, treeish)
            = split_git_reference(&range.reference);

        let commit
            = git::resolve_treeish(url, treeish).await?;

        let prefix = match range.reference.starts_with("git+") {
            true => "git+",
            false => "",
        };

        Ok(format!("{}{}#{}", prefix, url, commit))
    }
}

impl Resolver for GitResolver {
    fn supports(&self, range: &PackageRange, _ctx: &ResolveContext) -> bool {
        is_git_reference(&range.reference)
    }

    fn is_satisfied(&self, range: &PackageRange, locator: &PackageLocator, _ctx: &ResolveContext) -> Result<bool, Error> {
        let Some(reference) = locator.reference.as_deref() else {
            return Ok(false);
        };

        if reference == range.reference {
            return Ok(true);
        }

        let (range_url, range_treeish) = split_git_reference(&range.reference);
        let (locator_url, locator_commit) = split_git_reference(reference);

        // Branches and tags may have moved since, only commits are stable
        Ok(range_url == locator_url && git::is_commit_hash(range_treeish) && range_treeish.eq_ignore_ascii_case(locator_commit))
    }

    fn get_candidates<'a>(&'a self, range: &'a PackageRange, ctx: &'a ResolveContext) -> BoxFuture<'a, Result<BTreeSet<String>, Error>> {
        Box::pin(async move {
            Ok(BTreeSet::from([self.pin(range, ctx).await?]))
        })
    }

    fn resolve<'a>(&'a self, range: &'a PackageRange, ctx: &'a ResolveContext) -> BoxFuture<'a, Result<PackageResolution, Error>> {
        Box::pin(async move {
            let locator
                = range.to_locator().with_reference(self.pin(range, ctx).await?);

            resolve_by_fetching(locator, ctx).await
        })
    }
}

#[cfg(test)]
mod tests {
    use miniyarn_primitives::Ident;

    use super::*;
    use crate::{git::tests::make_repository, resolvers::tests::resolve_context};

    #[tokio::test]
    async fn test_pin_to_commit() {
        let (repo, commit) = make_repository(&[("package.json", r#"{"name": "repo"}"#)]).await;
        let ctx = resolve_context();

        let range = PackageRange::new(Ident::new("repo"), format!("git+file://{}#v1.0.0", repo));
        let candidates = GitResolver::new().get_candidates(&range, &ctx).await.unwrap();

        assert_eq!(candidates, BTreeSet::from([format!("git+file://{}#{}", repo, commit)]));
    }

    #[test]
    fn test_is_satisfied() {
        let ctx = resolve_context();
        let commit = "0123456789abcdef0123456789abcdef01234567";

        let locator = PackageLocator::new(Ident::new("repo"), format!("https://example.com/repo.git#{}", commit));

        let pinned = PackageRange::new(Ident::new("repo"), format!("https://example.com/repo.git#{}", commit));
        assert!(GitResolver::new().is_satisfied(&pinned, &locator, &ctx).unwrap());

        let branch = PackageRange::new(Ident::new("repo"), "https://example.com/repo.git#main");
        assert!(!GitResolver::new().is_satisfied(&branch, &locator, &ctx).unwrap());
    }
}
