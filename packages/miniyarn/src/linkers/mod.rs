use std::collections::BTreeMap;

use futures::future::{join_all, BoxFuture};
use miniyarn_primitives::{PackageInfo, PackageLocator, PackageNode};
use miniyarn_utils::Path;

use crate::{build::BuildStep, config::Environment, error::Error, handler::Handler, limit::Limit, progress::Progress};

mod node_modules;
mod root;

pub use node_modules::NodeModulesLinker;
pub use root::RootLinker;

pub struct LinkContext<'a> {
    pub env: &'a Environment,
    pub limit: &'a Limit,
    pub linker: &'a dyn Linker,
    pub package_infos: &'a BTreeMap<PackageLocator, PackageInfo>,
    pub handlers: &'a BTreeMap<PackageLocator, Handler>,
    pub progress: &'a dyn Progress,
}

/// What's left to do after linking: the build steps to run, and how many
/// packages they'll build.
#[derive(Debug, Default)]
pub struct LinkResult {
    pub build_ticks: usize,
    pub steps: Vec<BuildStep>,
}

impl LinkResult {
    pub fn merge(&mut self, other: LinkResult) {
        self.build_ticks += other.build_ticks;
        self.steps.extend(other.steps);
    }
}

/// Places a package (and, through the context's linker, its dependencies)
/// inside the `destination` directory.
pub trait Linker: Send + Sync {
    fn supports(&self, locator: &PackageLocator) -> bool;

    fn link<'a>(&'a self, node: &'a PackageNode, destination: &'a Path, ctx: &'a LinkContext<'a>) -> BoxFuture<'a, Result<LinkResult, Error>>;
}

/// Links every dependency of the node concurrently. All of them get a chance
/// to complete before the first error (if any) is reported.
pub async fn link_dependencies(node: &PackageNode, destination: &Path, ctx: &LinkContext<'_>) -> Result<LinkResult, Error> {
    let results = join_all(node.dependencies.values().map(|dependency| {
        ctx.linker.link(dependency, destination, ctx)
    })).await;

    let mut link_result
        = LinkResult::default();

    for result in results {
        link_result.merge(result?);
    }

    Ok(link_result)
}

#[derive(Default)]
pub struct MultiLinker {
    linkers: Vec<Box<dyn Linker>>,
}

impl MultiLinker {
    pub fn new() -> MultiLinker {
        MultiLinker::default()
    }

    pub fn with<L: Linker + 'static>(mut self, linker: L) -> MultiLinker {
        self.linkers.push(Box::new(linker));
        self
    }

    pub fn select(&self, locator: &PackageLocator) -> Result<&dyn Linker, Error> {
        let mut candidates = self.linkers.iter()
            .filter(|linker| linker.supports(locator));

        match (candidates.next(), candidates.next()) {
            (Some(linker), None) => Ok(linker.as_ref()),
            (None, _) => Err(Error::NoLinkerFound(locator.clone())),
            (Some(_), Some(_)) => Err(Error::AmbiguousLinker(locator.clone())),
        }
    }
}

impl Linker for MultiLinker {
    fn supports(&self, locator: &PackageLocator) -> bool {
        self.linkers.iter().any(|linker| linker.supports(locator))
    }

    fn link<'a>(&'a self, node: &'a PackageNode, destination: &'a Path, ctx: &'a LinkContext<'a>) -> BoxFuture<'a, Result<LinkResult, Error>> {
        Box::pin(async move {
            self.select(&node.locator)?
                .link(node, destination, ctx)
                .await
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use miniyarn_primitives::Ident;

    use super::*;

    #[test]
    fn test_selection() {
        let linker = MultiLinker::new()
            .with(RootLinker::new())
            .with(NodeModulesLinker::new());

        assert!(linker.select(&PackageLocator::root(None)).is_ok());
        assert!(linker.select(&PackageLocator::new(Ident::new("pkg"), "1.0.0")).is_ok());

        let ambiguous = MultiLinker::new()
            .with(NodeModulesLinker::new())
            .with(NodeModulesLinker::new());

        assert!(matches!(ambiguous.select(&PackageLocator::new(Ident::new("pkg"), "1.0.0")), Err(Error::AmbiguousLinker(_))));
        assert!(matches!(MultiLinker::new().select(&PackageLocator::root(None)), Err(Error::NoLinkerFound(_))));
    }
}
