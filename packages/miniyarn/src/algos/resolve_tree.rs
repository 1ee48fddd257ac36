use std::collections::{BTreeMap, BTreeSet};

use futures::future::{join_all, BoxFuture};
use miniyarn_primitives::{DependencyKind, Ident, PackageInfo, PackageLocator, PackageNode, PackageRange, PackageResolution};

use crate::{error::{set_timeout, Error}, progress::Progress, resolvers::{ResolveContext, Resolver}};

#[derive(Clone, Debug, Default)]
pub struct ResolveOptions {
    pub production: bool,
}

impl ResolveOptions {
    pub fn with_production(mut self, production: bool) -> ResolveOptions {
        self.production = production;
        self
    }

    /// The dependency kinds read from the root manifest. Packages deeper in
    /// the tree only ever contribute their regular dependencies.
    pub fn root_dependency_kinds(&self) -> Vec<DependencyKind> {
        match self.production {
            true => vec![DependencyKind::Regular, DependencyKind::Peer],
            false => vec![DependencyKind::Regular, DependencyKind::Dev, DependencyKind::Peer],
        }
    }
}

#[derive(Debug)]
pub struct ResolutionOutcome {
    pub package_tree: PackageNode,
    pub tree_size: usize,
    pub errors: BTreeMap<PackageRange, Error>,
}

/// A package visible from the current branch, with the range references it
/// got resolved from along that branch.
#[derive(Clone, Debug)]
struct AvailablePackage {
    locator: PackageLocator,
    references: BTreeSet<String>,
}

impl AvailablePackage {
    fn new(locator: PackageLocator) -> AvailablePackage {
        AvailablePackage {locator, references: BTreeSet::new()}
    }
}

type Available = BTreeMap<Ident, AvailablePackage>;

struct TreeResolver<'a> {
    resolver: &'a dyn Resolver,
    ctx: &'a ResolveContext,
    progress: &'a dyn Progress,
}

impl<'a> TreeResolver<'a> {
    fn is_available(&self, range: &PackageRange, available: &Available) -> bool {
        let Some(package) = available.get(&range.name) else {
            return false;
        };

        // Tags and branches never satisfy a locator on their own, but the
        // exact range an ancestor came from does
        if package.locator.is_root() || package.references.contains(&range.reference) {
            return true;
        }

        match self.resolver.is_satisfied(range, &package.locator, self.ctx) {
            Ok(is_satisfied) => is_satisfied,
            Err(error) => {
                log::debug!("Couldn't check {} against {}: {}", range, package.locator, error);
                false
            },
        }
    }

    async fn resolve_range(&self, range: &PackageRange) -> Result<PackageResolution, Error> {
        let resolution
            = set_timeout(self.ctx.fetch.env.fetch_timeout, self.resolver.resolve(range, self.ctx)).await??;

        log::debug!("Resolved {} to {}", range, resolution.locator);

        Ok(resolution)
    }

    fn resolve_node(&'a self, resolution: PackageResolution, available: Available) -> BoxFuture<'a, ResolutionOutcome> {
        Box::pin(async move {
            // Ranges an ancestor already satisfies are dropped from the node;
            // this is also what stops dependency loops from recursing forever
            let pending_ranges = resolution.dependencies.values()
                .filter(|range| !self.is_available(range, &available))
                .cloned()
                .collect::<Vec<_>>();

            self.progress.add(pending_ranges.len());

            let results = join_all(pending_ranges.iter().map(|range| async move {
                let result
                    = self.resolve_range(range).await;

                self.progress.tick();
                result
            })).await;

            let mut errors
                = BTreeMap::new();
            let mut resolved
                = Vec::new();

            for (range, result) in pending_ranges.into_iter().zip(results) {
                match result {
                    Ok(dependency) => resolved.push((range, dependency)),
                    Err(error) => {
                        errors.insert(range, error);
                    },
                }
            }

            // Only this node's own subtree gets to see its dependencies
            let mut child_available
                = available;

            for (range, dependency) in &resolved {
                let package = child_available.entry(range.name.clone())
                    .or_insert_with(|| AvailablePackage::new(dependency.locator.clone()));

                if package.locator != dependency.locator {
                    *package = AvailablePackage::new(dependency.locator.clone());
                }

                package.references.insert(range.reference.clone());
            }

            let child_outcomes = join_all(resolved.into_iter().map(|(range, dependency)| {
                let name
                    = range.name;

                let child_available
                    = child_available.clone();

                async move {
                    (name, self.resolve_node(dependency, child_available).await)
                }
            })).await;

            let mut dependencies
                = BTreeMap::new();
            let mut tree_size
                = 1;

            for (name, outcome) in child_outcomes {
                tree_size += outcome.tree_size;
                errors.extend(outcome.errors);
                dependencies.insert(name, outcome.package_tree);
            }

            ResolutionOutcome {
                package_tree: PackageNode::new(resolution.locator).with_dependencies(dependencies),
                tree_size,
                errors,
            }
        })
    }
}

/// Resolves the dependencies of the root package recursively into a tree.
/// Failures are collected per range instead of aborting the resolution, so a
/// single broken package doesn't hide the problems of its siblings.
pub async fn resolve_package_tree(root_info: &PackageInfo, resolver: &dyn Resolver, ctx: &ResolveContext, options: &ResolveOptions, progress: &dyn Progress) -> ResolutionOutcome {
    log::info!("Resolving the dependencies of {}", root_info.locator());

    let root_locator
        = root_info.locator();

    let root_resolution = PackageResolution::new(root_locator.clone())
        .with_dependencies(root_info.dependency_ranges(&options.root_dependency_kinds()));

    let mut available
        = Available::new();

    if let Some(name) = &root_locator.name {
        available.insert(name.clone(), AvailablePackage::new(root_locator.clone()));
    }

    let tree_resolver
        = TreeResolver {resolver, ctx, progress};

    progress.add(1);

    let outcome
        = tree_resolver.resolve_node(root_resolution, available).await;

    progress.tick();

    outcome
}
