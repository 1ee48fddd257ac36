use std::{collections::BTreeSet, sync::Arc};

use miniyarn_primitives::{Ident, PackageNode};
use miniyarn_utils::Glob;

use crate::{
    algos::{fetch_all_packages, get_package_tree_locators, resolve_package_tree, traverse_package_tree, FetchOutcome, ResolveOptions},
    build::run_build_steps,
    chains::{default_fetcher, default_linker, default_resolver},
    config::Environment,
    error::Error,
    fetchers::{FetchContext, Fetcher},
    http::HttpClient,
    limit::Limit,
    linkers::{LinkContext, Linker},
    lockfile::Lockfile,
    progress::{NoopProgress, Progress},
    project::Project,
    report::{format_package_tree, sorted_failures, TreeFormat},
    resolvers::{ResolveContext, Resolver},
};

#[derive(Clone, Debug)]
pub struct InstallOptions {
    pub production: bool,
    pub lock: bool,
}

impl Default for InstallOptions {
    fn default() -> Self {
        InstallOptions {production: false, lock: true}
    }
}

impl InstallOptions {
    pub fn with_production(mut self, production: bool) -> Self {
        self.production = production;
        self
    }

    pub fn with_lock(mut self, lock: bool) -> Self {
        self.lock = lock;
        self
    }
}

/// Everything an operation needs besides the project itself: the
/// configuration, and the chains used to resolve, fetch, and link packages.
#[derive(Clone)]
pub struct InstallContext {
    pub env: Arc<Environment>,
    pub http: Arc<HttpClient>,
    pub fetcher: Arc<dyn Fetcher>,
    pub resolver: Arc<dyn Resolver>,
    pub linker: Arc<dyn Linker>,
    pub progress: Arc<dyn Progress>,
}

impl InstallContext {
    pub fn new(env: Environment) -> Result<InstallContext, Error> {
        let env
            = Arc::new(env);
        let http
            = HttpClient::new(&env)?;

        Ok(InstallContext {
            env,
            http,
            fetcher: Arc::new(default_fetcher()?),
            resolver: Arc::new(default_resolver()),
            linker: Arc::new(default_linker()),
            progress: Arc::new(NoopProgress),
        })
    }

    pub fn with_fetcher<F: Fetcher + 'static>(mut self, fetcher: F) -> Self {
        self.fetcher = Arc::new(fetcher);
        self
    }

    pub fn with_resolver<R: Resolver + 'static>(mut self, resolver: R) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    pub fn with_linker<L: Linker + 'static>(mut self, linker: L) -> Self {
        self.linker = Arc::new(linker);
        self
    }

    pub fn with_progress<P: Progress + 'static>(mut self, progress: P) -> Self {
        self.progress = Arc::new(progress);
        self
    }

    pub fn fetch_context(&self) -> FetchContext {
        FetchContext::new(self.env.clone(), self.http.clone())
    }

    pub fn resolve_context(&self) -> ResolveContext {
        ResolveContext::new(self.fetch_context(), self.fetcher.clone())
    }
}

#[derive(Debug)]
pub struct ResolvedProject {
    pub package_tree: PackageNode,
    pub tree_size: usize,
    pub from_lockfile: bool,
}

#[derive(Debug)]
pub struct InstallSummary {
    pub package_tree: PackageNode,
    pub fetched_packages: usize,
    pub build_ticks: usize,
}

/// Builds the tree out of the lockfile, provided it still covers every
/// dependency the manifest lists. The references it holds win over the
/// manifest ranges.
fn tree_from_lockfile(project: &Project, lockfile: &Lockfile, options: &InstallOptions, progress: &dyn Progress) -> Option<ResolvedProject> {
    let root_dependencies = project.package_info
        .dependency_ranges(&ResolveOptions::default().with_production(options.production).root_dependency_kinds())
        .into_keys()
        .collect::<BTreeSet<Ident>>();

    if let Some(missing) = root_dependencies.iter().find(|name| !lockfile.dependencies.contains_key(*name)) {
        log::info!("The lockfile doesn't list {}; resolving from scratch", missing);
        return None;
    }

    let mut package_tree
        = lockfile.to_tree(project.root_locator());

    // Dev dependencies are only ever listed at the top level
    package_tree.dependencies.retain(|name, _| root_dependencies.contains(name));

    let mut tree_size
        = 1;

    progress.add(1);

    traverse_package_tree(&package_tree, (), |node, _| {
        tree_size += node.dependencies.len();

        progress.add(node.dependencies.len());
        progress.tick();
    });

    Some(ResolvedProject {package_tree, tree_size, from_lockfile: true})
}

pub async fn resolve_project(project: &Project, ctx: &InstallContext, options: &InstallOptions) -> Result<ResolvedProject, Error> {
    if options.lock {
        if let Some(lockfile) = project.lockfile()? {
            if let Some(resolved) = tree_from_lockfile(project, &lockfile, options, ctx.progress.as_ref()) {
                log::info!("Resolved {} package(s) from the lockfile", resolved.tree_size - 1);
                return Ok(resolved);
            }
        }
    }

    let resolve_options = ResolveOptions::default()
        .with_production(options.production);

    let outcome
        = resolve_package_tree(&project.package_info, ctx.resolver.as_ref(), &ctx.resolve_context(), &resolve_options, ctx.progress.as_ref()).await;

    if !outcome.errors.is_empty() {
        return Err(Error::ResolutionFailed(sorted_failures(outcome.errors)));
    }

    log::info!("Resolved {} package(s)", outcome.tree_size - 1);

    Ok(ResolvedProject {package_tree: outcome.package_tree, tree_size: outcome.tree_size, from_lockfile: false})
}

/// Resolves the project from scratch and stores the result in its lockfile,
/// without installing anything.
pub async fn lock(project: &Project, ctx: &InstallContext) -> Result<Lockfile, Error> {
    let options = InstallOptions::default()
        .with_lock(false);

    let resolved
        = resolve_project(project, ctx, &options).await?;

    let lockfile
        = Lockfile::from_tree(&resolved.package_tree);

    lockfile.write(&project.lockfile_path())?;

    Ok(lockfile)
}

/// Resolves the project and renders its tree.
pub async fn resolve(project: &Project, ctx: &InstallContext, options: &InstallOptions, format: TreeFormat, filter: Option<&Glob>) -> Result<String, Error> {
    let resolved
        = resolve_project(project, ctx, options).await?;

    Ok(format_package_tree(&resolved.package_tree, format, filter))
}

pub async fn install(project: &Project, ctx: &InstallContext, options: &InstallOptions) -> Result<InstallSummary, Error> {
    let resolved
        = resolve_project(project, ctx, options).await?;

    let package_locators
        = get_package_tree_locators(&resolved.package_tree, false);

    let network_limit
        = Limit::new(ctx.env.network_concurrency);

    let FetchOutcome {mut package_infos, handlers, errors}
        = fetch_all_packages(&package_locators, ctx.fetcher.as_ref(), &ctx.fetch_context(), &network_limit, ctx.progress.as_ref()).await;

    if !errors.is_empty() {
        return Err(Error::FetchFailed(sorted_failures(errors)));
    }

    // Production trees lack the dev dependencies, which would get lost from
    // the lockfile
    if !resolved.from_lockfile && !options.production {
        Lockfile::from_tree(&resolved.package_tree)
            .write(&project.lockfile_path())?;
    }

    // The root can't be fetched since it has no reference
    package_infos.insert(project.root_locator(), project.package_info.clone());

    log::info!("Linking {} package(s)", resolved.tree_size - 1);

    let link_limit
        = Limit::new(ctx.env.link_concurrency);

    let link_ctx = LinkContext {
        env: &ctx.env,
        limit: &link_limit,
        linker: ctx.linker.as_ref(),
        package_infos: &package_infos,
        handlers: &handlers,
        progress: ctx.progress.as_ref(),
    };

    ctx.progress.add(resolved.tree_size - 1);

    let link_result
        = ctx.linker.link(&resolved.package_tree, &project.project_cwd, &link_ctx).await?;

    if link_result.build_ticks > 0 {
        log::info!("Building {} fresh package(s)", link_result.build_ticks);

        ctx.progress.add(link_result.build_ticks);
        run_build_steps(&link_result.steps, ctx.progress.as_ref()).await?;
    }

    Ok(InstallSummary {
        package_tree: resolved.package_tree,
        fetched_packages: package_locators.len(),
        build_ticks: link_result.build_ticks,
    })
}
