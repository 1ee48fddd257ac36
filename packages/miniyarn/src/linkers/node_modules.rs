use futures::future::BoxFuture;
use miniyarn_primitives::{PackageInfo, PackageLocator, PackageNode};
use miniyarn_utils::Path;

use crate::{build::{write_atomic_marker, BuildStep}, config::Environment, error::Error};

use super::{link_dependencies, LinkContext, LinkResult, Linker};

/// Installs packages into nested `node_modules` folders, mirroring the shape
/// of the resolved tree.
#[derive(Debug, Default)]
pub struct NodeModulesLinker;

impl NodeModulesLinker {
    pub fn new() -> NodeModulesLinker {
        NodeModulesLinker
    }
}

/// An install is only trusted if its marker exists (the previous install ran
/// to completion) and it holds the very same reference.
fn needs_update(package_path: &Path, locator: &PackageLocator, env: &Environment) -> bool {
    if !env.atomic_path(package_path).fs_is_file() {
        return true;
    }

    let installed_reference = env.info_path(package_path).fs_read_text().ok()
        .and_then(|content| serde_json::from_str::<PackageInfo>(&content).ok())
        .and_then(|package_info| package_info.reference);

    installed_reference != locator.reference
}

fn link_binaries(package_info: &PackageInfo, package_path: &Path, bin_dir: &Path) -> Result<(), Error> {
    for (bin_name, bin_path) in package_info.bin_entries() {
        let target
            = package_path.with_join_str(&bin_path);

        if target.fs_is_file() {
            target.fs_set_executable()?;
        }

        bin_dir.with_join_str(&bin_name)
            .fs_ensure_symlink(&target)?;
    }

    Ok(())
}

fn install_package_files(source_path: &Path, package_path: &Path, node_modules_path: &Path, package_info: &PackageInfo, env: &Environment) -> Result<(), Error> {
    // The marker goes first; if anything below gets interrupted, the next
    // install will see the package as outdated
    env.atomic_path(package_path)
        .fs_rm_if_exists()?;
    package_path
        .fs_rm_if_exists()?;

    source_path.fs_copy_filtered(package_path, &|relative_path| {
        relative_path.as_str() != env.atomic_filename && relative_path.as_str() != env.archive_filename
    })?;

    link_binaries(package_info, package_path, &node_modules_path.with_join_str(".bin"))?;

    for bundled_name in &package_info.bundled_dependencies {
        let bundled_path = package_path
            .with_join_str("node_modules")
            .with_join_str(bundled_name.as_str());

        let bundled_info
            = PackageInfo::from_manifest_str(&bundled_path.with_join_str("package.json").fs_read_text()?)?;

        link_binaries(&bundled_info, &bundled_path, &package_path.with_join_str("node_modules/.bin"))?;
    }

    Ok(())
}

impl Linker for NodeModulesLinker {
    fn supports(&self, locator: &PackageLocator) -> bool {
        !locator.is_root()
    }

    fn link<'a>(&'a self, node: &'a PackageNode, destination: &'a Path, ctx: &'a LinkContext<'a>) -> BoxFuture<'a, Result<LinkResult, Error>> {
        Box::pin(async move {
            let name = node.name()
                .ok_or_else(|| Error::MissingPackageName(node.locator.clone()))?;
            let package_info = ctx.package_infos.get(&node.locator)
                .ok_or_else(|| Error::MissingPackageInfo(node.locator.clone()))?;
            let handler = ctx.handlers.get(&node.locator)
                .ok_or_else(|| Error::MissingHandler(node.locator.clone()))?;

            let node_modules_path
                = destination.with_join_str("node_modules");
            let package_path
                = node_modules_path.with_join_str(name.as_str());

            let needs_update
                = needs_update(&package_path, &node.locator, ctx.env);

            if needs_update {
                log::debug!("Installing {} into {}", node.locator, package_path);

                let source_path = handler.path().clone();
                let package_path = package_path.clone();
                let package_info = package_info.clone();
                let env = ctx.env.clone();

                ctx.limit.run(async move {
                    tokio::task::spawn_blocking(move || {
                        install_package_files(&source_path, &package_path, &node_modules_path, &package_info, &env)
                    }).await?
                }).await?;
            }

            ctx.progress.tick();

            let mut link_result
                = link_dependencies(node, &package_path, ctx).await?;

            if package_info.has_lifecycle_scripts() && (needs_update || link_result.build_ticks > 0) {
                for (script_name, script) in package_info.lifecycle_scripts() {
                    link_result.steps.push(BuildStep::RunScript {
                        locator: node.locator.clone(),
                        package_path: package_path.clone(),
                        script_name,
                        script,
                    });
                }

                link_result.steps.push(BuildStep::Finalize {
                    locator: node.locator.clone(),
                    marker_path: Some(ctx.env.atomic_path(&package_path)),
                });

                link_result.build_ticks += 1;

                return Ok(link_result);
            }

            write_atomic_marker(&ctx.env.atomic_path(&package_path), &node.locator)?;

            Ok(link_result)
        })
    }
}
