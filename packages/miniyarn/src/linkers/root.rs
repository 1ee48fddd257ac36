use futures::future::BoxFuture;
use miniyarn_primitives::{PackageLocator, PackageNode};
use miniyarn_utils::Path;

use crate::{build::BuildStep, error::Error};

use super::{link_dependencies, LinkContext, LinkResult, Linker};

/// Links the project itself: its dependencies go into its own
/// `node_modules`, and its lifecycle scripts run after everything else.
#[derive(Debug, Default)]
pub struct RootLinker;

impl RootLinker {
    pub fn new() -> RootLinker {
        RootLinker
    }
}

impl Linker for RootLinker {
    fn supports(&self, locator: &PackageLocator) -> bool {
        locator.is_root()
    }

    fn link<'a>(&'a self, node: &'a PackageNode, destination: &'a Path, ctx: &'a LinkContext<'a>) -> BoxFuture<'a, Result<LinkResult, Error>> {
        Box::pin(async move {
            let mut link_result
                = link_dependencies(node, destination, ctx).await?;

            let lifecycle_scripts = ctx.package_infos.get(&node.locator)
                .map(|package_info| package_info.lifecycle_scripts())
                .unwrap_or_default();

            if !lifecycle_scripts.is_empty() {
                for (script_name, script) in lifecycle_scripts {
                    link_result.steps.push(BuildStep::RunScript {
                        locator: node.locator.clone(),
                        package_path: destination.clone(),
                        script_name,
                        script,
                    });
                }

                link_result.steps.push(BuildStep::Finalize {
                    locator: node.locator.clone(),
                    marker_path: None,
                });

                link_result.build_ticks += 1;
            }

            Ok(link_result)
        })
    }
}
