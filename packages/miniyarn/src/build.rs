use miniyarn_primitives::PackageLocator;
use miniyarn_utils::{Path, ToFileString};

use crate::{error::Error, progress::Progress, script::run_lifecycle_script};

/// Deferred work produced by the linkers, executed once every package of the
/// tree sits on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BuildStep {
    RunScript {
        locator: PackageLocator,
        package_path: Path,
        script_name: String,
        script: String,
    },

    /// Marks a package as fully built. Packages without a marker (the
    /// project itself) only report progress.
    Finalize {
        locator: PackageLocator,
        marker_path: Option<Path>,
    },
}

pub fn write_atomic_marker(marker_path: &Path, locator: &PackageLocator) -> Result<(), Error> {
    marker_path.fs_write_text(locator.to_file_string())?;
    Ok(())
}

/// Runs the steps in order. The first failing script aborts the remaining
/// ones, leaving the packages it didn't reach without their marker.
pub async fn run_build_steps(steps: &[BuildStep], progress: &dyn Progress) -> Result<(), Error> {
    for step in steps {
        match step {
            BuildStep::RunScript {locator, package_path, script_name, script} => {
                run_lifecycle_script(locator, package_path, script_name, script).await?;
            },

            BuildStep::Finalize {locator, marker_path} => {
                if let Some(marker_path) = marker_path {
                    write_atomic_marker(marker_path, locator)?;
                }

                log::debug!("Built {}", locator);
                progress.tick();
            },
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use miniyarn_primitives::Ident;

    use super::*;
    use crate::progress::NoopProgress;

    #[tokio::test]
    async fn test_failure_aborts_remaining_steps() {
        let package_path = Path::temp_dir().unwrap();
        let marker_path = package_path.with_join_str(".yarn-atomic");
        let locator = PackageLocator::new(Ident::new("pkg"), "1.0.0");

        let script = |script_name: &str, script: &str| BuildStep::RunScript {
            locator: locator.clone(),
            package_path: package_path.clone(),
            script_name: script_name.to_string(),
            script: script.to_string(),
        };

        let steps = vec![
            script("preinstall", "echo pre >> log.txt"),
            script("install", "exit 1"),
            script("postinstall", "echo post >> log.txt"),
            BuildStep::Finalize {locator: locator.clone(), marker_path: Some(marker_path.clone())},
        ];

        let result = run_build_steps(&steps, &NoopProgress).await;

        assert!(matches!(result, Err(Error::LifecycleScriptFailed {..})));
        assert_eq!(package_path.with_join_str("log.txt").fs_read_text().unwrap(), "pre\n");
        assert!(!marker_path.fs_exists());
    }

    #[tokio::test]
    async fn test_finalize_writes_marker() {
        let package_path = Path::temp_dir().unwrap();
        let marker_path = package_path.with_join_str(".yarn-atomic");
        let locator = PackageLocator::new(Ident::new("pkg"), "1.0.0");

        run_build_steps(&[BuildStep::Finalize {locator, marker_path: Some(marker_path.clone())}], &NoopProgress).await.unwrap();

        assert_eq!(marker_path.fs_read_text().unwrap(), "pkg@1.0.0");
    }
}
