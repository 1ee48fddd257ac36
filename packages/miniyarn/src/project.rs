use miniyarn_primitives::{PackageInfo, PackageLocator};
use miniyarn_utils::Path;

use crate::{error::Error, lockfile::Lockfile};

pub const MANIFEST_NAME: &str = "package.json";
pub const LOCKFILE_NAME: &str = "yarn.json";

pub struct Project {
    pub project_cwd: Path,
    pub package_info: PackageInfo,
}

impl Project {
    pub fn find_closest_project(cwd: &Path) -> Result<Path, Error> {
        let mut current
            = Some(cwd.clone());

        while let Some(dir) = current {
            if dir.with_join_str(MANIFEST_NAME).fs_is_file() {
                return Ok(dir);
            }

            current = dir.dirname();
        }

        Err(Error::ManifestNotFound(cwd.to_string()))
    }

    /// Opens the project owning `cwd`. The root package is identified by its
    /// name only; it has no reference.
    pub fn new(cwd: &Path) -> Result<Project, Error> {
        let project_cwd
            = Project::find_closest_project(cwd)?;

        let manifest
            = project_cwd.with_join_str(MANIFEST_NAME).fs_read_text()?;

        let package_info
            = PackageInfo::from_manifest_str(&manifest)?;

        let root_locator
            = PackageLocator::root(package_info.name.clone());

        Ok(Project {
            project_cwd,
            package_info: package_info.with_locator(&root_locator),
        })
    }

    pub fn root_locator(&self) -> PackageLocator {
        self.package_info.locator()
    }

    pub fn lockfile_path(&self) -> Path {
        self.project_cwd.with_join_str(LOCKFILE_NAME)
    }

    pub fn nm_path(&self) -> Path {
        self.project_cwd.with_join_str("node_modules")
    }

    pub fn lockfile(&self) -> Result<Option<Lockfile>, Error> {
        Lockfile::read(&self.lockfile_path())
    }
}
