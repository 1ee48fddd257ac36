use std::collections::BTreeMap;

use crate::{Ident, PackageLocator, PackageRange};

/// A locator along with the ranges it depends on, before those are resolved.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PackageResolution {
    pub locator: PackageLocator,
    pub dependencies: BTreeMap<Ident, PackageRange>,
}

impl PackageResolution {
    pub fn new(locator: PackageLocator) -> PackageResolution {
        PackageResolution {locator, dependencies: BTreeMap::new()}
    }

    pub fn with_dependencies(self, dependencies: BTreeMap<Ident, PackageRange>) -> PackageResolution {
        PackageResolution {dependencies, ..self}
    }
}
