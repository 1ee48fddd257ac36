use std::collections::BTreeMap;

use crate::{Ident, PackageLocator};

/// A node of the resolved dependency tree. A name appears at most once among
/// the children of a node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PackageNode {
    pub locator: PackageLocator,
    pub dependencies: BTreeMap<Ident, PackageNode>,
}

impl PackageNode {
    pub fn new(locator: PackageLocator) -> PackageNode {
        PackageNode {locator, dependencies: BTreeMap::new()}
    }

    pub fn with_dependencies(self, dependencies: BTreeMap<Ident, PackageNode>) -> PackageNode {
        PackageNode {dependencies, ..self}
    }

    pub fn name(&self) -> Option<&Ident> {
        self.locator.name.as_ref()
    }

    pub fn reference(&self) -> Option<&str> {
        self.locator.reference.as_deref()
    }
}
