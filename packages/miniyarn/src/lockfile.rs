use std::collections::BTreeMap;

use miniyarn_primitives::{Ident, PackageLocator, PackageNode};
use miniyarn_utils::{OkMissing, Path};
use serde::{Deserialize, Serialize};

use crate::{algos::traverse_package_tree, error::Error};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockfileEntry {
    pub reference: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<Ident, LockfileEntry>,
}

/// The resolved tree of a project, persisted as nested `{reference,
/// dependencies}` entries so a later install can skip the resolution.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lockfile {
    #[serde(default)]
    pub dependencies: BTreeMap<Ident, LockfileEntry>,
}

fn entries_to_nodes(entries: &BTreeMap<Ident, LockfileEntry>) -> BTreeMap<Ident, PackageNode> {
    entries.iter()
        .map(|(name, entry)| {
            let node = PackageNode::new(PackageLocator::new(name.clone(), entry.reference.clone()))
                .with_dependencies(entries_to_nodes(&entry.dependencies));

            (name.clone(), node)
        })
        .collect()
}

impl Lockfile {
    pub fn new() -> Lockfile {
        Lockfile::default()
    }

    fn entries_at_mut(&mut self, path: &[Ident]) -> &mut BTreeMap<Ident, LockfileEntry> {
        let mut entries
            = &mut self.dependencies;

        for name in path {
            entries = &mut entries.entry(name.clone()).or_default().dependencies;
        }

        entries
    }

    pub fn from_tree(tree: &PackageNode) -> Lockfile {
        let mut lockfile
            = Lockfile::new();

        traverse_package_tree(tree, Vec::<Ident>::new(), |node, parent_path| {
            if std::ptr::eq(node, tree) {
                return Vec::new();
            }

            let Some(name) = node.name() else {
                return parent_path.clone();
            };

            lockfile.entries_at_mut(parent_path).insert(name.clone(), LockfileEntry {
                reference: node.reference().unwrap_or_default().to_string(),
                dependencies: BTreeMap::new(),
            });

            let mut path
                = parent_path.clone();

            path.push(name.clone());
            path
        });

        lockfile
    }

    pub fn to_tree(&self, root_locator: PackageLocator) -> PackageNode {
        PackageNode::new(root_locator)
            .with_dependencies(entries_to_nodes(&self.dependencies))
    }

    pub fn read(path: &Path) -> Result<Option<Lockfile>, Error> {
        let Some(content) = path.fs_read_text().ok_missing()? else {
            return Ok(None);
        };

        let lockfile = serde_json::from_str(&content)
            .map_err(|err| Error::InvalidLockfile(err.to_string()))?;

        Ok(Some(lockfile))
    }

    pub fn write(&self, path: &Path) -> Result<(), Error> {
        let mut content
            = serde_json::to_string_pretty(self)?;

        content.push('\n');

        path.fs_write_text(content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, reference: &str, dependencies: Vec<PackageNode>) -> PackageNode {
        let dependencies = dependencies.into_iter()
            .map(|dependency| (dependency.locator.name.clone().unwrap(), dependency))
            .collect();

        PackageNode::new(PackageLocator::new(Ident::new(name), reference))
            .with_dependencies(dependencies)
    }

    #[test]
    fn test_tree_conversion() {
        let root = PackageLocator::root(Some(Ident::new("project")));

        let tree = PackageNode::new(root.clone()).with_dependencies(BTreeMap::from([
            (Ident::new("a"), node("a", "1.0.0", vec![node("b", "2.0.0", vec![node("c", "3.0.0", vec![])])])),
            (Ident::new("@scope/d"), node("@scope/d", "https://example.com/d.tgz", vec![])),
        ]));

        let lockfile = Lockfile::from_tree(&tree);

        let b = &lockfile.dependencies[&Ident::new("a")].dependencies[&Ident::new("b")];
        assert_eq!(b.reference, "2.0.0");
        assert_eq!(b.dependencies[&Ident::new("c")].reference, "3.0.0");

        assert_eq!(lockfile.to_tree(root), tree);
    }

    #[test]
    fn test_file_format() {
        let lockfile: Lockfile = serde_json::from_str(r#"{
            "dependencies": {
                "one-fixed-dep": {"reference": "1.0.0", "dependencies": {"no-deps": {"reference": "1.0.0"}}}
            }
        }"#).unwrap();

        let path = Path::temp_file("yarn.json").unwrap();
        lockfile.write(&path).unwrap();

        assert_eq!(Lockfile::read(&path).unwrap(), Some(lockfile));
        assert_eq!(Lockfile::read(&Path::temp_file("missing.json").unwrap()).unwrap(), None);
    }

    #[test]
    fn test_invalid_lockfile() {
        let path = Path::temp_file("yarn.json").unwrap();
        path.fs_write_text("{\"dependencies\": []}").unwrap();

        assert!(matches!(Lockfile::read(&path), Err(Error::InvalidLockfile(_))));
    }
}
