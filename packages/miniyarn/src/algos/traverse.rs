use std::collections::{BTreeSet, VecDeque};

use miniyarn_primitives::{PackageLocator, PackageNode};

/// Breadth-first walk over the tree. The value returned for a node is handed
/// to each of its children, which lets callers compute depths or ancestries
/// without a second pass.
pub fn traverse_package_tree<A, F>(tree: &PackageNode, initial: A, mut f: F)
where
    A: Clone,
    F: FnMut(&PackageNode, &A) -> A,
{
    let mut queue
        = VecDeque::from([(tree, initial)]);

    while let Some((node, accumulator)) = queue.pop_front() {
        let child_accumulator
            = f(node, &accumulator);

        for dependency in node.dependencies.values() {
            queue.push_back((dependency, child_accumulator.clone()));
        }
    }
}

pub fn get_package_tree_locators(tree: &PackageNode, include_root: bool) -> BTreeSet<PackageLocator> {
    let mut locators
        = BTreeSet::new();

    traverse_package_tree(tree, true, |node, is_root| {
        if include_root || !is_root {
            locators.insert(node.locator.clone());
        }

        false
    });

    locators
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeMap;

    use miniyarn_primitives::Ident;

    use super::*;

    pub fn node(name: &str, reference: &str, dependencies: Vec<PackageNode>) -> PackageNode {
        let dependencies = dependencies.into_iter()
            .map(|dependency| (dependency.locator.name.clone().unwrap(), dependency))
            .collect::<BTreeMap<_, _>>();

        PackageNode::new(PackageLocator::new(Ident::new(name), reference))
            .with_dependencies(dependencies)
    }

    fn sample_tree() -> PackageNode {
        PackageNode::new(PackageLocator::root(None)).with_dependencies(BTreeMap::from([
            (Ident::new("a"), node("a", "1.0.0", vec![node("c", "1.0.0", vec![])])),
            (Ident::new("b"), node("b", "1.0.0", vec![node("c", "1.0.0", vec![]), node("d", "2.0.0", vec![])])),
        ]))
    }

    #[test]
    fn test_breadth_first_order() {
        let mut visited = vec![];

        traverse_package_tree(&sample_tree(), 0, |node, depth| {
            visited.push((node.locator.name.as_ref().map(|name| name.to_string()), *depth));
            depth + 1
        });

        assert_eq!(visited, vec![
            (None, 0),
            (Some("a".to_string()), 1),
            (Some("b".to_string()), 1),
            (Some("c".to_string()), 2),
            (Some("c".to_string()), 2),
            (Some("d".to_string()), 2),
        ]);
    }

    #[test]
    fn test_distinct_locators() {
        let locators = get_package_tree_locators(&sample_tree(), false);

        assert_eq!(locators.len(), 4);
        assert!(!locators.contains(&PackageLocator::root(None)));

        assert_eq!(get_package_tree_locators(&sample_tree(), true).len(), 5);
    }
}
