use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;
use miniyarn_primitives::{Ident, PackageNode};
use miniyarn_utils::{Glob, ToFileString};

use crate::{algos::get_package_tree_locators, error::Error};

/// Turns an error map into a list sorted by package identifier, the order
/// they get reported in.
pub fn sorted_failures<K: ToFileString>(errors: BTreeMap<K, Error>) -> Vec<(String, Error)> {
    errors.into_iter()
        .map(|(subject, error)| (subject.to_file_string(), error))
        .sorted_by(|(a, _), (b, _)| a.cmp(b))
        .collect()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TreeFormat {
    #[default]
    Tree,
    List,
    Uniq,
}

fn matches_filter(name: Option<&Ident>, filter: Option<&Glob>) -> bool {
    match (filter, name) {
        (None, _) => true,
        (Some(filter), Some(name)) => filter.is_match(name.as_str()),
        (Some(_), None) => false,
    }
}

struct TreeLine {
    label: String,
    children: Vec<TreeLine>,
}

/// Keeps the nodes matching the filter, along with their ancestors.
fn filter_tree(node: &PackageNode, filter: Option<&Glob>) -> Option<TreeLine> {
    let children = node.dependencies.values()
        .filter_map(|dependency| filter_tree(dependency, filter))
        .collect::<Vec<_>>();

    if children.is_empty() && !matches_filter(node.name(), filter) {
        return None;
    }

    Some(TreeLine {label: node.locator.to_file_string(), children})
}

fn render_children(children: &[TreeLine], prefix: &str, output: &mut String) {
    for (index, child) in children.iter().enumerate() {
        let (connector, child_prefix) = match index == children.len() - 1 {
            true => ("└─ ", format!("{}   ", prefix)),
            false => ("├─ ", format!("{}│  ", prefix)),
        };

        output.push_str(prefix);
        output.push_str(connector);
        output.push_str(&child.label);
        output.push('\n');

        render_children(&child.children, &child_prefix, output);
    }
}

fn format_tree(tree: &PackageNode, filter: Option<&Glob>) -> String {
    let children = tree.dependencies.values()
        .filter_map(|dependency| filter_tree(dependency, filter))
        .collect::<Vec<_>>();

    let mut output
        = ".\n".to_string();

    render_children(&children, "", &mut output);
    output
}

fn format_list(tree: &PackageNode, filter: Option<&Glob>) -> String {
    get_package_tree_locators(tree, false).into_iter()
        .filter(|locator| matches_filter(locator.name.as_ref(), filter))
        .map(|locator| format!("{}\n", locator.to_file_string()))
        .sorted()
        .collect()
}

/// One line per package name: how many distinct references of it the tree
/// holds, then the references themselves. Names with the most references
/// come first.
fn format_uniq(tree: &PackageNode, filter: Option<&Glob>) -> String {
    let mut references_by_name: BTreeMap<Ident, BTreeSet<String>>
        = BTreeMap::new();

    for locator in get_package_tree_locators(tree, false) {
        if !matches_filter(locator.name.as_ref(), filter) {
            continue;
        }

        if let (Some(name), Some(reference)) = (locator.name, locator.reference) {
            references_by_name.entry(name).or_default().insert(reference);
        }
    }

    references_by_name.into_iter()
        .sorted_by(|(a_name, a_references), (b_name, b_references)| {
            b_references.len().cmp(&a_references.len()).then_with(|| a_name.cmp(b_name))
        })
        .map(|(name, references)| format!("{} {} {}\n", references.len(), name.as_str(), references.iter().join(" ")))
        .collect()
}

pub fn format_package_tree(tree: &PackageNode, format: TreeFormat, filter: Option<&Glob>) -> String {
    match format {
        TreeFormat::Tree => format_tree(tree, filter),
        TreeFormat::List => format_list(tree, filter),
        TreeFormat::Uniq => format_uniq(tree, filter),
    }
}

#[cfg(test)]
mod tests {
    use miniyarn_primitives::{PackageLocator, PackageRange};

    use super::*;

    fn node(name: &str, reference: &str, dependencies: Vec<PackageNode>) -> PackageNode {
        let dependencies = dependencies.into_iter()
            .map(|dependency| (dependency.locator.name.clone().unwrap(), dependency))
            .collect();

        PackageNode::new(PackageLocator::new(Ident::new(name), reference))
            .with_dependencies(dependencies)
    }

    fn sample_tree() -> PackageNode {
        PackageNode::new(PackageLocator::root(None)).with_dependencies(BTreeMap::from([
            (Ident::new("a"), node("a", "1.0.0", vec![node("c", "1.0.0", vec![])])),
            (Ident::new("b"), node("b", "1.0.0", vec![node("c", "2.0.0", vec![])])),
        ]))
    }

    #[test]
    fn test_tree_format() {
        assert_eq!(format_package_tree(&sample_tree(), TreeFormat::Tree, None), [
            ".",
            "├─ a@1.0.0",
            "│  └─ c@1.0.0",
            "└─ b@1.0.0",
            "   └─ c@2.0.0",
            "",
        ].join("\n"));
    }

    #[test]
    fn test_tree_format_keeps_ancestors_of_matches() {
        let filter = Glob::parse("c").unwrap();

        assert_eq!(format_package_tree(&sample_tree(), TreeFormat::Tree, Some(&filter)), [
            ".",
            "├─ a@1.0.0",
            "│  └─ c@1.0.0",
            "└─ b@1.0.0",
            "   └─ c@2.0.0",
            "",
        ].join("\n"));

        let filter = Glob::parse("a").unwrap();

        assert_eq!(format_package_tree(&sample_tree(), TreeFormat::Tree, Some(&filter)), ".\n└─ a@1.0.0\n");
    }

    #[test]
    fn test_list_format() {
        assert_eq!(format_package_tree(&sample_tree(), TreeFormat::List, None), "a@1.0.0\nb@1.0.0\nc@1.0.0\nc@2.0.0\n");
    }

    #[test]
    fn test_uniq_format() {
        assert_eq!(format_package_tree(&sample_tree(), TreeFormat::Uniq, None), "2 c 1.0.0 2.0.0\n1 a 1.0.0\n1 b 1.0.0\n");
    }

    #[test]
    fn test_sorted_failures() {
        let errors = BTreeMap::from([
            (PackageRange::new(Ident::new("zeta"), "1.0.0"), Error::TaskTimeout),
            (PackageRange::new(Ident::new("@scope/alpha"), "^2.0.0"), Error::TaskTimeout),
            (PackageRange::new(Ident::new("beta"), "latest"), Error::TaskTimeout),
        ]);

        let subjects = sorted_failures(errors).into_iter().map(|(subject, _)| subject).collect::<Vec<_>>();

        assert_eq!(subjects, vec!["@scope/alpha@^2.0.0", "beta@latest", "zeta@1.0.0"]);
    }
}
