mod fetch_all;
mod resolve_tree;
mod traverse;

pub use fetch_all::{fetch_all_packages, FetchOutcome};
pub use resolve_tree::{resolve_package_tree, ResolutionOutcome, ResolveOptions};
pub use traverse::{get_package_tree_locators, traverse_package_tree};
