mod error;
mod ident;
mod locator;
mod node;
mod package_info;
mod range;
mod reference;
mod resolution;

pub use error::Error;
pub use ident::{parse_identifier, Ident};
pub use locator::PackageLocator;
pub use node::PackageNode;
pub use package_info::{BinField, DependencyKind, PackageInfo};
pub use range::PackageRange;
pub use reference::{
    is_git_reference,
    is_github_reference,
    is_http_reference,
    is_path_reference,
    is_semver_reference,
    is_tag_reference,
    split_git_reference,
    strip_path_protocol,
};
pub use resolution::PackageResolution;
