pub mod algos;
pub mod archive;
pub mod build;
pub mod chains;
pub mod config;
pub mod error;
pub mod fetchers;
pub mod git;
pub mod handler;
pub mod http;
pub mod install;
pub mod limit;
pub mod linkers;
pub mod lockfile;
pub mod pack;
pub mod progress;
pub mod project;
pub mod report;
pub mod resolvers;
pub mod script;

pub use config::Environment;
pub use error::Error;
pub use install::{install, lock, resolve, InstallContext, InstallOptions, InstallSummary};
pub use pack::pack;
pub use project::Project;
pub use report::TreeFormat;
