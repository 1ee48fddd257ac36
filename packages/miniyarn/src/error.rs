use std::{future::Future, sync::Arc};

use miniyarn_primitives::{Ident, PackageLocator, PackageRange};
use miniyarn_utils::{render_backtrace, DataType, ToHumanString};
use tokio::task::JoinError;

fn render_failures(failures: &[(String, Error)]) -> String {
    failures.iter()
        .map(|(subject, error)| format!("\n  {}: {}", DataType::Code.colorize(subject), error))
        .collect()
}

fn render_script_failure(code: &Option<i32>, stderr: &str) -> String {
    let status = match code {
        Some(code) => format!("exit code {}", code),
        None => "a signal".to_string(),
    };

    match stderr.trim_end() {
        "" => status,
        stderr => format!("{}\n\n{}", status, stderr),
    }
}

pub async fn set_timeout<F: Future>(timeout: std::time::Duration, f: F) -> Result<F::Output, Error> {
    let res = tokio::time::timeout(timeout, f).await
        .map_err(|_| Error::TaskTimeout)?;

    Ok(res)
}

#[derive(thiserror::Error, Clone, Debug)]
pub enum Error {
    #[error("Invalid configuration value for {0}: {1}")]
    ConfigurationError(String, String),

    #[error("Network error: {}{}", .0, .1.as_deref().map(|s| format!(" ({})", s)).unwrap_or_default())]
    HttpError(Arc<reqwest::Error>, Option<String>),

    #[error("Unexpected HTTP status {status} when fetching {url}")]
    HttpStatus {
        url: String,
        status: u16,
    },

    #[error("Invalid URL ({0})")]
    InvalidUrl(String),

    #[error("Network access is disabled; cannot fetch {0}")]
    NetworkDisabledError(String),

    #[error("Unsafe http requests must be explicitly whitelisted in your configuration ({})", .0.host_str().unwrap_or_default())]
    UnsafeHttpError(url::Url),

    #[error(transparent)]
    PathError(#[from] miniyarn_utils::PathError),

    #[error("I/O error ({inner})\n\n{}", render_backtrace(backtrace))]
    IoError {
        inner: Arc<std::io::Error>,
        backtrace: Arc<std::backtrace::Backtrace>,
    },

    #[error("Internal error: Join failed ({0})")]
    JoinFailed(#[from] Arc<JoinError>),

    #[error("Invalid JSON data ({0})")]
    JsonError(#[from] Arc<serde_json::Error>),

    #[error(transparent)]
    PrimitivesError(#[from] miniyarn_primitives::Error),

    #[error(transparent)]
    SemverError(#[from] miniyarn_semver::Error),

    #[error(transparent)]
    GlobError(#[from] miniyarn_utils::GlobError),

    #[error("The operation timed out")]
    TaskTimeout,

    #[error("No resolver found for {}", .0.to_print_string())]
    NoResolverFound(PackageRange),

    #[error("Multiple resolvers claimed {}", .0.to_print_string())]
    AmbiguousResolver(PackageRange),

    #[error("No fetcher found for {}", .0.to_print_string())]
    NoFetcherFound(PackageLocator),

    #[error("Multiple fetchers claimed {}", .0.to_print_string())]
    AmbiguousFetcher(PackageLocator),

    #[error("No linker found for {}", .0.to_print_string())]
    NoLinkerFound(PackageLocator),

    #[error("Multiple linkers claimed {}", .0.to_print_string())]
    AmbiguousLinker(PackageLocator),

    #[error("The transformed reference isn't supported by the underlying implementation ({})", DataType::Reference.colorize(.0))]
    TransformUnsupported(String),

    #[error("Package not found in the registry ({})", .0.to_print_string())]
    PackageNotFound(Ident),

    #[error("No candidates found for {}", .0.to_print_string())]
    NoCandidatesFound(PackageRange),

    #[error("Invalid archive ({0})")]
    InvalidArchive(String),

    #[error("Archive entry escapes its destination ({0})")]
    UnsafeArchivePath(String),

    #[error("Expected a {expected} at {}", DataType::Path.colorize(.path))]
    UnexpectedEntryType {
        path: String,
        expected: &'static str,
    },

    #[error("Cannot resolve the relative path {} without a base directory", DataType::Path.colorize(.0))]
    RelativePathWithoutBase(String),

    #[error("Git command failed ({command}): {message}")]
    GitError {
        command: String,
        message: String,
    },

    #[error("Git reference not found ({})", DataType::Reference.colorize(.0))]
    GitReferenceNotFound(String),

    #[error("The {script_name} script of {locator} failed with {}", render_script_failure(.code, .stderr))]
    LifecycleScriptFailed {
        locator: String,
        script_name: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Missing package information for {}", .0.to_print_string())]
    MissingPackageInfo(PackageLocator),

    #[error("Missing package handler for {}", .0.to_print_string())]
    MissingHandler(PackageLocator),

    #[error("Missing package name ({})", .0.to_print_string())]
    MissingPackageName(PackageLocator),

    #[error("No package.json found in {} or any of its parents", DataType::Path.colorize(.0))]
    ManifestNotFound(String),

    #[error("Invalid lockfile ({0})")]
    InvalidLockfile(String),

    #[error("Resolution failed:{}", render_failures(.0))]
    ResolutionFailed(Vec<(String, Error)>),

    #[error("Fetch failed:{}", render_failures(.0))]
    FetchFailed(Vec<(String, Error)>),
}

impl From<JoinError> for Error {
    fn from(error: JoinError) -> Self {
        Arc::new(error).into()
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::IoError {
            inner: Arc::new(error),
            backtrace: Arc::new(std::backtrace::Backtrace::capture()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Arc::new(error).into()
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        Error::HttpError(Arc::new(error), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_error() -> reqwest::Error {
        reqwest::Client::new().get("not a url").build().unwrap_err()
    }

    #[test]
    fn test_http_error_message() {
        let without_url = Error::from(request_error()).to_string();
        assert!(without_url.starts_with("Network error: "));

        let with_url = Error::HttpError(Arc::new(request_error()), Some("https://example.com/pkg".to_string())).to_string();
        assert!(with_url.starts_with("Network error: "));
        assert!(with_url.ends_with(" (https://example.com/pkg)"));
    }
}
