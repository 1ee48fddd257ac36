use futures::future::BoxFuture;
use miniyarn_primitives::{is_http_reference, PackageInfo, PackageLocator};
use miniyarn_utils::Glob;

use crate::{error::Error, handler::Handler};

use super::{FetchContext, FetchResult, Fetcher};

/// Downloads remote archives into a scratch file.
#[derive(Debug, Default)]
pub struct HttpFetcher {
    pattern: Option<Glob>,
}

impl HttpFetcher {
    pub fn new() -> HttpFetcher {
        HttpFetcher::default()
    }

    /// Only accepts urls whose path matches the pattern.
    pub fn with_pattern(self, pattern: Glob) -> HttpFetcher {
        HttpFetcher {pattern: Some(pattern)}
    }
}

impl Fetcher for HttpFetcher {
    fn supports(&self, locator: &PackageLocator, _ctx: &FetchContext) -> bool {
        let Some(reference) = locator.reference.as_deref() else {
            return false;
        };

        if !is_http_reference(reference) {
            return false;
        }

        match &self.pattern {
            Some(pattern) => url::Url::parse(reference).is_ok_and(|url| pattern.is_match_base(url.path())),
            None => true,
        }
    }

    fn fetch<'a>(&'a self, locator: &'a PackageLocator, ctx: &'a FetchContext) -> BoxFuture<'a, Result<FetchResult, Error>> {
        Box::pin(async move {
            let reference = locator.reference.as_deref()
                .ok_or_else(|| Error::NoFetcherFound(locator.clone()))?;

            let bytes
                = ctx.http.get_bytes(reference).await?;

            let scratch
                = Handler::scratch()?;
            let archive_path
                = scratch.path().with_join_str("archive.tgz");

            archive_path.fs_write(&bytes)?;

            Ok(FetchResult::new(PackageInfo::from_locator(locator), scratch.with_path(archive_path)))
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use miniyarn_primitives::Ident;

    use super::*;
    use crate::fetchers::tests::fetch_context;

    #[rstest]
    #[case("https://example.com/pkg-1.0.0.tgz", true)]
    #[case("https://example.com/pkg-1.0.0.tar.gz?token=1", true)]
    #[case("https://example.com/pkg.zip", false)]
    #[case("https://example.com/repo.git", false)]
    #[case("./pkg-1.0.0.tgz", false)]
    fn test_supports(#[case] reference: &str, #[case] expected: bool) {
        let fetcher = HttpFetcher::new().with_pattern(Glob::parse("*.{tar.gz,tgz}").unwrap());
        let locator = PackageLocator::new(Ident::new("pkg"), reference);

        assert_eq!(fetcher.supports(&locator, &fetch_context()), expected);
    }
}
