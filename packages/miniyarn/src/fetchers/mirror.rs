use futures::future::BoxFuture;
use miniyarn_primitives::{PackageInfo, PackageLocator};
use miniyarn_utils::{FromFileString, Path};

use crate::{archive, config::Environment, error::Error, handler::Handler};

use super::{FetchContext, FetchResult, Fetcher};

/// Where the normalized archive of a locator is mirrored, if mirroring is
/// enabled. The extension is the one of the archive filename.
pub fn mirror_path(locator: &PackageLocator, env: &Environment) -> Option<Path> {
    let mirror_path = env.mirror_path.as_ref()?;
    let name = locator.name.as_ref()?;
    let slug = locator.slug()?;

    let extension = Path::from_file_string(&env.archive_filename).ok()
        .and_then(|path| path.extname().map(str::to_string))
        .unwrap_or_else(|| ".tgz".to_string());

    Some(mirror_path.with_join_str(name.slug()).with_join_str(format!("{}{}", slug, extension)))
}

/// Copies the archive found next to the unpacked package into the mirror
/// directory, unless it's already there.
pub struct MirrorSaveFetcher {
    inner: Box<dyn Fetcher>,
}

impl MirrorSaveFetcher {
    pub fn new<F: Fetcher + 'static>(inner: F) -> MirrorSaveFetcher {
        MirrorSaveFetcher {inner: Box::new(inner)}
    }
}

impl Fetcher for MirrorSaveFetcher {
    fn supports(&self, locator: &PackageLocator, ctx: &FetchContext) -> bool {
        self.inner.supports(locator, ctx)
    }

    fn fetch<'a>(&'a self, locator: &'a PackageLocator, ctx: &'a FetchContext) -> BoxFuture<'a, Result<FetchResult, Error>> {
        Box::pin(async move {
            let result
                = self.inner.fetch(locator, ctx).await?;

            if let Some(mirror_path) = mirror_path(locator, &ctx.env) {
                let archive_path
                    = ctx.env.archive_path(result.handler.path());

                if !mirror_path.fs_exists() && archive_path.fs_is_file() {
                    let temp_path
                        = mirror_path.with_join_str(format!("../.{}.tmp", mirror_path.basename().unwrap_or("archive")));

                    mirror_path.fs_create_parent()?;
                    archive_path.fs_copy_file(&temp_path)?;
                    temp_path.fs_rename(&mirror_path)?;

                    log::debug!("Mirrored {} into {}", locator, mirror_path);
                }
            }

            Ok(result)
        })
    }
}

/// Serves archives straight from the mirror directory when they're present,
/// and defers to its inner fetcher otherwise.
pub struct MirrorLoadFetcher {
    inner: Box<dyn Fetcher>,
}

impl MirrorLoadFetcher {
    pub fn new<F: Fetcher + 'static>(inner: F) -> MirrorLoadFetcher {
        MirrorLoadFetcher {inner: Box::new(inner)}
    }
}

impl Fetcher for MirrorLoadFetcher {
    fn supports(&self, locator: &PackageLocator, ctx: &FetchContext) -> bool {
        self.inner.supports(locator, ctx)
    }

    fn fetch<'a>(&'a self, locator: &'a PackageLocator, ctx: &'a FetchContext) -> BoxFuture<'a, Result<FetchResult, Error>> {
        Box::pin(async move {
            let Some(mirror_path) = mirror_path(locator, &ctx.env).filter(|path| path.fs_is_file()) else {
                return self.inner.fetch(locator, ctx).await;
            };

            log::debug!("Loading {} from the mirror", locator);

            let bytes
                = mirror_path.fs_read()?;

            let package_info = archive::read_file(&bytes, &ctx.env.info_filename).ok()
                .flatten()
                .and_then(|info| serde_json::from_slice::<PackageInfo>(&info).ok());

            let Some(package_info) = package_info else {
                // Removed so that the fresh archive takes its place once saved
                log::warn!("The mirrored archive of {} is corrupted; fetching it again", locator);
                mirror_path.fs_rm_if_exists()?;

                return self.inner.fetch(locator, ctx).await;
            };

            Ok(FetchResult::new(package_info.with_locator(locator), Handler::new(mirror_path)))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use miniyarn_primitives::Ident;
    use rstest::rstest;

    use super::*;
    use crate::{archive::Entry, fetchers::tests::fetch_context, http::HttpClient};

    struct ArchiveDirFetcher;

    impl Fetcher for ArchiveDirFetcher {
        fn supports(&self, _locator: &PackageLocator, _ctx: &FetchContext) -> bool {
            true
        }

        fn fetch<'a>(&'a self, locator: &'a PackageLocator, ctx: &'a FetchContext) -> BoxFuture<'a, Result<FetchResult, Error>> {
            Box::pin(async move {
                let package_info = PackageInfo::from_locator(locator);

                let archive = archive::write_tgz(&[
                    Entry::file("index.js", ""),
                    Entry::file(ctx.env.info_filename.clone(), package_info.to_json_string()),
                ])?;

                let dir = Path::temp_dir()?;
                ctx.env.archive_path(&dir).fs_write(archive)?;

                Ok(FetchResult::new(package_info, Handler::temporary(dir)))
            })
        }
    }

    struct FailingFetcher;

    impl Fetcher for FailingFetcher {
        fn supports(&self, _locator: &PackageLocator, _ctx: &FetchContext) -> bool {
            true
        }

        fn fetch<'a>(&'a self, locator: &'a PackageLocator, _ctx: &'a FetchContext) -> BoxFuture<'a, Result<FetchResult, Error>> {
            Box::pin(async move {
                Err(Error::NoFetcherFound(locator.clone()))
            })
        }
    }

    #[tokio::test]
    async fn test_mirror_save_then_load() {
        let base = fetch_context();
        let env = Arc::new((*base.env).clone().with_mirror_path(Some(Path::temp_dir().unwrap())));
        let ctx = FetchContext::new(env.clone(), HttpClient::new(&env).unwrap());

        let locator = PackageLocator::new(Ident::new("@scope/pkg"), "1.0.0");

        MirrorSaveFetcher::new(ArchiveDirFetcher).fetch(&locator, &ctx).await.unwrap();

        let saved = mirror_path(&locator, &env).unwrap();
        assert!(saved.fs_is_file());
        assert_eq!(saved.extname(), Some(".tgz"));

        let loaded = MirrorLoadFetcher::new(FailingFetcher).fetch(&locator, &ctx).await.unwrap();

        assert_eq!(loaded.handler.path(), &saved);
        assert_eq!(loaded.package_info, PackageInfo::from_locator(&locator));
    }

    #[rstest]
    #[case(archive::write_tgz(&[Entry::file("index.js", "")]).unwrap())]
    #[case(archive::write_tgz(&[Entry::file(".yarn-info.json", "not json")]).unwrap())]
    #[case(b"truncated".to_vec())]
    #[tokio::test]
    async fn test_corrupted_mirror_is_refetched(#[case] archive: Vec<u8>) {
        let base = fetch_context();
        let env = Arc::new((*base.env).clone().with_mirror_path(Some(Path::temp_dir().unwrap())));
        let ctx = FetchContext::new(env.clone(), HttpClient::new(&env).unwrap());

        let locator = PackageLocator::new(Ident::new("pkg"), "1.0.0");

        let saved = mirror_path(&locator, &env).unwrap();
        saved.fs_create_parent().unwrap();
        saved.fs_write(&archive).unwrap();

        let result = MirrorLoadFetcher::new(FailingFetcher).fetch(&locator, &ctx).await;
        assert!(matches!(result, Err(Error::NoFetcherFound(_))));
        assert!(!saved.fs_exists());

        let result = MirrorSaveFetcher::new(MirrorLoadFetcher::new(ArchiveDirFetcher)).fetch(&locator, &ctx).await.unwrap();
        assert_eq!(result.package_info, PackageInfo::from_locator(&locator));
        assert!(saved.fs_is_file());
    }

    #[tokio::test]
    async fn test_mirror_load_falls_through() {
        let base = fetch_context();
        let env = Arc::new((*base.env).clone().with_mirror_path(Some(Path::temp_dir().unwrap())));
        let ctx = FetchContext::new(env.clone(), HttpClient::new(&env).unwrap());

        let locator = PackageLocator::new(Ident::new("pkg"), "1.0.0");
        let result = MirrorLoadFetcher::new(FailingFetcher).fetch(&locator, &ctx).await;

        assert!(matches!(result, Err(Error::NoFetcherFound(_))));
    }
}
