use futures::future::BoxFuture;
use miniyarn_primitives::{PackageInfo, PackageLocator};
use miniyarn_utils::{FromFileString, Path};

use crate::{archive::{self, Entry, EntryKind}, config::Environment, error::Error, handler::Handler};

use super::{FetchContext, FetchResult, Fetcher};

/// Rewrites the archive returned by its inner fetcher into the normalized
/// layout: contents at the root, bookkeeping files stripped, and an info file
/// describing the package appended.
pub struct ArchiveFetcher {
    inner: Box<dyn Fetcher>,
    virtual_path: Option<String>,
}

impl ArchiveFetcher {
    pub fn new<F: Fetcher + 'static>(inner: F) -> ArchiveFetcher {
        ArchiveFetcher {inner: Box::new(inner), virtual_path: None}
    }

    pub fn with_virtual_path(self, virtual_path: impl Into<String>) -> ArchiveFetcher {
        ArchiveFetcher {virtual_path: Some(virtual_path.into()), ..self}
    }
}

fn normalize_archive(bytes: &[u8], virtual_path: Option<&str>, env: &Environment, locator: &PackageLocator, base_info: PackageInfo) -> Result<(PackageInfo, Vec<u8>), Error> {
    let mut entries = archive::read_entries(bytes, virtual_path)?;

    entries.retain(|entry| {
        Path::from_file_string(&entry.name).map_or(true, |path| !env.is_bookkeeping_file(&path))
    });

    let manifest = entries.iter()
        .find(|entry| entry.name == "package.json" && entry.kind == EntryKind::File);

    let package_info = match manifest {
        Some(manifest) => PackageInfo::from_manifest_str(&String::from_utf8_lossy(&manifest.data))?,
        None => base_info,
    }.with_locator(locator);

    entries.push(Entry::file(env.info_filename.clone(), package_info.to_json_string()));

    Ok((package_info, archive::write_tgz(&entries)?))
}

impl Fetcher for ArchiveFetcher {
    fn supports(&self, locator: &PackageLocator, ctx: &FetchContext) -> bool {
        self.inner.supports(locator, ctx)
    }

    fn fetch<'a>(&'a self, locator: &'a PackageLocator, ctx: &'a FetchContext) -> BoxFuture<'a, Result<FetchResult, Error>> {
        Box::pin(async move {
            let FetchResult {package_info, handler}
                = self.inner.fetch(locator, ctx).await?;

            let source_path = handler.path().clone();
            let virtual_path = self.virtual_path.clone();
            let env = ctx.env.clone();
            let owned_locator = locator.clone();

            let (package_info, normalized) = tokio::task::spawn_blocking(move || {
                let bytes = source_path.fs_read()?;
                normalize_archive(&bytes, virtual_path.as_deref(), &env, &owned_locator, package_info)
            }).await??;

            drop(handler);

            let scratch
                = Handler::scratch()?;
            let archive_path
                = scratch.path().with_join_str(&ctx.env.archive_filename);

            archive_path.fs_write(&normalized)?;

            Ok(FetchResult::new(package_info, scratch.with_path(archive_path)))
        })
    }
}

#[cfg(test)]
mod tests {
    use miniyarn_primitives::Ident;

    use super::*;

    #[test]
    fn test_normalize_archive() {
        let env = Environment::default();

        let source = archive::write_tgz(&[
            Entry::file("package/package.json", r#"{"name": "upstream-name", "version": "1.0.0", "dependencies": {"dep": "^1.0.0"}}"#),
            Entry::file("package/index.js", "module.exports = 42;"),
            Entry::file("package/.yarn-atomic", "stale"),
        ]).unwrap();

        let locator = PackageLocator::new(Ident::new("alias"), "1.0.0");
        let (package_info, normalized) = normalize_archive(&source, Some("package"), &env, &locator, PackageInfo::from_locator(&locator)).unwrap();

        assert_eq!(package_info.name, Some(Ident::new("alias")));
        assert_eq!(package_info.dependencies.get(&Ident::new("dep")).map(String::as_str), Some("^1.0.0"));

        let names = archive::read_entries(&normalized, None).unwrap().into_iter().map(|entry| entry.name).collect::<Vec<_>>();
        assert_eq!(names, vec![".yarn-info.json", "index.js", "package.json"]);

        let info_file = archive::read_file(&normalized, ".yarn-info.json").unwrap().unwrap();
        assert_eq!(serde_json::from_slice::<PackageInfo>(&info_file).unwrap(), package_info);
    }

    #[test]
    fn test_normalize_archive_without_manifest() {
        let env = Environment::default();
        let source = archive::write_tgz(&[Entry::file("index.js", "")]).unwrap();

        let locator = PackageLocator::new(Ident::new("bare"), "https://example.com/bare.tgz");
        let (package_info, _) = normalize_archive(&source, None, &env, &locator, PackageInfo::from_locator(&locator)).unwrap();

        assert_eq!(package_info, PackageInfo::from_locator(&locator));
    }
}
