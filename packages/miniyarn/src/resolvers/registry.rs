use std::collections::{BTreeMap, BTreeSet};

use futures::future::BoxFuture;
use miniyarn_primitives::{is_semver_reference, is_tag_reference, Ident, PackageLocator, PackageRange, PackageResolution};
use miniyarn_semver::{Range, Version};
use miniyarn_utils::FromFileString;
use serde::Deserialize;

use crate::error::Error;

use super::{ResolveContext, Resolver};

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PackumentVersion {
    #[serde(default)]
    pub dependencies: BTreeMap<Ident, String>,
}

/// The registry metadata document of a package, trimmed down to what the
/// resolution needs.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Packument {
    #[serde(default)]
    pub versions: BTreeMap<String, PackumentVersion>,

    #[serde(default, rename = "dist-tags")]
    pub dist_tags: BTreeMap<String, String>,
}

impl Packument {
    fn parsed_versions(&self) -> BTreeMap<Version, &str> {
        self.versions.keys()
            .filter_map(|key| Version::from_file_string(key).ok().map(|version| (version, key.as_str())))
            .collect()
    }

    /// The highest version matching the range reference (or pointed to by the
    /// tag), along with its registry key.
    fn find_version(&self, reference: &str) -> Option<(Version, &str)> {
        let parsed_versions
            = self.parsed_versions();

        if let Ok(range) = Range::from_file_string(reference) {
            let version
                = range.max_satisfying(parsed_versions.keys())?;

            return parsed_versions.get(version).map(|key| (version.clone(), *key));
        }

        let tagged_version = self.dist_tags.get(reference)
            .and_then(|version| Version::from_file_string(version).ok())?;

        parsed_versions.get(&tagged_version).map(|key| (tagged_version.clone(), *key))
    }
}

/// Resolves semver ranges and dist-tags against the npm registry.
#[derive(Debug, Default)]
pub struct RegistryResolver;

impl RegistryResolver {
    pub fn new() -> RegistryResolver {
        RegistryResolver
    }

    pub async fn fetch_packument(&self, name: &Ident, ctx: &ResolveContext) -> Result<Packument, Error> {
        let url
            = format!("{}/{}", ctx.fetch.env.registry_url, name.registry_path());

        match ctx.fetch.http.get_json::<Packument>(&url).await {
            Err(Error::HttpStatus {status: 404, ..}) => Err(Error::PackageNotFound(name.clone())),
            result => result,
        }
    }
}

impl Resolver for RegistryResolver {
    fn supports(&self, range: &PackageRange, _ctx: &ResolveContext) -> bool {
        is_semver_reference(&range.reference) || is_tag_reference(&range.reference)
    }

    fn is_satisfied(&self, range: &PackageRange, locator: &PackageLocator, _ctx: &ResolveContext) -> Result<bool, Error> {
        // Tags move over time, so they always go through the registry
        let Ok(semver_range) = Range::from_file_string(&range.reference) else {
            return Ok(false);
        };

        let version = locator.reference.as_deref()
            .and_then(|reference| Version::from_file_string(reference).ok());

        Ok(version.is_some_and(|version| semver_range.check(&version)))
    }

    fn get_candidates<'a>(&'a self, range: &'a PackageRange, ctx: &'a ResolveContext) -> BoxFuture<'a, Result<BTreeSet<String>, Error>> {
        Box::pin(async move {
            let packument
                = self.fetch_packument(&range.name, ctx).await?;

            if let Ok(semver_range) = Range::from_file_string(&range.reference) {
                return Ok(packument.parsed_versions().into_iter()
                    .filter(|(version, _)| semver_range.check(version))
                    .map(|(_, key)| key.to_string())
                    .collect());
            }

            Ok(packument.dist_tags.get(&range.reference).cloned().into_iter().collect())
        })
    }

    fn resolve<'a>(&'a self, range: &'a PackageRange, ctx: &'a ResolveContext) -> BoxFuture<'a, Result<PackageResolution, Error>> {
        Box::pin(async move {
            let packument
                = self.fetch_packument(&range.name, ctx).await?;

            let (version, key) = packument.find_version(&range.reference)
                .ok_or_else(|| Error::NoCandidatesFound(range.clone()))?;

            let dependencies = packument.versions.get(key)
                .map(|manifest| manifest.dependencies.clone())
                .unwrap_or_default()
                .into_iter()
                .map(|(name, reference)| (name.clone(), PackageRange::new(name, reference)))
                .collect();

            let locator
                = PackageLocator::new(range.name.clone(), version.to_string());

            Ok(PackageResolution::new(locator).with_dependencies(dependencies))
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::resolvers::tests::resolve_context;

    fn packument() -> Packument {
        serde_json::from_str(r#"{
            "versions": {
                "1.0.0": {},
                "1.1.0": {"dependencies": {"dep": "^2.0.0"}},
                "2.0.0-rc.1": {},
                "2.0.0": {}
            },
            "dist-tags": {"latest": "1.1.0", "next": "2.0.0-rc.1"}
        }"#).unwrap()
    }

    #[rstest]
    #[case("^1.0.0", Some("1.1.0"))]
    #[case("1.0.0", Some("1.0.0"))]
    #[case(">=2.0.0-rc.0", Some("2.0.0"))]
    #[case("latest", Some("1.1.0"))]
    #[case("next", Some("2.0.0-rc.1"))]
    #[case("^3.0.0", None)]
    #[case("unknown-tag", None)]
    fn test_find_version(#[case] reference: &str, #[case] expected: Option<&str>) {
        let packument = packument();

        assert_eq!(packument.find_version(reference).map(|(_, key)| key), expected);
    }

    #[rstest]
    #[case("^1.0.0", "1.4.2", true)]
    #[case("^1.0.0", "2.0.0", false)]
    #[case("latest", "1.0.0", false)]
    #[case("^1.0.0", "https://example.com/pkg.tgz", false)]
    fn test_is_satisfied(#[case] range: &str, #[case] reference: &str, #[case] expected: bool) {
        let ctx = resolve_context();
        let range = PackageRange::new(Ident::new("pkg"), range);
        let locator = PackageLocator::new(Ident::new("pkg"), reference);

        assert_eq!(RegistryResolver::new().is_satisfied(&range, &locator, &ctx).unwrap(), expected);
    }
}
