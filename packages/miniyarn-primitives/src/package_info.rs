use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Deserializer, Serialize};

use crate::{Error, Ident, PackageLocator, PackageRange};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DependencyKind {
    Regular,
    Dev,
    Peer,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BinField {
    Single(String),
    Map(BTreeMap<String, String>),
}

fn deserialize_bundled<'de, D>(deserializer: D) -> Result<BTreeSet<Ident>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    #[allow(dead_code)]
    enum RawBundled {
        All(bool),
        List(BTreeSet<Ident>),
    }

    // `true` (bundle everything) isn't supported and bundles nothing
    match Option::<RawBundled>::deserialize(deserializer)? {
        Some(RawBundled::List(list)) => Ok(list),
        _ => Ok(BTreeSet::new()),
    }
}

/// Package metadata as read from a manifest, plus the reference it was
/// fetched from. Serialized as-is into the info file shipped with every
/// fetched package.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Ident>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bin: Option<BinField>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub scripts: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<Ident, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dev_dependencies: BTreeMap<Ident, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub peer_dependencies: BTreeMap<Ident, String>,

    #[serde(default, alias = "bundleDependencies", deserialize_with = "deserialize_bundled", skip_serializing_if = "BTreeSet::is_empty")]
    pub bundled_dependencies: BTreeSet<Ident>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
}

pub const LIFECYCLE_SCRIPTS: [&str; 3] = ["preinstall", "install", "postinstall"];

impl PackageInfo {
    pub fn from_manifest_str(manifest: &str) -> Result<PackageInfo, Error> {
        serde_json::from_str(manifest)
            .map_err(|err| Error::InvalidManifest(err.to_string()))
    }

    pub fn from_locator(locator: &PackageLocator) -> PackageInfo {
        PackageInfo::default().with_locator(locator)
    }

    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Overlays the locator onto the metadata; the locator wins for both the
    /// name and the reference.
    pub fn with_locator(self, locator: &PackageLocator) -> PackageInfo {
        PackageInfo {
            name: locator.name.clone().or(self.name),
            reference: locator.reference.clone(),
            ..self
        }
    }

    pub fn locator(&self) -> PackageLocator {
        PackageLocator {name: self.name.clone(), reference: self.reference.clone()}
    }

    pub fn dependencies_of_kind(&self, kind: DependencyKind) -> &BTreeMap<Ident, String> {
        match kind {
            DependencyKind::Regular => &self.dependencies,
            DependencyKind::Dev => &self.dev_dependencies,
            DependencyKind::Peer => &self.peer_dependencies,
        }
    }

    /// Merges the dependency maps of the given kinds. Kinds are applied from
    /// lowest to highest precedence (peer, dev, regular) so a name declared
    /// in several maps ends up with its regular range.
    pub fn dependency_ranges(&self, kinds: &[DependencyKind]) -> BTreeMap<Ident, PackageRange> {
        let mut ordered_kinds
            = kinds.to_vec();

        ordered_kinds.sort_by_key(|kind| std::cmp::Reverse(*kind));
        ordered_kinds.dedup();

        let mut ranges
            = BTreeMap::new();

        for kind in ordered_kinds {
            for (name, reference) in self.dependencies_of_kind(kind) {
                ranges.insert(name.clone(), PackageRange::new(name.clone(), reference.clone()));
            }
        }

        ranges
    }

    /// Binary names mapped to paths relative to the package root. A string
    /// `bin` field is named after the package (without its scope).
    pub fn bin_entries(&self) -> BTreeMap<String, String> {
        match &self.bin {
            Some(BinField::Map(map)) => map.clone(),
            Some(BinField::Single(path)) => match &self.name {
                Some(name) => BTreeMap::from([(name.name().to_string(), path.clone())]),
                None => BTreeMap::new(),
            },
            None => BTreeMap::new(),
        }
    }

    pub fn has_lifecycle_scripts(&self) -> bool {
        LIFECYCLE_SCRIPTS.iter().any(|name| self.scripts.contains_key(*name))
    }

    pub fn lifecycle_scripts(&self) -> Vec<(String, String)> {
        LIFECYCLE_SCRIPTS.iter()
            .filter_map(|name| self.scripts.get(*name).map(|script| (name.to_string(), script.clone())))
            .collect()
    }
}
