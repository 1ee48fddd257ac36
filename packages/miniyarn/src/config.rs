use std::{collections::BTreeMap, time::Duration};

use convert_case::{Case, Casing};
use miniyarn_utils::{FromFileString, Glob, OkMissing, Path};

use crate::error::Error;

pub const DEFAULT_REGISTRY_URL: &str = "https://registry.yarnpkg.com";
pub const DEFAULT_RC_FILENAME: &str = ".yarnrc.yml";

const ENV_PREFIX: &str = "YARN_";

/// Settings shared by every stage of an install. Built once, then only
/// derived through the `with_*` methods.
#[derive(Clone, Debug)]
pub struct Environment {
    pub registry_url: String,
    pub cache_path: Option<Path>,
    pub mirror_path: Option<Path>,
    pub fetch_timeout: Duration,

    pub atomic_filename: String,
    pub archive_filename: String,
    pub info_filename: String,

    pub enable_network: bool,
    pub relative_dependencies_path: Option<Path>,

    pub network_concurrency: usize,
    pub link_concurrency: usize,

    pub http_retry: usize,
    pub unsafe_http_whitelist: Vec<Glob>,
}

impl Default for Environment {
    fn default() -> Self {
        let cache_path = Path::home_dir()
            .ok()
            .flatten()
            .map(|home| home.with_join_str(".cache/miniyarn"));

        let unsafe_http_whitelist = ["localhost", "127.0.0.1"].iter()
            .filter_map(|host| Glob::parse(*host).ok())
            .collect();

        Environment {
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            cache_path,
            mirror_path: None,
            fetch_timeout: Duration::from_millis(30_000),

            atomic_filename: ".yarn-atomic".to_string(),
            archive_filename: ".yarn-archive.tgz".to_string(),
            info_filename: ".yarn-info.json".to_string(),

            enable_network: true,
            relative_dependencies_path: None,

            network_concurrency: 5,
            link_concurrency: 5,

            http_retry: 3,
            unsafe_http_whitelist,
        }
    }
}

fn yaml_to_setting(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Sequence(items) => Some(items.iter().filter_map(yaml_to_setting).collect::<Vec<_>>().join(",")),
        _ => None,
    }
}

fn parse_setting<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, Error> {
    value.trim().parse::<T>()
        .map_err(|_| Error::ConfigurationError(key.to_string(), value.to_string()))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, Error> {
    match value.trim() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(Error::ConfigurationError(key.to_string(), value.to_string())),
    }
}

fn parse_optional_path(key: &str, value: &str, base: &Path) -> Result<Option<Path>, Error> {
    if value.trim().is_empty() {
        return Ok(None);
    }

    let path = Path::from_file_string(value.trim())
        .map_err(|err| Error::ConfigurationError(key.to_string(), err.to_string()))?;

    Ok(Some(path.resolve_from(base)))
}

impl Environment {
    /// Defaults merged with every rc file between the filesystem root and
    /// `cwd`, then with the `YARN_*` variables of the current process.
    pub fn load(cwd: &Path) -> Result<Environment, Error> {
        Environment::load_from(cwd, std::env::vars())
    }

    pub fn load_from<I>(cwd: &Path, env_vars: I) -> Result<Environment, Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let env_vars: BTreeMap<String, String>
            = env_vars.into_iter()
                .filter(|(key, _)| key.starts_with(ENV_PREFIX))
                .collect();

        let rc_filename = env_vars.get("YARN_RC_FILENAME")
            .cloned()
            .unwrap_or_else(|| DEFAULT_RC_FILENAME.to_string());

        let mut env = Environment::default()
            .with_relative_dependencies_path(Some(cwd.clone()));

        let mut rc_dirs = vec![];
        let mut next = Some(cwd.clone());

        while let Some(dir) = next {
            next = dir.dirname();
            rc_dirs.push(dir);
        }

        for rc_dir in rc_dirs.iter().rev() {
            let rc_path
                = rc_dir.with_join_str(&rc_filename);

            let Some(rc_text) = rc_path.fs_read_text().ok_missing()? else {
                continue;
            };

            let settings = match serde_yaml::from_str::<BTreeMap<String, serde_yaml::Value>>(&rc_text) {
                Ok(settings) => settings,
                Err(err) => {
                    log::warn!("Ignoring unparsable configuration file {}: {}", rc_path, err);
                    continue;
                },
            };

            log::debug!("Loading configuration from {}", rc_path);

            for (key, value) in settings {
                if let Some(value) = yaml_to_setting(&value) {
                    env.apply(&key.to_case(Case::Snake), &value, rc_dir)?;
                }
            }
        }

        for (key, value) in &env_vars {
            if key == "YARN_RC_FILENAME" {
                continue;
            }

            let setting_name
                = (&key[ENV_PREFIX.len()..]).to_case(Case::Snake);

            env.apply(&setting_name, value, cwd)?;
        }

        Ok(env)
    }

    fn apply(&mut self, key: &str, value: &str, base: &Path) -> Result<(), Error> {
        match key {
            "registry_url" => self.registry_url = value.trim().trim_end_matches('/').to_string(),
            "cache_path" => self.cache_path = parse_optional_path(key, value, base)?,
            "mirror_path" => self.mirror_path = parse_optional_path(key, value, base)?,
            "fetch_timeout" => self.fetch_timeout = Duration::from_millis(parse_setting(key, value)?),
            "atomic_filename" => self.atomic_filename = value.to_string(),
            "archive_filename" => self.archive_filename = value.to_string(),
            "info_filename" => self.info_filename = value.to_string(),
            "enable_network" => self.enable_network = parse_bool(key, value)?,
            "relative_dependencies_path" => self.relative_dependencies_path = parse_optional_path(key, value, base)?,
            "network_concurrency" => self.network_concurrency = parse_setting::<usize>(key, value)?.max(1),
            "link_concurrency" => self.link_concurrency = parse_setting::<usize>(key, value)?.max(1),
            "http_retry" => self.http_retry = parse_setting(key, value)?,

            "unsafe_http_whitelist" => {
                self.unsafe_http_whitelist = value.split(',')
                    .map(|pattern| pattern.trim())
                    .filter(|pattern| !pattern.is_empty())
                    .map(Glob::parse)
                    .collect::<Result<Vec<_>, _>>()?;
            },

            _ => log::debug!("Ignoring unknown configuration key {}", key),
        }

        Ok(())
    }

    pub fn with_registry_url(self, registry_url: impl Into<String>) -> Self {
        Environment {registry_url: registry_url.into().trim_end_matches('/').to_string(), ..self}
    }

    pub fn with_cache_path(self, cache_path: Option<Path>) -> Self {
        Environment {cache_path, ..self}
    }

    pub fn with_mirror_path(self, mirror_path: Option<Path>) -> Self {
        Environment {mirror_path, ..self}
    }

    pub fn with_fetch_timeout(self, fetch_timeout: Duration) -> Self {
        Environment {fetch_timeout, ..self}
    }

    pub fn with_enable_network(self, enable_network: bool) -> Self {
        Environment {enable_network, ..self}
    }

    pub fn with_relative_dependencies_path(self, relative_dependencies_path: Option<Path>) -> Self {
        Environment {relative_dependencies_path, ..self}
    }

    pub fn with_network_concurrency(self, network_concurrency: usize) -> Self {
        Environment {network_concurrency: network_concurrency.max(1), ..self}
    }

    pub fn with_link_concurrency(self, link_concurrency: usize) -> Self {
        Environment {link_concurrency: link_concurrency.max(1), ..self}
    }

    pub fn with_http_retry(self, http_retry: usize) -> Self {
        Environment {http_retry, ..self}
    }

    pub fn with_unsafe_http_whitelist(self, unsafe_http_whitelist: Vec<Glob>) -> Self {
        Environment {unsafe_http_whitelist, ..self}
    }

    pub fn atomic_path(&self, package_path: &Path) -> Path {
        package_path.with_join_str(&self.atomic_filename)
    }

    pub fn archive_path(&self, package_path: &Path) -> Path {
        package_path.with_join_str(&self.archive_filename)
    }

    pub fn info_path(&self, package_path: &Path) -> Path {
        package_path.with_join_str(&self.info_filename)
    }

    /// Whether a path relative to a package root is one of the bookkeeping
    /// files the engine writes next to package contents.
    pub fn is_bookkeeping_file(&self, relative_path: &Path) -> bool {
        let relative_path
            = relative_path.as_str();

        relative_path == self.atomic_filename
            || relative_path == self.archive_filename
            || relative_path == self.info_filename
    }
}
