#![allow(dead_code)]

use std::{collections::BTreeMap, convert::Infallible, io::Write, net::SocketAddr, sync::{Arc, Mutex}};

use flate2::{write::GzEncoder, Compression};
use http_body_util::Full;
use hyper::{body::Bytes, server::conn::http1, service::service_fn, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use miniyarn::{Environment, InstallContext, Project};
use miniyarn_utils::Path;
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// Builds a gzipped tarball holding the given files below `package/`, the
/// way registries lay them out.
pub fn make_tarball(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder
        = tar::Builder::new(GzEncoder::new(vec![], Compression::default()));

    for (name, content) in files {
        let mut header
            = tar::Header::new_gnu();

        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(0);
        header.set_entry_type(tar::EntryType::Regular);

        builder.append_data(&mut header, format!("package/{}", name), *content).unwrap();
    }

    let mut encoder = builder.into_inner().unwrap();
    encoder.flush().unwrap();
    encoder.finish().unwrap()
}

/// Same as `make_tarball`, with a generated `package.json`.
pub fn make_package_tarball(manifest: &Value, files: &[(&str, &str)]) -> Vec<u8> {
    let manifest_text
        = serde_json::to_string_pretty(manifest).unwrap();

    let mut entries: Vec<(&str, &[u8])>
        = vec![("package.json", manifest_text.as_bytes())];

    for (name, content) in files {
        entries.push((*name, content.as_bytes()));
    }

    make_tarball(&entries)
}

struct MockVersion {
    manifest: Value,
    tarball: Vec<u8>,
}

#[derive(Default)]
pub struct MockRegistry {
    packages: BTreeMap<String, BTreeMap<String, MockVersion>>,
    archives: BTreeMap<String, Vec<u8>>,
}

impl MockRegistry {
    pub fn new() -> MockRegistry {
        MockRegistry::default()
    }

    /// Publishes a version. `extra` is merged into the generated manifest
    /// (dependencies, scripts, bin, ...).
    pub fn with_package(mut self, name: &str, version: &str, extra: Value, files: &[(&str, &str)]) -> MockRegistry {
        let mut manifest
            = json!({"name": name, "version": version});

        if let (Value::Object(manifest), Value::Object(extra)) = (&mut manifest, extra) {
            manifest.extend(extra);
        }

        let tarball
            = make_package_tarball(&manifest, files);

        self.packages.entry(name.to_string())
            .or_default()
            .insert(version.to_string(), MockVersion {manifest, tarball});

        self
    }

    /// Serves an arbitrary archive at `/archives/<file_name>`.
    pub fn with_archive(mut self, file_name: &str, archive: Vec<u8>) -> MockRegistry {
        self.archives.insert(file_name.to_string(), archive);
        self
    }

    fn packument(&self, name: &str) -> Option<Value> {
        let versions
            = self.packages.get(name)?;

        let latest = versions.keys()
            .last()
            .cloned()
            .unwrap_or_default();

        let manifests = versions.iter()
            .map(|(version, entry)| (version.clone(), entry.manifest.clone()))
            .collect::<serde_json::Map<_, _>>();

        Some(json!({
            "name": name,
            "versions": manifests,
            "dist-tags": {"latest": latest},
        }))
    }

    fn respond(&self, path: &str) -> Option<Vec<u8>> {
        if let Some(file_name) = path.strip_prefix("/archives/") {
            return self.archives.get(file_name).cloned();
        }

        if let Some((name, file_name)) = path.trim_start_matches('/').split_once("/-/") {
            let versions = self.packages.get(name)?;

            let basename = name.rsplit('/').next().unwrap_or(name);
            let version = file_name
                .strip_prefix(&format!("{}-", basename))?
                .strip_suffix(".tgz")?;

            return versions.get(version).map(|entry| entry.tarball.clone());
        }

        self.packument(path.trim_start_matches('/'))
            .map(|packument| serde_json::to_vec(&packument).unwrap())
    }

    pub async fn start(self) -> RunningRegistry {
        let listener
            = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await.unwrap();

        let url
            = format!("http://127.0.0.1:{}", listener.local_addr().unwrap().port());

        let registry
            = Arc::new(self);
        let requests
            = Arc::new(Mutex::new(Vec::new()));

        let server_requests
            = requests.clone();

        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };

                let io
                    = TokioIo::new(stream);

                let registry = registry.clone();
                let requests = server_requests.clone();

                tokio::spawn(async move {
                    let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                        let registry = registry.clone();
                        let requests = requests.clone();

                        async move {
                            let path = req.uri().path().to_string();
                            requests.lock().unwrap().push(path.clone());

                            let response = match registry.respond(&path) {
                                Some(body) => Response::new(Full::new(Bytes::from(body))),
                                None => Response::builder()
                                    .status(StatusCode::NOT_FOUND)
                                    .body(Full::new(Bytes::from("Not found")))
                                    .unwrap(),
                            };

                            Ok::<_, Infallible>(response)
                        }
                    });

                    let _ = http1::Builder::new()
                        .serve_connection(io, service)
                        .await;
                });
            }
        });

        RunningRegistry {url, requests}
    }
}

pub struct RunningRegistry {
    pub url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl RunningRegistry {
    pub fn archive_url(&self, file_name: &str) -> String {
        format!("{}/archives/{}", self.url, file_name)
    }

    pub fn request_count(&self, predicate: impl Fn(&str) -> bool) -> usize {
        self.requests.lock().unwrap()
            .iter()
            .filter(|path| predicate(path.as_str()))
            .count()
    }

    pub fn tarball_requests(&self) -> usize {
        self.request_count(|path| path.ends_with(".tgz"))
    }
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn make_project(manifest: Value) -> Path {
    let project_cwd
        = Path::temp_dir().unwrap();

    project_cwd.with_join_str("package.json")
        .fs_write_text(serde_json::to_string_pretty(&manifest).unwrap())
        .unwrap();

    project_cwd
}

pub fn open_project(project_cwd: &Path) -> Project {
    Project::new(project_cwd).unwrap()
}

pub fn make_env(registry: &RunningRegistry, project_cwd: &Path, cache_path: &Path) -> Environment {
    Environment::default()
        .with_registry_url(registry.url.clone())
        .with_cache_path(Some(cache_path.clone()))
        .with_mirror_path(None)
        .with_relative_dependencies_path(Some(project_cwd.clone()))
}

pub fn make_context(registry: &RunningRegistry, project_cwd: &Path, cache_path: &Path) -> InstallContext {
    init_logger();

    InstallContext::new(make_env(registry, project_cwd, cache_path)).unwrap()
}

pub fn read_installed_version(package_path: &Path) -> String {
    let manifest: Value
        = serde_json::from_str(&package_path.with_join_str("package.json").fs_read_text().unwrap()).unwrap();

    manifest["version"].as_str().unwrap().to_string()
}
