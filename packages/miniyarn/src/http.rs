use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use dashmap::DashMap;
use miniyarn_utils::Glob;
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;

use crate::{config::Environment, error::Error};

#[derive(Debug)]
pub struct HttpConfig {
    pub http_retry: usize,
    pub unsafe_http_whitelist: Vec<Glob>,

    enable_network: bool,
}

#[derive(Debug)]
pub struct HttpClient {
    pub config: HttpConfig,

    client: Client,
    cache: DashMap<String, Bytes>,
}

#[derive(Debug)]
pub struct HttpRequest<'a> {
    client: &'a HttpClient,
    builder: RequestBuilder,
    url: Url,

    retry: bool,
}

fn is_retriable_status(status: reqwest::StatusCode) -> bool {
    status.is_server_error() || matches!(status.as_u16(), 408 | 413 | 429)
}

impl<'a> HttpRequest<'a> {
    pub fn new(client: &'a HttpClient, url: Url, method: Method, retry: bool) -> Self {
        let builder = client.client.request(method, url.clone());

        Self { builder, client, url, retry }
    }

    pub async fn send(self) -> Result<Response, Error> {
        let mut retry_count = 0;

        // If the request is not retriable, we should avoid cloning the builder.
        if !self.retry {
            let response
                = self.builder.send().await;

            return check_response(&self.url, response);
        }

        loop {
            let builder = self.builder.try_clone()
                .ok_or_else(|| Error::InvalidUrl(self.url.to_string()))?;

            let response
                = builder.send().await;

            if retry_count < self.client.config.http_retry {
                let is_failure = match &response {
                    Ok(response) => is_retriable_status(response.status()),
                    Err(_) => true,
                };

                if is_failure {
                    retry_count += 1;

                    let sleep_duration
                        = 2_u64.saturating_pow(retry_count as u32);
                    let bounded_sleep_duration
                        = std::cmp::min(sleep_duration, 10);

                    log::debug!("Retrying {} in {}s (attempt {})", self.url, bounded_sleep_duration, retry_count);

                    tokio::time::sleep(Duration::from_secs(bounded_sleep_duration)).await;
                    continue;
                }
            }

            return check_response(&self.url, response);
        }
    }
}

fn check_response(url: &Url, response: Result<Response, reqwest::Error>) -> Result<Response, Error> {
    let response = response
        .map_err(|err| Error::HttpError(Arc::new(err), Some(url.to_string())))?;

    if !response.status().is_success() {
        return Err(Error::HttpStatus {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }

    Ok(response)
}

impl HttpClient {
    pub fn new(env: &Environment) -> Result<Arc<Self>, Error> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(env.network_concurrency)
            .pool_idle_timeout(Duration::from_secs(30))

            .connect_timeout(Duration::from_secs(30))
            .read_timeout(Duration::from_secs(30))
            .timeout(Duration::from_secs(300))

            .tcp_keepalive(Duration::from_secs(60))

            .use_rustls_tls()
            .build()?;

        let config = HttpConfig {
            http_retry: env.http_retry,
            unsafe_http_whitelist: env.unsafe_http_whitelist.clone(),

            enable_network: env.enable_network,
        };

        Ok(Arc::new(Self {
            client,
            config,
            cache: DashMap::new(),
        }))
    }

    fn request(&self, url: impl AsRef<str>, method: Method, retry: bool) -> Result<HttpRequest<'_>, Error> {
        let url = url.as_ref();

        let url = Url::parse(url)
            .map_err(|_| Error::InvalidUrl(url.to_owned()))?;

        if !self.config.enable_network {
            return Err(Error::NetworkDisabledError(url.to_string()));
        }

        if url.scheme() == "http" {
            let host
                = url.host_str().unwrap_or_default();

            if !self.config.unsafe_http_whitelist.iter().any(|glob| glob.is_match(host)) {
                return Err(Error::UnsafeHttpError(url));
            }
        }

        Ok(HttpRequest::new(self, url, method, retry))
    }

    pub fn get(&self, url: impl AsRef<str>) -> Result<HttpRequest<'_>, Error> {
        self.request(url, Method::GET, true)
    }

    pub async fn get_bytes(&self, url: impl AsRef<str>) -> Result<Bytes, Error> {
        let response
            = self.get(url)?.send().await?;

        Ok(response.bytes().await?)
    }

    /// GETs a JSON document, memoizing the raw body for the lifetime of the
    /// client so that repeated lookups (typically registry metadata) only hit
    /// the network once.
    pub async fn get_json<T: DeserializeOwned>(&self, url: impl AsRef<str>) -> Result<T, Error> {
        let url = url.as_ref();

        let cached = self.cache.get(url)
            .map(|entry| entry.value().clone());

        let body = match cached {
            Some(cached) => cached,
            None => {
                let body
                    = self.get_bytes(url).await?;

                self.cache.insert(url.to_string(), body.clone());
                body
            },
        };

        Ok(serde_json::from_slice(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("http://localhost:4873/pkg", true)]
    #[case("http://127.0.0.1/pkg", true)]
    #[case("http://example.com/pkg", false)]
    #[case("https://example.com/pkg", true)]
    fn test_http_whitelist(#[case] url: &str, #[case] allowed: bool) {
        let client = HttpClient::new(&Environment::default()).unwrap();

        match client.get(url) {
            Ok(_) => assert!(allowed),
            Err(Error::UnsafeHttpError(_)) => assert!(!allowed),
            Err(err) => panic!("unexpected error: {err}"),
        }
    }

    #[test]
    fn test_network_disabled() {
        let client = HttpClient::new(&Environment::default().with_enable_network(false)).unwrap();

        assert!(matches!(client.get("https://example.com/pkg"), Err(Error::NetworkDisabledError(_))));
    }

    #[test]
    fn test_invalid_url() {
        let client = HttpClient::new(&Environment::default()).unwrap();

        assert!(matches!(client.get("not a url"), Err(Error::InvalidUrl(_))));
    }
}
