// src/services/relay.rs
use crate::config::RelayConfig;
use crate::errors::TerrainError;
use bytes::Bytes;
use futures_util::stream::{BoxStream, StreamExt};
use log::{info, warn};
use reqwest::redirect::Policy;
use reqwest::{Client, Url};

pub const MODEL_CONTENT_TYPE: &str = "model/gltf-binary";
pub const IMMUTABLE_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

/// Upstream asset body, passed through unmodified.
pub struct RelayedAsset {
    pub content_length: Option<u64>,
    pub body: BoxStream<'static, Result<Bytes, TerrainError>>,
}

const MAX_REDIRECTS: usize = 10;

/// Fetches generated models on behalf of the browser, restricted to
/// allow-listed hosts so it cannot be used as an open proxy.
pub struct ModelRelay {
    client: Client,
    allowed_domains: Vec<String>,
}

impl ModelRelay {
    /// Builds the relay with its own client. Every redirect hop goes through
    /// the same origin check as the requested URL; a hop that leaves the
    /// allow-list is not followed.
    pub fn new(config: &RelayConfig) -> Result<Self, reqwest::Error> {
        let allowed_domains = config.allowed_domains.clone();
        let redirect_domains = allowed_domains.clone();

        let client = Client::builder()
            .redirect(Policy::custom(move |attempt| {
                if attempt.previous().len() >= MAX_REDIRECTS {
                    return attempt.error("too many redirects");
                }
                match check_origin(&redirect_domains, attempt.url()) {
                    Ok(()) => attempt.follow(),
                    Err(e) => {
                        warn!("[Relay] Refusing redirect: {}", e);
                        attempt.stop()
                    }
                }
            }))
            .build()?;

        Ok(Self {
            client,
            allowed_domains,
        })
    }

    /// Returns the parsed URL if it uses http(s) and its host is an
    /// allow-listed domain or one of its subdomains.
    pub fn check_origin(&self, raw_url: &str) -> Result<Url, TerrainError> {
        let url = Url::parse(raw_url)
            .map_err(|e| TerrainError::Validation(format!("Invalid model URL: {}", e)))?;

        check_origin(&self.allowed_domains, &url)?;

        Ok(url)
    }

    pub async fn relay(&self, raw_url: &str) -> Result<RelayedAsset, TerrainError> {
        let url = self.check_origin(raw_url)?;

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| TerrainError::UpstreamFetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TerrainError::UpstreamFetch(status.as_u16().to_string()));
        }

        let content_length = response.content_length();
        info!(
            "[Relay] Streaming model from {} ({} bytes)",
            url.host_str().unwrap_or_default(),
            content_length
                .map(|len| len.to_string())
                .unwrap_or_else(|| "unknown".to_string())
        );

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| TerrainError::UpstreamFetch(e.to_string())))
            .boxed();

        Ok(RelayedAsset {
            content_length,
            body,
        })
    }
}

fn check_origin(allowed_domains: &[String], url: &Url) -> Result<(), TerrainError> {
    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(TerrainError::Validation(
            "Model URL must use http or https".to_string(),
        ));
    }

    let host = url
        .host_str()
        .map(|h| h.trim_end_matches('.').to_lowercase())
        .ok_or_else(|| TerrainError::Validation("Model URL must have a host".to_string()))?;

    let allowed = allowed_domains
        .iter()
        .any(|domain| host == *domain || host.ends_with(&format!(".{}", domain)));
    if !allowed {
        warn!("[Relay] Rejected model URL with host {}", host);
        return Err(TerrainError::ForbiddenOrigin(host));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::TryStreamExt;

    fn relay(domains: &[&str]) -> ModelRelay {
        ModelRelay::new(&RelayConfig {
            allowed_domains: domains.iter().map(|d| d.to_string()).collect(),
        })
        .unwrap()
    }

    #[test]
    fn allows_domain_and_subdomains() {
        let relay = relay(&["tripo3d.com"]);
        assert!(relay.check_origin("https://tripo3d.com/a.glb").is_ok());
        assert!(relay.check_origin("https://tripo-data.cdn.tripo3d.com/a.glb").is_ok());
        assert!(relay.check_origin("https://CDN.Tripo3D.com/a.glb").is_ok());
    }

    #[test]
    fn rejects_lookalike_hosts() {
        let relay = relay(&["tripo3d.com"]);
        for url in [
            "https://tripo3d.com.evil.net/a.glb",
            "https://eviltripo3d.com/a.glb",
            "https://evil.net/?next=tripo3d.com",
        ] {
            assert!(
                matches!(relay.check_origin(url), Err(TerrainError::ForbiddenOrigin(_))),
                "{} should be forbidden",
                url
            );
        }
    }

    #[test]
    fn unparseable_url_is_a_validation_error() {
        let relay = relay(&["tripo3d.com"]);
        assert!(matches!(
            relay.check_origin("not a url"),
            Err(TerrainError::Validation(_))
        ));
    }

    #[test]
    fn non_http_scheme_is_a_validation_error() {
        let relay = relay(&["tripo3d.com"]);
        match relay.check_origin("ftp://tripo3d.com/a.glb") {
            Err(TerrainError::Validation(msg)) => {
                assert_eq!(msg, "Model URL must use http or https")
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn forbidden_origin_never_fetches() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("GET", "/a.glb").expect(0).create_async().await;

        let result = relay(&["tripo3d.com"])
            .relay(&format!("{}/a.glb", server.url()))
            .await;
        assert!(matches!(result, Err(TerrainError::ForbiddenOrigin(_))));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn streams_upstream_bytes_verbatim() {
        let mut server = mockito::Server::new_async().await;
        let payload = b"glTF\x02\x00\x00\x00binary-model".to_vec();
        server
            .mock("GET", "/models/a.glb")
            .with_status(200)
            .with_header("content-type", "application/octet-stream")
            .with_body(payload.clone())
            .create_async()
            .await;

        let asset = relay(&["127.0.0.1"])
            .relay(&format!("{}/models/a.glb", server.url()))
            .await
            .unwrap();
        assert_eq!(asset.content_length, Some(payload.len() as u64));

        let chunks: Vec<Bytes> = asset.body.try_collect().await.unwrap();
        assert_eq!(chunks.concat(), payload);
    }

    #[tokio::test]
    async fn upstream_error_status_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/gone.glb")
            .with_status(404)
            .create_async()
            .await;

        let result = relay(&["127.0.0.1"])
            .relay(&format!("{}/gone.glb", server.url()))
            .await;
        assert!(matches!(result, Err(TerrainError::UpstreamFetch(code)) if code == "404"));
    }

    #[tokio::test]
    async fn redirect_off_the_allow_list_is_not_followed() {
        let mut target = mockito::Server::new_async().await;
        let secret = target
            .mock("GET", "/secret")
            .with_status(200)
            .with_body("internal-only")
            .expect(0)
            .create_async()
            .await;
        let target_port = Url::parse(&target.url()).unwrap().port().unwrap();

        let mut allowed = mockito::Server::new_async().await;
        allowed
            .mock("GET", "/a.glb")
            .with_status(302)
            .with_header("location", &format!("http://localhost:{}/secret", target_port))
            .create_async()
            .await;

        let result = relay(&["127.0.0.1"])
            .relay(&format!("{}/a.glb", allowed.url()))
            .await;
        assert!(matches!(result, Err(TerrainError::UpstreamFetch(code)) if code == "302"));
        secret.assert_async().await;
    }

    #[tokio::test]
    async fn redirect_within_the_allow_list_is_followed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/a.glb")
            .with_status(302)
            .with_header("location", &format!("{}/b.glb", server.url()))
            .create_async()
            .await;
        server
            .mock("GET", "/b.glb")
            .with_status(200)
            .with_body("glTF-moved")
            .create_async()
            .await;

        let asset = relay(&["127.0.0.1"])
            .relay(&format!("{}/a.glb", server.url()))
            .await
            .unwrap();
        let chunks: Vec<Bytes> = asset.body.try_collect().await.unwrap();
        assert_eq!(chunks.concat(), b"glTF-moved".to_vec());
    }
}
