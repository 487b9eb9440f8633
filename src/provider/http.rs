//! JSON-over-HTTP metadata provider

use super::{ArtworkMetadata, MetadataProvider};
use crate::error::{Error, Result};
use crate::types::ArtworkId;
use async_trait::async_trait;
use tracing::debug;

/// Metadata provider backed by `GET {base_url}/artworks/{id}`
///
/// The endpoint answers with an [`ArtworkMetadata`] JSON document:
///
/// ```json
/// {"kind": "static", "pages": ["https://i.example/100_p0.jpg"]}
/// {"kind": "animated", "archive_url": "https://i.example/200.zip", "frame_rate": 30}
/// ```
///
/// A 404 maps to [`Error::MetadataNotFound`]; transport failures surface as
/// [`Error::Network`].
#[derive(Clone, Debug)]
pub struct HttpMetadataProvider {
    base_url: url::Url,
    client: reqwest::Client,
}

impl HttpMetadataProvider {
    /// Create a provider for `base_url` using a preconfigured client
    pub fn new(base_url: &str, client: reqwest::Client) -> Result<Self> {
        let mut base_url = url::Url::parse(base_url)
            .map_err(|e| Error::config("provider.base_url", format!("invalid URL: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::config(
                "provider.base_url",
                format!("{} cannot carry a path", base_url),
            ));
        }
        base_url.set_query(None);
        base_url.set_fragment(None);
        Ok(Self { base_url, client })
    }

    /// `{base_url}/artworks/{id}`, with the id percent-encoded as one path segment
    fn endpoint(&self, id: &ArtworkId) -> Result<url::Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                Error::config(
                    "provider.base_url",
                    format!("{} cannot carry a path", self.base_url),
                )
            })?
            .pop_if_empty()
            .push("artworks")
            .push(id.as_str());
        Ok(url)
    }
}

#[async_trait]
impl MetadataProvider for HttpMetadataProvider {
    async fn lookup(&self, id: &ArtworkId) -> Result<ArtworkMetadata> {
        let url = self.endpoint(id)?;
        debug!(artwork_id = %id, %url, "looking up artwork metadata");

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::MetadataNotFound(id.to_string()));
        }
        if !status.is_success() {
            return Err(Error::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        let metadata: ArtworkMetadata = serde_json::from_slice(&body)
            .map_err(|e| Error::InvalidMetadata(format!("artwork {}: {}", id, e)))?;

        match &metadata {
            ArtworkMetadata::Static { pages } if pages.is_empty() => {
                return Err(Error::InvalidMetadata(format!(
                    "artwork {} has no pages",
                    id
                )));
            }
            ArtworkMetadata::Animated { archive_url, .. } if archive_url.is_empty() => {
                return Err(Error::InvalidMetadata(format!(
                    "artwork {} has no archive URL",
                    id
                )));
            }
            _ => {}
        }

        debug!(artwork_id = %id, kind = ?metadata.kind(), "artwork metadata resolved");
        Ok(metadata)
    }

    fn name(&self) -> &'static str {
        "http-json"
    }
}
