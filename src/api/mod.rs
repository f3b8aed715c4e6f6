//! Host REST API
//!
//! The player talks to the hosting site through four endpoints: save-state,
//! transcript download, available translations and completion tracking.
//! [`HostApi`] abstracts them so the player core never touches HTTP
//! directly; [`HttpHostApi`] is the `reqwest`-backed implementation.

use crate::captions::CaptionPayload;
use crate::utils::error::{IntoPlayerError, PlayerError, Result};
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Placeholder replaced by the language code in transcript URL templates
pub const LANGUAGE_PLACEHOLDER: &str = "__lang__";

/// Default location of the available-translations endpoint
pub const DEFAULT_TRANSLATIONS_URL: &str = "/transcript/available_translations";

/// Body of a save-state POST. Absent fields are left out of the JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveStatePayload {
    /// Position formatted as `HH:MM:SS`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_video_position: Option<String>,

    /// Speed in its string form, e.g. `1.50`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<String>,

    /// Whether the external provider could be reached
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube_is_available: Option<bool>,

    /// Newly selected transcript language
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript_language: Option<String>,
}

impl SaveStatePayload {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Body of a completion POST
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompletionPayload {
    /// Fraction of the video watched, in `[0, 1]`
    pub completion: f64,
}

/// Operations the player needs from its host
#[async_trait]
pub trait HostApi: Send + Sync {
    /// POST the player's state. Fire-and-forget from the player's point of
    /// view; failures are only logged.
    async fn save_state(&self, url: &str, payload: &SaveStatePayload) -> Result<()>;

    /// GET a transcript, optionally asking for a specific provider video
    async fn fetch_transcript(&self, url: &str, video_id: Option<&str>) -> Result<CaptionPayload>;

    /// GET the language codes that have a transcript
    async fn available_translations(&self, url: &str) -> Result<Vec<String>>;

    /// POST a completion fraction
    async fn publish_completion(&self, url: &str, completion: f64) -> Result<()>;
}

/// Resolve a transcript URL for `language`.
///
/// Templates containing `__lang__` get the code substituted; anything else
/// is treated as a base URL and gets `/<language>` appended.
pub fn transcript_url(base: &str, language: &str) -> String {
    if base.contains(LANGUAGE_PLACEHOLDER) {
        base.replace(LANGUAGE_PLACEHOLDER, language)
    } else {
        format!("{}/{}", base.trim_end_matches('/'), language)
    }
}

/// [`HostApi`] over HTTP
#[derive(Debug, Clone)]
pub struct HttpHostApi {
    client: reqwest::Client,

    /// Prefix for relative endpoint paths
    base_url: Option<String>,
}

impl HttpHostApi {
    /// Create a client with the given request timeout
    pub fn new(timeout: Duration, base_url: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("lectern/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, base_url })
    }

    /// Absolute URL for `url`, prefixing the base URL for relative paths
    pub fn resolve(&self, url: &str) -> String {
        match &self.base_url {
            Some(base) if url.starts_with('/') => {
                format!("{}{}", base.trim_end_matches('/'), url)
            }
            _ => url.to_string(),
        }
    }

    fn check(url: &str, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(PlayerError::Transport(format!("{} returned HTTP {}", url, status)))
        }
    }
}

#[async_trait]
impl HostApi for HttpHostApi {
    async fn save_state(&self, url: &str, payload: &SaveStatePayload) -> Result<()> {
        let url = self.resolve(url);
        debug!("POST {} {:?}", url, payload);

        let response = self.client.post(&url).json(payload).send().await?;
        Self::check(&url, response)?;
        Ok(())
    }

    async fn fetch_transcript(&self, url: &str, video_id: Option<&str>) -> Result<CaptionPayload> {
        let url = self.resolve(url);
        debug!("GET {} (videoId: {:?})", url, video_id);

        let mut request = self.client.get(&url);
        if let Some(id) = video_id {
            request = request.query(&[("videoId", id)]);
        }

        let response = Self::check(&url, request.send().await?)?;
        response
            .json::<CaptionPayload>()
            .await
            .transport_err("Decoding transcript")
    }

    async fn available_translations(&self, url: &str) -> Result<Vec<String>> {
        let url = self.resolve(url);
        debug!("GET {}", url);

        let response = Self::check(&url, self.client.get(&url).send().await?)?;
        Ok(response.json::<Vec<String>>().await?)
    }

    async fn publish_completion(&self, url: &str, completion: f64) -> Result<()> {
        let url = self.resolve(url);
        debug!("POST {} completion={}", url, completion);

        let response = self
            .client
            .post(&url)
            .json(&CompletionPayload { completion })
            .send()
            .await?;
        Self::check(&url, response)?;
        Ok(())
    }
}

/// [`HostApi`] for players without a host. Every request fails with a
/// transport error, which the modules treat like an unreachable server.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineHostApi;

#[async_trait]
impl HostApi for OfflineHostApi {
    async fn save_state(&self, url: &str, _payload: &SaveStatePayload) -> Result<()> {
        Err(offline(url))
    }

    async fn fetch_transcript(&self, url: &str, _video_id: Option<&str>) -> Result<CaptionPayload> {
        Err(offline(url))
    }

    async fn available_translations(&self, url: &str) -> Result<Vec<String>> {
        Err(offline(url))
    }

    async fn publish_completion(&self, url: &str, _completion: f64) -> Result<()> {
        Err(offline(url))
    }
}

fn offline(url: &str) -> PlayerError {
    PlayerError::Transport(format!("No host configured for {}", url))
}
