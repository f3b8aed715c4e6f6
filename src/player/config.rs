//! Per-player configuration
//!
//! The host describes each player with a JSON object using camelCase keys.
//! Hosts are sloppy with numbers (they arrive as numbers, numeric strings
//! or garbage), so numeric fields are parsed leniently: anything that is not
//! a finite number is treated as unset and fixed up by
//! [`PlayerConfig::normalize`].

use crate::player::Speed;
use crate::utils::error::{IntoPlayerError, Result};
use log::warn;
use once_cell::sync::Lazy;
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Default share of the video that counts as complete
pub const DEFAULT_COMPLETION_PERCENTAGE: f64 = 0.95;

/// Longest a bumper is allowed to play, in seconds
pub const MAX_BUMPER_DURATION: f64 = 35.0;

/// Player configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlayerConfig {
    /// Speeds offered in the speed menu
    #[serde(deserialize_with = "lenient_speeds")]
    pub speeds: Vec<Speed>,

    /// Start of the playable region in seconds
    #[serde(deserialize_with = "lenient_f64")]
    pub start: Option<f64>,

    /// End of the playable region in seconds
    #[serde(deserialize_with = "lenient_f64")]
    pub end: Option<f64>,

    /// Position to resume from, in seconds
    #[serde(deserialize_with = "lenient_f64")]
    pub saved_video_position: Option<f64>,

    /// Transcript languages, code to label, in menu order
    pub transcript_languages: LanguageMap,

    /// Preferred transcript language
    pub transcript_language: Option<String>,

    /// Transcript base URL or `__lang__` template
    pub transcript_url: Option<String>,

    /// Available-translations endpoint
    pub transcript_available_translations_url: Option<String>,

    /// Save-state endpoint
    pub save_state_url: Option<String>,

    /// Whether save-state POSTs are sent at all
    pub save_state_enabled: bool,

    /// Completion endpoint
    pub publish_completion_url: Option<String>,

    /// Whether completion is tracked
    pub completion_enabled: bool,

    /// Share of the region that counts as complete
    #[serde(deserialize_with = "lenient_f64")]
    pub completion_percentage: Option<f64>,

    /// Poster image URL
    pub poster: Option<String>,

    /// Focus the first control when the player mounts
    pub focus_first_control: bool,

    /// Provider availability recorded on the host
    pub recorded_youtube_is_available: bool,

    /// Native encodings, in preference order
    pub sources: Vec<String>,

    /// External provider video id, optionally as `speed:id` pairs
    pub streams: Option<String>,

    /// Media length in seconds when known up front
    #[serde(deserialize_with = "lenient_f64")]
    pub duration: Option<f64>,

    /// Speed saved on the host for this video
    #[serde(deserialize_with = "lenient_speed")]
    pub speed: Option<Speed>,

    /// Speed saved on the host across videos
    #[serde(deserialize_with = "lenient_speed")]
    pub general_speed: Option<Speed>,

    /// Show captions by default
    pub show_captions: bool,

    /// Pre-roll bumper
    pub bumper: Option<BumperConfig>,
}

/// Pre-roll bumper media
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BumperConfig {
    /// Native encodings
    pub sources: Vec<String>,

    /// Length in seconds
    #[serde(deserialize_with = "lenient_f64")]
    pub duration: Option<f64>,

    /// External provider video id
    pub streams: Option<String>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            speeds: DEFAULT_SPEEDS.clone(),
            start: None,
            end: None,
            saved_video_position: None,
            transcript_languages: LanguageMap::default(),
            transcript_language: None,
            transcript_url: None,
            transcript_available_translations_url: None,
            save_state_url: None,
            save_state_enabled: true,
            publish_completion_url: None,
            completion_enabled: false,
            completion_percentage: None,
            poster: None,
            focus_first_control: false,
            recorded_youtube_is_available: true,
            sources: Vec::new(),
            streams: None,
            duration: None,
            speed: None,
            general_speed: None,
            show_captions: true,
            bumper: None,
        }
    }
}

/// Speeds offered when the host configures none
static DEFAULT_SPEEDS: Lazy<Vec<Speed>> =
    Lazy::new(|| [75, 100, 125, 150, 200].into_iter().map(Speed::from_hundredths).collect());

impl PlayerConfig {
    /// Parse and normalize a JSON configuration object
    pub fn from_json(json: &str) -> Result<Self> {
        let mut config: PlayerConfig = serde_json::from_str(json).config_err("Parsing player configuration")?;
        config.normalize();
        Ok(config)
    }

    /// Fix up inconsistent values.
    ///
    /// A negative start becomes 0, an end at or before the start is
    /// dropped, and a saved position that is missing or outside the
    /// region falls back to the start.
    pub fn normalize(&mut self) {
        let start = self.start.filter(|s| *s > 0.0).unwrap_or(0.0);
        self.start = Some(start);

        if let Some(end) = self.end {
            if end <= start {
                warn!("Ignoring end bound {} at or before start {}", end, start);
                self.end = None;
            }
        }

        let upper = self.end.or(self.duration);
        let saved = self
            .saved_video_position
            .filter(|p| *p >= start && upper.map_or(true, |u| *p <= u));
        self.saved_video_position = Some(saved.unwrap_or(start));

        if self.speeds.is_empty() {
            self.speeds = DEFAULT_SPEEDS.clone();
        }
        self.speeds.sort_unstable();
        self.speeds.dedup();

        self.completion_percentage = Some(
            self.completion_percentage
                .filter(|p| *p > 0.0 && *p <= 1.0)
                .unwrap_or(DEFAULT_COMPLETION_PERCENTAGE),
        );

        if let Some(bumper) = &mut self.bumper {
            bumper.duration = bumper.duration.filter(|d| *d > 0.0);
        }
    }

    /// Start of the playable region
    pub fn start_bound(&self) -> f64 {
        self.start.filter(|s| *s > 0.0).unwrap_or(0.0)
    }

    /// End of the playable region, if bounded
    pub fn end_bound(&self) -> Option<f64> {
        self.end.filter(|e| *e > self.start_bound())
    }

    /// External provider video id.
    ///
    /// `streams` is either a bare id or a comma-separated list of
    /// `speed:id` pairs, in which case the 1.0x entry is used.
    pub fn provider_id(&self) -> Option<String> {
        parse_streams(self.streams.as_deref()?)
    }

    pub fn completion_threshold(&self) -> f64 {
        self.completion_percentage.unwrap_or(DEFAULT_COMPLETION_PERCENTAGE)
    }
}

impl BumperConfig {
    pub fn provider_id(&self) -> Option<String> {
        parse_streams(self.streams.as_deref()?)
    }
}

fn parse_streams(streams: &str) -> Option<String> {
    let streams = streams.trim();
    if streams.is_empty() {
        return None;
    }
    if !streams.contains(':') {
        return Some(streams.to_string());
    }

    let pairs: Vec<(Option<Speed>, &str)> = streams
        .split(',')
        .filter_map(|pair| pair.split_once(':'))
        .map(|(speed, id)| (Speed::parse(speed), id.trim()))
        .filter(|(_, id)| !id.is_empty())
        .collect();

    pairs
        .iter()
        .find(|(speed, _)| *speed == Some(Speed::NORMAL))
        .or_else(|| pairs.first())
        .map(|(_, id)| id.to_string())
}

/// Transcript languages in the order the host listed them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LanguageMap(Vec<(String, String)>);

impl LanguageMap {
    pub fn new(entries: Vec<(String, String)>) -> Self {
        LanguageMap(entries)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.0.iter().any(|(c, _)| c == code)
    }

    pub fn label(&self, code: &str) -> Option<&str> {
        self.0.iter().find(|(c, _)| c == code).map(|(_, l)| l.as_str())
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(c, _)| c.as_str())
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.0
    }

    /// Keep only the languages in `available`
    pub fn retain_codes(&mut self, available: &[String]) {
        self.0.retain(|(c, _)| available.iter().any(|a| a == c));
    }

    /// `requested` if listed, otherwise `en` if listed, otherwise the last
    /// language; `None` when the map is empty
    pub fn resolve(&self, requested: Option<&str>) -> Option<String> {
        if let Some(code) = requested.filter(|c| self.contains(c)) {
            return Some(code.to_string());
        }
        if self.contains("en") {
            return Some("en".to_string());
        }
        self.0.last().map(|(c, _)| c.clone())
    }
}

impl Serialize for LanguageMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (code, label) in &self.0 {
            map.serialize_entry(code, label)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for LanguageMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct LanguageVisitor;

        impl<'de> Visitor<'de> for LanguageVisitor {
            type Value = LanguageMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of language codes to labels")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<LanguageMap, A::Error> {
                let mut entries = Vec::new();
                while let Some((code, label)) = access.next_entry::<String, String>()? {
                    entries.push((code, label));
                }
                Ok(LanguageMap(entries))
            }
        }

        deserializer.deserialize_map(LanguageVisitor)
    }
}

fn number_from(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<f64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(number_from(&value))
}

fn lenient_speed<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<Speed>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(number_from(&value).and_then(Speed::from_f64))
}

fn lenient_speeds<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<Speed>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Array(items) => Ok(items
            .iter()
            .filter_map(|v| number_from(v).and_then(Speed::from_f64))
            .collect()),
        Value::Null => Ok(Vec::new()),
        other => Err(de::Error::custom(format!("expected a list of speeds, got {}", other))),
    }
}
