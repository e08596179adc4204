//! Provenance of quoted evidence.

use attest_types::{RecordId, SourceId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Primary,
    #[default]
    Secondary,
    Official,
    Media,
    Academic,
    Other,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: SourceId,
    pub record_id: RecordId,
    /// May be empty for offline documents.
    #[serde(default)]
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub source_type: SourceType,
    #[serde(default)]
    pub notes: Option<String>,
    pub added_by: UserId,
    pub added_at: Timestamp,
}

impl Source {
    pub fn has_url(&self) -> bool {
        !self.url.trim().is_empty()
    }

    pub(crate) fn check(&self) -> Result<(), String> {
        if self.title.trim().is_empty() && !self.has_url() {
            return Err("a source needs a title or a URL".into());
        }
        if self.has_url() {
            let url = self.url.trim();
            let host = url
                .strip_prefix("https://")
                .or_else(|| url.strip_prefix("http://"))
                .map(|rest| rest.split('/').next().unwrap_or(""));
            match host {
                Some(h) if !h.is_empty() => {}
                _ => return Err(format!("{url:?} is not an http(s) URL")),
            }
        }
        Ok(())
    }
}
