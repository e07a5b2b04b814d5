// src/livereload/message.rs

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::types::ChangeType;

/// One live-reload instruction, serialized as the `data:` field of an SSE
/// frame:
///
/// ```json
/// {"changeType":"critical","criticalCSS":"Ym9keXt9","normalCSSURL":"","at":"2026-01-01T00:00:00.000Z"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReloadMessage {
    pub change_type: ChangeType,

    /// Base64 of the new critical bundle. Empty unless `critical`.
    #[serde(rename = "criticalCSS", default)]
    pub critical_css: String,

    /// URL of the new normal bundle. Empty unless `normal`.
    #[serde(rename = "normalCSSURL", default)]
    pub normal_css_url: String,

    /// RFC 3339 creation time.
    pub at: String,
}

impl ReloadMessage {
    pub fn new(change_type: ChangeType) -> Self {
        Self {
            change_type,
            critical_css: String::new(),
            normal_css_url: String::new(),
            at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    pub fn rebuilding() -> Self {
        Self::new(ChangeType::Rebuilding)
    }

    pub fn reload() -> Self {
        Self::new(ChangeType::Other)
    }

    pub fn revalidate() -> Self {
        Self::new(ChangeType::Revalidate)
    }

    pub fn critical(css: &[u8]) -> Self {
        Self {
            critical_css: STANDARD.encode(css),
            ..Self::new(ChangeType::CriticalStyle)
        }
    }

    pub fn normal(url: impl Into<String>) -> Self {
        Self {
            normal_css_url: url.into(),
            ..Self::new(ChangeType::NormalStyle)
        }
    }

    /// Decoded critical stylesheet, if this message carries one.
    pub fn critical_css_bytes(&self) -> Option<Vec<u8>> {
        if self.change_type != ChangeType::CriticalStyle {
            return None;
        }
        STANDARD.decode(&self.critical_css).ok()
    }

    pub fn to_json(&self) -> String {
        // Plain strings and enums only; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}
