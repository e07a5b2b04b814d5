use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// When a rule callback runs relative to the default rebuild step.
///
/// - `Pre`: sequentially, before the rebuild (default).
/// - `Concurrent`: alongside the rebuild; the pipeline waits for it.
/// - `ConcurrentNoWait`: detached; its outcome is only logged.
/// - `Post`: sequentially, after the rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    Pre,
    Concurrent,
    ConcurrentNoWait,
    Post,
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::Pre
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pre" => Ok(Strategy::Pre),
            "concurrent" => Ok(Strategy::Concurrent),
            "concurrent-no-wait" => Ok(Strategy::ConcurrentNoWait),
            "post" => Ok(Strategy::Post),
            other => Err(format!(
                "invalid callback strategy: {other} (expected \"pre\", \"concurrent\", \"concurrent-no-wait\" or \"post\")"
            )),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Strategy::Pre => "pre",
            Strategy::Concurrent => "concurrent",
            Strategy::ConcurrentNoWait => "concurrent-no-wait",
            Strategy::Post => "post",
        };
        f.write_str(s)
    }
}

/// What the browser should do in response to a reload message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    /// A hard rebuild started; the page may show a spinner.
    Rebuilding,
    /// Swap the inlined critical stylesheet.
    #[serde(rename = "critical")]
    CriticalStyle,
    /// Swap the linked normal stylesheet.
    #[serde(rename = "normal")]
    NormalStyle,
    /// Full page reload.
    Other,
    /// Re-fetch page data without a full reload.
    Revalidate,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeType::Rebuilding => "rebuilding",
            ChangeType::CriticalStyle => "critical",
            ChangeType::NormalStyle => "normal",
            ChangeType::Other => "other",
            ChangeType::Revalidate => "revalidate",
        };
        f.write_str(s)
    }
}
