//! Output language of prompts and client-facing messages

use serde::{Deserialize, Serialize};
use std::fmt;

/// Language the stages are prompted in
///
/// Chinese is the default: the data service covers A-share listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Chinese (Simplified)
    #[default]
    Chinese,
    /// English
    English,
}

impl Language {
    /// Get ISO 639-1 language code
    pub fn code(&self) -> &'static str {
        match self {
            Language::Chinese => "zh",
            Language::English => "en",
        }
    }

    /// Parse from ISO 639-1 code or common name
    ///
    /// ```
    /// use analyst_pipeline::Language;
    ///
    /// assert_eq!(Language::from_code("zh-CN"), Some(Language::Chinese));
    /// assert_eq!(Language::from_code("English"), Some(Language::English));
    /// assert_eq!(Language::from_code("ja"), None);
    /// ```
    pub fn from_code(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "zh" | "chinese" | "中文" | "zh-cn" | "zh-hans" => Some(Language::Chinese),
            "en" | "english" => Some(Language::English),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
