use serde::{Deserialize, Serialize};

/// The host languages FlowTrace's builtin-exclude defaults and launcher
/// detection are parameterized over (§6 "Selection Policy defaults").
///
/// The core crate never ships a per-language agent (Non-goal, §1); this
/// enum exists so `flowtrace-selectors`' builtin lists and
/// `flowtrace-launcher`'s detection have a shared vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostLanguage {
    Python,
    JavaScript,
    TypeScript,
    Java,
    Go,
    Rust,
    /// No project marker matched; builtin excludes fall back to a generic,
    /// conservative minimum.
    Unknown,
}

impl HostLanguage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::Java => "java",
            Self::Go => "go",
            Self::Rust => "rust",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for HostLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
