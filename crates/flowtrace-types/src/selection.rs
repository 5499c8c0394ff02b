use serde::{Deserialize, Serialize};

use crate::host::HostLanguage;

/// The uncompiled data behind a Selection Policy (§3, §4.3): include/exclude
/// glob lists plus the host language whose builtin-exclude defaults apply.
///
/// This is plain data; `flowtrace-selectors` compiles it into matchable
/// `GlobSet`s and implements the evaluation order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionPolicyConfig {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub host: Option<HostLanguage>,
}

impl SelectionPolicyConfig {
    #[must_use]
    pub fn new(host: HostLanguage) -> Self {
        Self {
            include: Vec::new(),
            exclude: Vec::new(),
            host: Some(host),
        }
    }

    #[must_use]
    pub fn with_include(mut self, patterns: impl IntoIterator<Item = String>) -> Self {
        self.include.extend(patterns);
        self
    }

    #[must_use]
    pub fn with_exclude(mut self, patterns: impl IntoIterator<Item = String>) -> Self {
        self.exclude.extend(patterns);
        self
    }

    /// A policy built from a single package-prefix, per §6's
    /// `package-prefix` option: "Sets Selection Policy include list to a
    /// single prefix."
    #[must_use]
    pub fn from_package_prefix(prefix: &str, host: HostLanguage) -> Self {
        Self::new(host).with_include([format!("{prefix}**")])
    }
}
