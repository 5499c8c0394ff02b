//! Selection Policy (§4.3): decides, per candidate unit, whether FlowTrace
//! instruments it.
//!
//! Evaluation order is fixed and is itself one of the spec's testable
//! properties (§8 "Selection monotonicity" - adding an exclude pattern
//! never increases what gets instrumented):
//!
//! 1. builtin exclude matches -> reject
//! 2. user exclude matches -> reject
//! 3. include empty -> accept
//! 4. include matches -> accept, else reject

use globset::{Glob, GlobSet, GlobSetBuilder};

use flowtrace_types::{HostLanguage, SelectionPolicyConfig};
use flowtrace_utils::error::{ConfigurationError, FlowTraceError};

/// Builtin exclude prefixes/globs that are always rejected regardless of
/// user configuration (§6 "Selection Policy defaults"): standard-library
/// prefixes, common logging/serialization frameworks, the agent's own
/// package, and a generic test-harness substring match.
fn builtin_excludes(host: HostLanguage) -> Vec<&'static str> {
    let mut patterns = vec![
        "**/flowtrace/**",
        "**/flowtrace_agent/**",
        "**/*Test*",
        "**/*test*",
        "**/__pycache__/**",
    ];
    match host {
        HostLanguage::Python => patterns.extend([
            "**/site-packages/**",
            "logging/**",
            "unittest/**",
            "pytest/**",
            "**/sqlalchemy/**",
        ]),
        HostLanguage::JavaScript | HostLanguage::TypeScript => patterns.extend([
            "**/node_modules/**",
            "**/winston/**",
            "**/pino/**",
            "**/jest/**",
            "**/mocha/**",
        ]),
        HostLanguage::Java => patterns.extend([
            "java/**",
            "javax/**",
            "org/slf4j/**",
            "org/apache/log4j/**",
            "org/hibernate/**",
            "org/junit/**",
        ]),
        HostLanguage::Go => patterns.extend(["**/vendor/**", "log/**", "testing/**"]),
        HostLanguage::Rust => patterns.extend(["**/target/**", "core::**", "std::**"]),
        HostLanguage::Unknown => {}
    }
    patterns
}

/// A compiled, evaluatable Selection Policy: the glob lists from
/// `SelectionPolicyConfig` compiled into `GlobSet`s, plus the host's
/// builtin excludes.
pub struct SelectionPolicy {
    include: GlobSet,
    include_empty: bool,
    exclude: GlobSet,
    builtin: GlobSet,
}

impl SelectionPolicy {
    /// Compile a `SelectionPolicyConfig`, validating every glob pattern.
    /// Invalid patterns are a `ConfigurationError`, fatal at startup per §7.
    pub fn compile(config: &SelectionPolicyConfig) -> Result<Self, FlowTraceError> {
        let include_empty = config.include.is_empty();
        let include = compile_globs(&config.include, "selectors.include")?;
        let exclude = compile_globs(&config.exclude, "selectors.exclude")?;
        let host = config.host.unwrap_or(HostLanguage::Unknown);
        let builtin_patterns: Vec<String> = builtin_excludes(host)
            .into_iter()
            .map(str::to_string)
            .collect();
        let builtin = compile_globs(&builtin_patterns, "selectors.builtin")?;
        Ok(Self {
            include,
            include_empty,
            exclude,
            builtin,
        })
    }

    /// Evaluate a candidate unit (a package/module/file path or a
    /// qualified `unit::function` name) against the policy.
    #[must_use]
    pub fn accepts(&self, candidate: &str) -> bool {
        if self.builtin.is_match(candidate) {
            return false;
        }
        if self.exclude.is_match(candidate) {
            return false;
        }
        if self.include_empty {
            return true;
        }
        self.include.is_match(candidate)
    }

    /// The independent file-level pass the AST rewriter uses to skip
    /// generated files and (when configured) test files, per §4.3's
    /// "File-level evaluation is an independent second pass".
    #[must_use]
    pub fn accepts_file(&self, path: &str, skip_generated: bool, skip_tests: bool) -> bool {
        if skip_generated && (path.ends_with(".generated.rs") || path.contains(".g.")) {
            return false;
        }
        if skip_tests && (path.contains("/tests/") || path.ends_with("_test.rs")) {
            return false;
        }
        self.accepts(path)
    }
}

fn compile_globs(patterns: &[String], key: &str) -> Result<GlobSet, FlowTraceError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| {
            FlowTraceError::Configuration(ConfigurationError::InvalidGlob {
                key: key.to_string(),
                pattern: pattern.clone(),
                reason: e.to_string(),
            })
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| {
        FlowTraceError::Configuration(ConfigurationError::InvalidGlob {
            key: key.to_string(),
            pattern: patterns.join(","),
            reason: e.to_string(),
        })
    })
}
