//! Configuration surface (§6): resolves the options a launcher hands to
//! the Selection Policy and Event Pipeline at startup.
//!
//! Precedence, highest to lowest: CLI flag > environment variable >
//! `.flowtrace/config.toml` > built-in default. Options are supplied as
//! environment variables for hosts that prefer them, and as host-native
//! property mechanisms otherwise; this crate's `EffectiveConfig` is the
//! Rust-native resolved form regardless of source.

pub mod builder;
pub mod discovery;
pub mod model;
pub mod sources;
pub mod validation;

pub use builder::ConfigBuilder;
pub use model::{ConfigSource, EffectiveConfig, EffectiveValue};
