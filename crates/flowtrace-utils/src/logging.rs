//! Structured logging and observability infrastructure for `flowtrace`.
//!
//! Initialized once from the CLI entry point. Distinct from the trace log
//! itself: this is where `flowtrace`'s own lifecycle events go (installation,
//! first segmentation, writer errors), never the instrumented program's
//! trace events.

use std::io::IsTerminal;
use std::time::{Duration, Instant};
use tracing::{Level, info, span};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Returns true if colored terminal output should be used: stdout is a TTY
/// and `NO_COLOR` is unset.
#[must_use]
pub fn use_color() -> bool {
    std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

/// Initialize the global tracing subscriber.
///
/// Verbose mode adds span close events and widens the default filter from
/// `info,warn` to `debug,info`. Respects `RUST_LOG` when set.
pub fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("flowtrace=debug,info")
            } else {
                EnvFilter::try_new("flowtrace=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_line_number(false)
        .with_file(false)
        .with_span_events(if verbose {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        })
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// Span covering one pipeline lifecycle phase (install, segmentation, etc.).
pub fn pipeline_span(phase: &str) -> tracing::Span {
    span!(Level::INFO, "pipeline", phase = %phase)
}

/// Small timing helper for reporting how long a one-shot operation (e.g.
/// interceptor install, first segment write) took, at debug-friendly
/// granularity without pulling in a metrics crate.
pub struct Stopwatch {
    label: &'static str,
    start: Instant,
}

impl Stopwatch {
    #[must_use]
    pub fn start(label: &'static str) -> Self {
        Self {
            label,
            start: Instant::now(),
        }
    }

    pub fn finish(self) -> Duration {
        let elapsed = self.start.elapsed();
        info!(label = self.label, duration_ms = %elapsed.as_millis(), "done");
        elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn stopwatch_reports_elapsed_time() {
        let sw = Stopwatch::start("test_op");
        thread::sleep(Duration::from_millis(5));
        let elapsed = sw.finish();
        assert!(elapsed >= Duration::from_millis(5));
    }

    #[test]
    fn pipeline_span_has_expected_name() {
        let span = pipeline_span("install");
        if let Some(metadata) = span.metadata() {
            assert_eq!(metadata.name(), "pipeline");
        }
    }

    #[test]
    fn tracing_init_does_not_panic() {
        let result = init_tracing(false);
        assert!(result.is_ok() || result.is_err());
    }
}
