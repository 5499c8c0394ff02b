//! The per-call context and the pipeline that owns emission (§4.4).
//!
//! `Pipeline` is the process-wide (or per-configuration) emitter: it
//! owns the main-log writer and the segmentation settings, and is built
//! once from an `EffectiveConfig`. `CallContext` is the ephemeral,
//! per-invocation record a host binding's prologue opens and its
//! epilogue/exception-catcher close -- mirroring §3's Call Context
//! ("lives on the host's stack or task state... destroyed when EXIT is
//! emitted").
//!
//! State machine (§4.4):
//! ```text
//! [OPEN]  -- exit(results)       --> [CLOSED]
//! [OPEN]  -- exception(message)  --> [CLOSED]
//! [CLOSED] -- any further op      --> ignored (idempotent)
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use camino::Utf8PathBuf;
use tracing::warn;

use flowtrace_config::EffectiveConfig;
use flowtrace_types::{EventKind, ExceptionInfo, TraceEvent};

use crate::segment::segment_if_oversize;
use crate::value::{serialize_list_to_text, serialize_result_to_text, SerializeOptions, Value};
use crate::writer::LogWriter;

/// Default bound on stack frames attached to an `EXCEPTION` event (§3).
const DEFAULT_STACK_FRAME_LIMIT: usize = 3;

/// The Trace Event Pipeline: builds events from Call Context signals and
/// writes them to the main log, segmenting oversize fields as it goes.
///
/// One `Pipeline` is built per configuration and shared (typically via
/// `Arc`) across every thread/task a host binding instruments; `enter`
/// takes `&self` so multiple Call Contexts may be open concurrently on
/// different threads (§5 "multiple Call Contexts may be open
/// simultaneously on different threads").
pub struct Pipeline {
    writer: LogWriter,
    segment_dir: Utf8PathBuf,
    truncate_threshold: u32,
    enable_segmentation: bool,
    serialize_opts: SerializeOptions,
    enabled: bool,
    warned_once: AtomicBool,
}

impl Pipeline {
    /// Build a pipeline from the resolved configuration surface (§6).
    pub fn from_config(config: &EffectiveConfig) -> std::io::Result<Self> {
        let writer = LogWriter::open(&Utf8PathBuf::from(&config.logfile), config.stdout)?;
        Ok(Self {
            writer,
            segment_dir: Utf8PathBuf::from(&config.segment_directory),
            truncate_threshold: config.truncate_threshold,
            enable_segmentation: config.enable_segmentation,
            serialize_opts: SerializeOptions {
                max_arg_length: config.max_arg_length,
            },
            enabled: config.enabled,
            warned_once: AtomicBool::new(false),
        })
    }

    /// `enter(unit, function, args) -> CallContext` (§4.4): records the
    /// wall-clock start and a high-resolution timer, emits ENTER
    /// synchronously, and returns the open context.
    ///
    /// `thread` is host-supplied (thread name, task id, or `"main"` for
    /// single-threaded hosts) -- the pipeline has no opinion on what
    /// identifies a flow of execution in a given host.
    pub fn enter(
        &self,
        thread: impl Into<String>,
        class: impl Into<String>,
        method: impl Into<String>,
        args: &[(String, Value)],
    ) -> CallContext<'_> {
        let thread = thread.into();
        let class = class.into();
        let method = method.into();
        let start = Instant::now();
        let start_millis = now_millis();
        let args_text = serialize_list_to_text(args, &self.serialize_opts);

        if self.enabled {
            let event = TraceEvent {
                timestamp: start_millis,
                event: EventKind::Enter,
                thread: thread.clone(),
                class: class.clone(),
                method: method.clone(),
                args: Some(args_text.clone()),
                result: None,
                exception: None,
                duration_micros: None,
                duration_millis: None,
                truncated_fields: None,
                full_log_file: None,
            };
            self.emit(event);
        }

        CallContext {
            pipeline: self,
            thread,
            class,
            method,
            args_text,
            start,
            closed: AtomicBool::new(false),
        }
    }

    /// Build, segment (if oversize), and write one event. Writer errors
    /// are an `EmissionError` (§7): logged once to stderr, then dropped
    /// -- never propagated into the instrumented program.
    fn emit(&self, event: TraceEvent) {
        let event = if self.enable_segmentation {
            match segment_if_oversize(event, &self.segment_dir, self.truncate_threshold) {
                Ok(e) => e,
                Err(e) => {
                    self.warn_once(&format!("segmentation write failed: {e}"));
                    return;
                }
            }
        } else {
            event
        };

        let line = match serde_json::to_string(&event) {
            Ok(line) => line,
            Err(e) => {
                self.warn_once(&format!("event serialization failed: {e}"));
                return;
            }
        };

        if let Err(e) = self.writer.write_line(&line) {
            self.warn_once(&format!("main log write failed: {e}"));
        }
    }

    fn warn_once(&self, message: &str) {
        if self.warned_once.swap(true, Ordering::Relaxed) {
            return;
        }
        warn!(target: "flowtrace::pipeline", "{message} (further emission errors on this pipeline are suppressed)");
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// The ephemeral per-invocation record a Call Context is (§3): owns the
/// start timestamp and is destroyed by `exit`/`exception`. Closing is
/// idempotent -- a second call after the context is already closed is a
/// no-op, matching a host's "deferred block fires once" semantics even
/// though Rust gives us no language-level defer to enforce it.
pub struct CallContext<'p> {
    pipeline: &'p Pipeline,
    thread: String,
    class: String,
    method: String,
    args_text: String,
    start: Instant,
    closed: AtomicBool,
}

impl<'p> CallContext<'p> {
    /// `CallContext.exit(results)` (§4.4): computes duration and emits
    /// EXIT. `results` is the named-return list the rewritten epilogue
    /// built (`[("result_0", ...), ...]`); a single entry collapses to a
    /// bare value, multiple serialize as an object (§4.1, §6). EXIT
    /// repeats the same `args` text ENTER carried (§3 field table, §6's
    /// wire example), not just `result`.
    pub fn exit(&self, results: &[(String, Value)]) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if !self.pipeline.enabled {
            return;
        }
        let elapsed = self.start.elapsed();
        let result_text = if results.is_empty() {
            None
        } else {
            Some(serialize_result_to_text(results, &self.pipeline.serialize_opts))
        };
        let event = TraceEvent {
            timestamp: now_millis(),
            event: EventKind::Exit,
            thread: self.thread.clone(),
            class: self.class.clone(),
            method: self.method.clone(),
            args: Some(self.args_text.clone()),
            result: result_text,
            exception: None,
            duration_micros: Some(i64::try_from(elapsed.as_micros()).unwrap_or(i64::MAX)),
            duration_millis: Some(i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)),
            truncated_fields: None,
            full_log_file: None,
        };
        self.pipeline.emit(event);
    }

    /// `CallContext.exception(message)` (§4.4): emits EXCEPTION in place
    /// of EXIT. The panic/exception catcher installed by the prologue
    /// calls this before re-raising the original cause unchanged (§4.1).
    pub fn exception(&self, kind: impl Into<String>, message: impl Into<String>) {
        self.exception_with_stack(kind, message, Vec::new());
    }

    /// As `exception`, but attaching up to `DEFAULT_STACK_FRAME_LIMIT`
    /// stack frames (§3: "Up to a bounded number of stack frames, default
    /// 3").
    pub fn exception_with_stack(
        &self,
        kind: impl Into<String>,
        message: impl Into<String>,
        frames: Vec<String>,
    ) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if !self.pipeline.enabled {
            return;
        }
        let elapsed = self.start.elapsed();
        let exception = ExceptionInfo::new(kind, message)
            .with_stack_trace(frames, DEFAULT_STACK_FRAME_LIMIT);
        let event = TraceEvent {
            timestamp: now_millis(),
            event: EventKind::Exception,
            thread: self.thread.clone(),
            class: self.class.clone(),
            method: self.method.clone(),
            args: Some(self.args_text.clone()),
            result: None,
            exception: Some(exception),
            duration_micros: Some(i64::try_from(elapsed.as_micros()).unwrap_or(i64::MAX)),
            duration_millis: Some(i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)),
            truncated_fields: None,
            full_log_file: None,
        };
        self.pipeline.emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(dir: &std::path::Path) -> EffectiveConfig {
        EffectiveConfig {
            logfile: dir.join("flowtrace.jsonl").to_string_lossy().to_string(),
            segment_directory: dir.join("segs").to_string_lossy().to_string(),
            ..EffectiveConfig::default()
        }
    }

    fn read_lines(path: &std::path::Path) -> Vec<serde_json::Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn simple_call_emits_enter_then_exit_with_duration() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::from_config(&config(dir.path())).unwrap();

        let ctx = pipeline.enter(
            "main",
            "",
            "add",
            &[
                ("x".to_string(), Value::Number(5.0)),
                ("y".to_string(), Value::Number(3.0)),
            ],
        );
        ctx.exit(&[("result_0".to_string(), Value::Number(8.0))]);

        let lines = read_lines(std::path::Path::new(&config(dir.path()).logfile));
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "ENTER");
        assert_eq!(lines[0]["args"], "[5.0,3.0]");
        assert_eq!(lines[1]["event"], "EXIT");
        assert_eq!(lines[1]["args"], "[5.0,3.0]", "EXIT repeats the same args ENTER carried");
        assert_eq!(lines[1]["result"], "8.0");
        assert!(lines[1]["durationMicros"].as_i64().unwrap() >= 0);
    }

    #[test]
    fn exception_path_emits_enter_then_exception_no_exit() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::from_config(&config(dir.path())).unwrap();

        let ctx = pipeline.enter(
            "main",
            "",
            "divide",
            &[
                ("a".to_string(), Value::Number(10.0)),
                ("b".to_string(), Value::Number(0.0)),
            ],
        );
        ctx.exception("ZeroDivisionError", "Division by zero");

        let lines = read_lines(std::path::Path::new(&config(dir.path()).logfile));
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["event"], "EXCEPTION");
        assert_eq!(lines[1]["args"], "[10.0,0.0]", "EXCEPTION repeats the ENTER args too");
        assert_eq!(lines[1]["exception"]["message"], "Division by zero");
        assert!(lines[1].get("result").is_none());
    }

    #[test]
    fn closing_twice_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::from_config(&config(dir.path())).unwrap();

        let ctx = pipeline.enter("main", "", "f", &[]);
        ctx.exit(&[("result_0".to_string(), Value::Number(1.0))]);
        ctx.exit(&[("result_0".to_string(), Value::Number(2.0))]);
        ctx.exception("E", "should be ignored");

        let lines = read_lines(std::path::Path::new(&config(dir.path()).logfile));
        assert_eq!(lines.len(), 2, "only the first close should emit");
        assert_eq!(lines[1]["result"], "1.0");
    }

    #[test]
    fn disabled_pipeline_emits_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path());
        cfg.enabled = false;
        let pipeline = Pipeline::from_config(&cfg).unwrap();

        let ctx = pipeline.enter("main", "", "f", &[]);
        ctx.exit(&[]);

        assert!(!std::path::Path::new(&cfg.logfile).exists());
    }

    #[test]
    fn oversize_result_is_segmented_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path());
        cfg.truncate_threshold = 1000;
        let pipeline = Pipeline::from_config(&cfg).unwrap();

        let long = Value::Str("x".repeat(5000));
        let ctx = pipeline.enter("main", "Logger", "log_message", &[("msg".into(), long)]);
        ctx.exit(&[("result_0".to_string(), Value::Null)]);

        let lines = read_lines(std::path::Path::new(&cfg.logfile));
        let enter = &lines[0];
        assert!(enter["args"].as_str().unwrap().len() < 1200);
        assert!(enter["truncatedFields"]["args"]["originalLength"]
            .as_u64()
            .unwrap()
            > 1000);
        let full_log_file = enter["fullLogFile"].as_str().unwrap();
        assert!(std::path::Path::new(&cfg.segment_directory).join(
            std::path::Path::new(full_log_file).file_name().unwrap()
        ).exists());
    }
}
