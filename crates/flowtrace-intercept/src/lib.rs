//! The Runtime Interceptor (§4.2): hooks a host's module-loading
//! primitive and wraps exported callables in place so ENTER/EXIT and
//! EXCEPTION events are emitted without touching the target's source.
//!
//! Generalizes over any concrete host object model via [`export`]'s
//! `LoadedModule`/`Export` pair, the same "operate one level up" move
//! `flowtrace-ast` makes with `FunctionIr`.

pub mod export;

use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use tracing::debug;

use flowtrace_pipeline::Pipeline;
use flowtrace_selectors::SelectionPolicy;

pub use export::{
    AsyncOutcome, Callable, CallOutcome, Export, FunctionExport, LoadedModule, TypeExport,
    RESERVED_METHOD_NAMES,
};

/// The process-wide Runtime Interceptor. Holds the `Pipeline` every
/// wrapped call emits through, the Selection Policy that decides which
/// newly loaded modules are worth wrapping, and the set of modules
/// already wrapped, keyed by path (§4.2 "records the set of already-
/// wrapped modules to guarantee idempotence").
pub struct Interceptor {
    pipeline: &'static Pipeline,
    policy: SelectionPolicy,
    wrapped: DashMap<String, LoadedModule>,
}

static INTERCEPTOR: OnceLock<Interceptor> = OnceLock::new();

impl Interceptor {
    /// Install the interceptor for this process. A second call is a
    /// no-op that returns the handle from the first installation
    /// unchanged (§4.2 "Installs itself once per process; refuses
    /// second install.") -- `pipeline`/`policy` passed to a later call
    /// are simply dropped.
    pub fn install(pipeline: Pipeline, policy: SelectionPolicy) -> &'static Interceptor {
        INTERCEPTOR.get_or_init(|| {
            debug!(target: "flowtrace::intercept", "installing runtime interceptor");
            Interceptor {
                pipeline: Box::leak(Box::new(pipeline)),
                policy,
                wrapped: DashMap::new(),
            }
        })
    }

    /// Whether an interceptor has already been installed in this
    /// process.
    #[must_use]
    pub fn installed() -> bool {
        INTERCEPTOR.get().is_some()
    }

    /// Build a standalone `Interceptor` outside the process-wide
    /// singleton, for exercising wrapping behavior against an isolated
    /// `Pipeline` in tests without tripping over `install`'s
    /// once-per-process rule.
    #[cfg(test)]
    fn for_test(pipeline: Pipeline, policy: SelectionPolicy) -> Self {
        Interceptor {
            pipeline: Box::leak(Box::new(pipeline)),
            policy,
            wrapped: DashMap::new(),
        }
    }

    /// The module-load hook: called by a host binding every time its
    /// loader resolves a module. Modules outside the Selection Policy
    /// pass through untouched; a module already wrapped is returned
    /// from the idempotence cache rather than wrapped a second time,
    /// which is what makes this safe under concurrent producers
    /// loading the same module (§4.2, §8 install idempotence).
    pub fn on_module_loaded(&self, module: LoadedModule) -> LoadedModule {
        if let Some(existing) = self.wrapped.get(&module.path) {
            return existing.clone();
        }
        if !self.policy.accepts(&module.path) {
            return module;
        }
        let wrapped = wrap_module(self.pipeline, module);
        self.wrapped.insert(wrapped.path.clone(), wrapped.clone());
        wrapped
    }

    /// Apply the same wrapping rules to an entry-point module's
    /// top-level declarations (§4.2's last bullet), without going
    /// through the idempotence cache -- an entry point is compiled
    /// exactly once per process by construction.
    #[must_use]
    pub fn instrument_entry_point(&self, module: LoadedModule) -> LoadedModule {
        wrap_module(self.pipeline, module)
    }
}

fn wrap_module(pipeline: &'static Pipeline, module: LoadedModule) -> LoadedModule {
    let exports = module
        .exports
        .into_iter()
        .map(|(name, export)| (name.clone(), wrap_export(pipeline, "", &name, export)))
        .collect();
    LoadedModule { path: module.path, exports }
}

/// Wrap one export per §4.2's rule for its kind. `class` is the
/// enclosing type's name for a method, or empty for a bare function.
fn wrap_export(pipeline: &'static Pipeline, class: &str, name: &str, export: Export) -> Export {
    match export {
        Export::Function(f) => Export::Function(wrap_function(pipeline, class, &f.name, f.call)),
        Export::Type(t) => {
            let methods = t
                .methods
                .into_iter()
                .map(|m| {
                    if RESERVED_METHOD_NAMES.contains(&m.name.as_str()) {
                        m
                    } else {
                        wrap_function(pipeline, &t.name, &m.name, m.call)
                    }
                })
                .collect();
            Export::Type(TypeExport { name: t.name, methods })
        }
        // A plain record recurses exactly one level (§4.2): its own
        // fields are wrapped by kind, but a nested record field is left
        // as-is rather than recursed into again.
        Export::Record(fields) => Export::Record(
            fields
                .into_iter()
                .map(|(field_name, value)| {
                    let wrapped = match value {
                        Export::Record(inner) => Export::Record(inner),
                        other => wrap_export(pipeline, class, &field_name, other),
                    };
                    (field_name, wrapped)
                })
                .collect(),
        ),
    }
}

/// Wrap one callable: forwards every argument unchanged, observes the
/// return (direct or pending), and emits ENTER plus EXIT/EXCEPTION
/// around the call (§4.2).
fn wrap_function(pipeline: &'static Pipeline, class: &str, name: &str, inner: Callable) -> FunctionExport {
    let class = class.to_string();
    let name = name.to_string();
    let wrapped_name = name.clone();

    let call: Callable = Arc::new(move |args: Vec<flowtrace_pipeline::Value>| -> CallOutcome {
        let named: Vec<(String, flowtrace_pipeline::Value)> = args
            .iter()
            .cloned()
            .enumerate()
            .map(|(i, v)| (format!("arg{i}"), v))
            .collect();
        let ctx = pipeline.enter("main", class.clone(), name.clone(), &named);

        match inner(args) {
            CallOutcome::Value(value) => {
                ctx.exit(&[("result_0".to_string(), value.clone())]);
                CallOutcome::Value(value)
            }
            CallOutcome::Pending(fut) => {
                let chained: AsyncOutcome = Box::pin(async move {
                    match fut.await {
                        Ok(value) => {
                            ctx.exit(&[("result_0".to_string(), value.clone())]);
                            Ok(value)
                        }
                        Err(err) => {
                            let message = match &err {
                                flowtrace_pipeline::Value::Str(s) => s.clone(),
                                flowtrace_pipeline::Value::Error { message } => message.clone(),
                                other => format!("{other:?}"),
                            };
                            ctx.exception("Rejected", message);
                            Err(err)
                        }
                    }
                });
                CallOutcome::Pending(chained)
            }
        }
    });

    FunctionExport::new(wrapped_name, call)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use flowtrace_config::EffectiveConfig;
    use flowtrace_pipeline::Value;
    use flowtrace_selectors::SelectionPolicy;
    use flowtrace_types::SelectionPolicyConfig;

    fn pipeline(dir: &std::path::Path) -> Pipeline {
        let config = EffectiveConfig {
            logfile: dir.join("flowtrace.jsonl").to_string_lossy().to_string(),
            segment_directory: dir.join("segs").to_string_lossy().to_string(),
            ..EffectiveConfig::default()
        };
        Pipeline::from_config(&config).unwrap()
    }

    fn open_policy() -> SelectionPolicy {
        SelectionPolicy::compile(&SelectionPolicyConfig::default()).unwrap()
    }

    fn read_lines(path: &std::path::Path) -> Vec<serde_json::Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    fn sync_module() -> LoadedModule {
        let call: Callable = Arc::new(|args: Vec<Value>| {
            let Some(Value::Number(n)) = args.first() else {
                return CallOutcome::Value(Value::Null);
            };
            CallOutcome::Value(Value::Number(n + 1.0))
        });
        LoadedModule::new(
            "app/math.rs",
            vec![("increment".to_string(), Export::Function(FunctionExport::new("increment", call)))],
        )
    }

    #[test]
    fn wrapping_preserves_the_callable_contract() {
        let dir = tempfile::tempdir().unwrap();
        let interceptor = Interceptor::for_test(pipeline(dir.path()), open_policy());

        let wrapped = interceptor.on_module_loaded(sync_module());
        let Export::Function(increment) = &wrapped.exports[0].1 else {
            panic!("expected a function export");
        };
        let outcome = (increment.call)(vec![Value::Number(41.0)]);
        assert!(matches!(outcome, CallOutcome::Value(Value::Number(n)) if n == 42.0));
    }

    #[test]
    fn wrapping_emits_enter_and_exit_around_the_call() {
        let dir = tempfile::tempdir().unwrap();
        let path = format!("{}-emits", dir.path().display());
        let interceptor = Interceptor::for_test(pipeline(dir.path()), open_policy());

        let mut module = sync_module();
        module.path = path;
        let wrapped = interceptor.on_module_loaded(module);
        let Export::Function(increment) = &wrapped.exports[0].1 else {
            panic!("expected a function export");
        };
        (increment.call)(vec![Value::Number(1.0)]);

        let config = EffectiveConfig {
            logfile: dir.path().join("flowtrace.jsonl").to_string_lossy().to_string(),
            ..EffectiveConfig::default()
        };
        let lines = read_lines(std::path::Path::new(&config.logfile));
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "ENTER");
        assert_eq!(lines[0]["method"], "increment");
        assert_eq!(lines[1]["event"], "EXIT");
    }

    #[test]
    fn reserved_method_names_are_not_wrapped() {
        let dir = tempfile::tempdir().unwrap();
        let interceptor = Interceptor::for_test(pipeline(dir.path()), open_policy());

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let ctor: Callable = Arc::new(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            CallOutcome::Value(Value::Null)
        });

        let module = LoadedModule::new(
            "app/widget.rs",
            vec![(
                "Widget".to_string(),
                Export::Type(TypeExport {
                    name: "Widget".to_string(),
                    methods: vec![FunctionExport::new("constructor", ctor)],
                }),
            )],
        );

        let wrapped = interceptor.on_module_loaded(module);
        let Export::Type(widget) = &wrapped.exports[0].1 else {
            panic!("expected a type export");
        };
        (widget.methods[0].call)(vec![]);
        assert_eq!(calls.load(Ordering::SeqCst), 1, "constructor still callable, just unwrapped");
    }

    #[test]
    fn module_loaded_twice_is_wrapped_only_once() {
        let dir = tempfile::tempdir().unwrap();
        let interceptor = Interceptor::for_test(pipeline(dir.path()), open_policy());

        let mut module = sync_module();
        module.path = format!("{}-twice", dir.path().display());
        let first = interceptor.on_module_loaded(module.clone());
        let second = interceptor.on_module_loaded(module);
        let Export::Function(a) = &first.exports[0].1 else { unreachable!() };
        let Export::Function(b) = &second.exports[0].1 else { unreachable!() };
        assert_eq!(Arc::as_ptr(&a.call), Arc::as_ptr(&b.call));
    }

    #[test]
    fn modules_rejected_by_selection_policy_pass_through_unwrapped() {
        let dir = tempfile::tempdir().unwrap();
        let policy = SelectionPolicy::compile(&SelectionPolicyConfig {
            include: vec![],
            exclude: vec!["**/vendor/**".to_string()],
            host: None,
        })
        .unwrap();
        let interceptor = Interceptor::for_test(pipeline(dir.path()), policy);

        let mut module = sync_module();
        module.path = "vendor/math.rs".to_string();
        let result = interceptor.on_module_loaded(module);
        let Export::Function(increment) = &result.exports[0].1 else {
            panic!("expected a function export");
        };
        let outcome = (increment.call)(vec![Value::Number(1.0)]);
        assert!(matches!(outcome, CallOutcome::Value(Value::Number(n)) if n == 2.0));

        let config = EffectiveConfig {
            logfile: dir.path().join("flowtrace.jsonl").to_string_lossy().to_string(),
            ..EffectiveConfig::default()
        };
        assert!(!std::path::Path::new(&config.logfile).exists());
    }

    #[tokio::test]
    async fn async_rejection_chains_to_exception() {
        let dir = tempfile::tempdir().unwrap();
        let path = format!("{}-async", dir.path().display());
        let interceptor = Interceptor::for_test(pipeline(dir.path()), open_policy());

        let call: Callable = Arc::new(|_args: Vec<Value>| {
            CallOutcome::Pending(Box::pin(async { Err(Value::Str("boom".to_string())) }))
        });
        let module = LoadedModule::new(
            path,
            vec![("fetch".to_string(), Export::Function(FunctionExport::new("fetch", call)))],
        );

        let wrapped = interceptor.on_module_loaded(module);
        let Export::Function(fetch) = &wrapped.exports[0].1 else {
            panic!("expected a function export");
        };
        let CallOutcome::Pending(fut) = (fetch.call)(vec![]) else {
            panic!("expected a pending outcome");
        };
        let result = fut.await;
        assert!(result.is_err());

        let config = EffectiveConfig {
            logfile: dir.path().join("flowtrace.jsonl").to_string_lossy().to_string(),
            ..EffectiveConfig::default()
        };
        let lines = read_lines(std::path::Path::new(&config.logfile));
        assert_eq!(lines.last().unwrap()["event"], "EXCEPTION");
    }

    #[test]
    fn install_is_idempotent_per_process() {
        let dir_a = tempfile::tempdir().unwrap();
        let first = Interceptor::install(pipeline(dir_a.path()), open_policy());

        let dir_b = tempfile::tempdir().unwrap();
        let second = Interceptor::install(pipeline(dir_b.path()), open_policy());

        assert!(std::ptr::eq(first, second), "second install must return the first handle");
        assert!(Interceptor::installed());
    }
}
