//! Per-function and per-file transform (§4.1).

use std::collections::HashSet;

use thiserror::Error;

use flowtrace_selectors::SelectionPolicy;

use crate::ir::{Expr, FunctionDecl, Param, Stmt};

/// A rewrite failure on one function (or, at file granularity, the whole
/// file). Degrades to skipping the function/file per §7; never aborts the
/// rest of the batch.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("unsupported construct in {function}: {reason}")]
    UnsupportedConstruct { function: String, reason: String },
    /// A non-bare `return` whose expression count doesn't match the
    /// declared return arity: the rewriter has no named-return slot to
    /// assign a given expression into, so splitting it into
    /// `name = expr; return` would either drop values or assign past the
    /// end of `named_returns` (§8 "Semantic preservation").
    #[error(
        "return arity mismatch in {function}: expected {expected} values, found a return with {found}"
    )]
    ReturnArityMismatch {
        function: String,
        expected: usize,
        found: usize,
    },
}

/// One captured call-site argument: the parameter name (or `"receiver"`
/// for a method receiver, or the variadic param's own name collapsed to
/// a single array-valued entry) paired with its expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedArg {
    pub name: String,
    pub expr: Expr,
}

/// The prologue's first statement: open a Call Context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnterCall {
    pub unit: String,
    pub function: String,
    pub args: Vec<CapturedArg>,
}

/// A function after rewriting: the prologue's enter call, the
/// (return-rewritten) original body, and the epilogue's named returns to
/// emit on EXIT. The exception catcher is implicit -- every rewritten
/// function installs one, ordered (per §4.1) after the Call Context opens
/// and before the EXIT deferral finalizes, so it observes exceptions
/// before EXIT would.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenFunction {
    pub original_name: String,
    pub enter_call: EnterCall,
    pub body: Vec<Stmt>,
    pub named_returns: Vec<String>,
    pub required_imports: Vec<String>,
}

const RESERVED_PREFIX: &str = "__ft_ret";

/// Assign collision-free names to every unnamed return position listed in
/// `decl.returns`. Already-named positions are left untouched.
fn synthesize_named_returns(decl: &FunctionDecl) -> Vec<String> {
    let taken: HashSet<&str> = decl
        .existing_identifiers
        .iter()
        .map(String::as_str)
        .chain(decl.returns.iter().filter_map(|r| r.as_deref()))
        .collect();

    let mut names = Vec::with_capacity(decl.returns.len());
    let mut next_index = 0usize;
    for existing in &decl.returns {
        if let Some(name) = existing {
            names.push(name.clone());
            continue;
        }
        loop {
            let candidate = format!("{RESERVED_PREFIX}{next_index}");
            next_index += 1;
            if !taken.contains(candidate.as_str()) && !names.contains(&candidate) {
                names.push(candidate);
                break;
            }
        }
    }
    names
}

/// Recursively rewrite `return <exprs>` into an assignment to the named
/// returns followed by a bare return, descending into every nested block
/// form §4.1 names, but never into a nested function literal.
fn rewrite_returns(stmts: Vec<Stmt>, named_returns: &[String]) -> Vec<Stmt> {
    stmts
        .into_iter()
        .map(|stmt| rewrite_return_stmt(stmt, named_returns))
        .collect()
}

fn rewrite_return_stmt(stmt: Stmt, named_returns: &[String]) -> Stmt {
    match stmt {
        Stmt::Return(exprs) => {
            let mut out = Vec::new();
            for (name, expr) in named_returns.iter().zip(exprs.iter()) {
                out.push(Stmt::Other(format!("{name} = {expr}")));
            }
            out.push(Stmt::Return(Vec::new()));
            Stmt::Block(out)
        }
        Stmt::Other(s) => Stmt::Other(s),
        Stmt::Block(body) => Stmt::Block(rewrite_returns(body, named_returns)),
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => Stmt::If {
            cond,
            then_branch: rewrite_returns(then_branch, named_returns),
            else_branch: rewrite_returns(else_branch, named_returns),
        },
        Stmt::Loop { body } => Stmt::Loop {
            body: rewrite_returns(body, named_returns),
        },
        Stmt::Switch { discriminant, cases } => Stmt::Switch {
            discriminant,
            cases: cases
                .into_iter()
                .map(|c| rewrite_returns(c, named_returns))
                .collect(),
        },
        Stmt::Select { cases } => Stmt::Select {
            cases: cases
                .into_iter()
                .map(|c| rewrite_returns(c, named_returns))
                .collect(),
        },
        Stmt::Labeled { label, body } => Stmt::Labeled {
            label,
            body: rewrite_returns(body, named_returns),
        },
        // Never recurse into a nested function literal: its `return`s
        // belong to it, not to the enclosing function being rewritten.
        Stmt::FunctionLiteral { body } => Stmt::FunctionLiteral { body },
    }
}

/// Walk every `return` reachable without crossing into a nested function
/// literal (the same traversal `rewrite_returns` makes) and check its
/// expression count is either zero (a bare return) or exactly `expected`.
/// Returns the first mismatch found, if any.
fn find_arity_mismatch(stmts: &[Stmt], expected: usize) -> Option<usize> {
    for stmt in stmts {
        let found = match stmt {
            Stmt::Return(exprs) if !exprs.is_empty() && exprs.len() != expected => {
                Some(exprs.len())
            }
            Stmt::Return(_) | Stmt::Other(_) | Stmt::FunctionLiteral { .. } => None,
            Stmt::Block(body) | Stmt::Loop { body } => find_arity_mismatch(body, expected),
            Stmt::If { then_branch, else_branch, .. } => {
                find_arity_mismatch(then_branch, expected)
                    .or_else(|| find_arity_mismatch(else_branch, expected))
            }
            Stmt::Switch { cases, .. } | Stmt::Select { cases } => {
                cases.iter().find_map(|c| find_arity_mismatch(c, expected))
            }
            Stmt::Labeled { body, .. } => find_arity_mismatch(body, expected),
        };
        if found.is_some() {
            return found;
        }
    }
    None
}

/// Build the ordered argument-capture list: receiver under `"receiver"`,
/// a variadic parameter collapsed to one array-valued entry, all others
/// by parameter name in declaration order.
fn capture_args(params: &[Param]) -> Vec<CapturedArg> {
    params
        .iter()
        .map(|p| {
            let name = if p.is_receiver {
                "receiver".to_string()
            } else {
                p.name.clone()
            };
            let expr = if p.is_variadic {
                Expr::Call {
                    callee: "__ft_array".to_string(),
                    args: vec![Expr::Ident(p.name.clone())],
                }
            } else {
                Expr::Ident(p.name.clone())
            };
            CapturedArg { name, expr }
        })
        .collect()
}

const REQUIRED_IMPORTS: &[&str] = &[
    "flowtrace::logger",
    "flowtrace::formatter",
    "flowtrace::exception_conversion",
];

/// Rewrite one function. Returns `Ok(None)` when the function is skipped
/// (bodyless, compiler-generated, init/test entry, or rejected by the
/// Selection Policy) -- not an error, just nothing to do. Returns
/// `Err(TransformError)` when the body contains a construct the rewriter
/// cannot faithfully handle; the caller degrades this to "leave the
/// function untouched".
pub fn rewrite_function(
    decl: &FunctionDecl,
    unit: &str,
    policy: &SelectionPolicy,
) -> Result<Option<RewrittenFunction>, TransformError> {
    if !decl.has_body || decl.is_compiler_generated || decl.is_init_or_test_entry {
        return Ok(None);
    }
    let candidate = if unit.is_empty() {
        decl.name.clone()
    } else {
        format!("{unit}::{}", decl.name)
    };
    if !policy.accepts(&candidate) {
        return Ok(None);
    }

    if let Some(found) = find_arity_mismatch(&decl.body, decl.returns.len()) {
        return Err(TransformError::ReturnArityMismatch {
            function: decl.name.clone(),
            expected: decl.returns.len(),
            found,
        });
    }

    let named_returns = synthesize_named_returns(decl);
    let body = rewrite_returns(decl.body.clone(), &named_returns);
    let enter_call = EnterCall {
        unit: unit.to_string(),
        function: decl.name.clone(),
        args: capture_args(&decl.params),
    };

    Ok(Some(RewrittenFunction {
        original_name: decl.name.clone(),
        enter_call,
        body,
        named_returns,
        required_imports: REQUIRED_IMPORTS.iter().map(|s| (*s).to_string()).collect(),
    }))
}

/// The result of rewriting a whole file: every function that was
/// actually transformed, the names of functions skipped (by policy or
/// structurally), the names of functions that failed and were left
/// untouched, and the reconciled (deduplicated) import set.
#[derive(Debug, Clone, Default)]
pub struct RewrittenFile {
    pub transformed: Vec<RewrittenFunction>,
    pub skipped: Vec<String>,
    pub failed: Vec<(String, TransformError)>,
    pub imports: Vec<String>,
}

/// Rewrite every function in a file. A function-level `TransformError`
/// degrades to skipping that function; it never removes imports other,
/// successful transforms still require (§4.1 "Failure semantics").
pub fn rewrite_file(
    functions: &[FunctionDecl],
    unit: &str,
    policy: &SelectionPolicy,
) -> RewrittenFile {
    let mut out = RewrittenFile::default();
    let mut import_set: Vec<String> = Vec::new();

    for decl in functions {
        match rewrite_function(decl, unit, policy) {
            Ok(Some(rewritten)) => {
                for import in &rewritten.required_imports {
                    if !import_set.contains(import) {
                        import_set.push(import.clone());
                    }
                }
                out.transformed.push(rewritten);
            }
            Ok(None) => out.skipped.push(decl.name.clone()),
            Err(e) => out.failed.push((decl.name.clone(), e)),
        }
    }
    out.imports = import_set;
    out
}
