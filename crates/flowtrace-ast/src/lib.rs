//! The AST Rewriter (§4.1): given a parsed source function in a host
//! language, produce a semantically equivalent function wrapped by a
//! standard ENTER/EXIT/EXCEPTION prologue and epilogue.
//!
//! The original FlowTrace instruments concrete host-language parse trees
//! (Python's `ast`, TypeScript's `ts.Node`, Go's `go/ast`, ...). This
//! crate operates one level of abstraction up, over a generic
//! [`FunctionIr`]: a tree of statements and expressions sufficient to
//! express every edge case spec.md enumerates (named/unnamed returns,
//! nested conditionals/loops/switches/labeled blocks, nested function
//! literals, variadics). A concrete host binding builds a `FunctionIr`
//! from that language's parse tree; none ships here (Non-goal, §1).

pub mod ir;
pub mod rewriter;

pub use ir::{Expr, FunctionDecl, Param, Stmt};
pub use rewriter::{RewrittenFile, TransformError, rewrite_file, rewrite_function};
