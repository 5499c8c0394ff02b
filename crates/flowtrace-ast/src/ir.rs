//! `FunctionIr`: the generic function representation the rewriter
//! operates over.

/// A bare expression. Kept intentionally shallow -- the rewriter only
/// needs to read/replace return expressions and reference identifiers
/// for named-return synthesis, never to evaluate them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Ident(String),
    Literal(String),
    Call { callee: String, args: Vec<Expr> },
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ident(name) => f.write_str(name),
            Self::Literal(text) => f.write_str(text),
            Self::Call { callee, args } => {
                write!(f, "{callee}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// One parameter of a function declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub is_receiver: bool,
    pub is_variadic: bool,
}

impl Param {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_receiver: false,
            is_variadic: false,
        }
    }

    #[must_use]
    pub fn receiver(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_receiver: true,
            is_variadic: false,
        }
    }

    #[must_use]
    pub fn variadic(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_receiver: false,
            is_variadic: true,
        }
    }
}

/// A statement in a function body. Deliberately covers exactly the
/// constructs §4.1 names as places `return` rewriting must recurse into:
/// conditionals, loops of each kind, switches and their cases, selects,
/// and labeled blocks -- plus the one place it must NOT recurse into, a
/// nested function literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    /// `return <expressions>`, zero or more (named returns may leave it
    /// empty -- a bare `return`).
    Return(Vec<Expr>),
    /// An arbitrary non-control-flow statement (assignment, expression
    /// statement, ...), opaque to the rewriter.
    Other(String),
    Block(Vec<Stmt>),
    If {
        cond: Expr,
        then_branch: Vec<Stmt>,
        else_branch: Vec<Stmt>,
    },
    /// Covers `for`, `while`, and host-specific loop forms uniformly --
    /// the rewriter only needs to know "this is a loop body to recurse
    /// into", not which kind.
    Loop { body: Vec<Stmt> },
    Switch {
        discriminant: Expr,
        cases: Vec<Vec<Stmt>>,
    },
    /// Go-style `select` over channel operations; treated identically to
    /// `Switch` for return-rewriting purposes.
    Select { cases: Vec<Vec<Stmt>> },
    Labeled { label: String, body: Vec<Stmt> },
    /// A nested function/closure literal. The rewriter must not confuse a
    /// `return` inside here with one belonging to the enclosing function
    /// (§4.1 point 3) -- so it never descends into this variant's body.
    FunctionLiteral { body: Vec<Stmt> },
}

/// A function declaration as the rewriter sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDecl {
    pub name: String,
    /// The enclosing unit (type/module/package); empty for free functions.
    pub class: String,
    pub params: Vec<Param>,
    /// `None` entries are unnamed return positions the rewriter must name;
    /// `Some(name)` entries are already-named returns left untouched.
    pub returns: Vec<Option<String>>,
    pub body: Vec<Stmt>,
    /// Bodyless declarations (interface/abstract/extern methods) are
    /// skipped by the rewriter regardless of Selection Policy.
    pub has_body: bool,
    /// Identifiers already bound somewhere in the function, used to keep
    /// synthesized names collision-free.
    pub existing_identifiers: Vec<String>,
    pub is_compiler_generated: bool,
    pub is_init_or_test_entry: bool,
}

impl FunctionDecl {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            class: String::new(),
            params: Vec::new(),
            returns: Vec::new(),
            body: Vec::new(),
            has_body: true,
            existing_identifiers: Vec::new(),
            is_compiler_generated: false,
            is_init_or_test_entry: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_renders_ident_and_literal_verbatim() {
        assert_eq!(Expr::Ident("x".to_string()).to_string(), "x");
        assert_eq!(Expr::Literal("1".to_string()).to_string(), "1");
    }

    #[test]
    fn display_renders_call_as_callee_and_comma_joined_args() {
        let expr = Expr::Call {
            callee: "foo".to_string(),
            args: vec![Expr::Ident("a".to_string()), Expr::Literal("2".to_string())],
        };
        assert_eq!(expr.to_string(), "foo(a, 2)");
    }

    #[test]
    fn display_renders_nested_calls() {
        let expr = Expr::Call {
            callee: "outer".to_string(),
            args: vec![Expr::Call {
                callee: "inner".to_string(),
                args: vec![],
            }],
        };
        assert_eq!(expr.to_string(), "outer(inner())");
    }
}
