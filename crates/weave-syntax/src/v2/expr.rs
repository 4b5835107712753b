//! Normalized expressions.

use std::fmt;

use weave_core::Span;

use crate::keywords::Keyword;
use crate::resolution::FreeVarResolution;

/// Any value-producing node.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionNode {
    Literal(LiteralExpression),
    /// A variable reference followed by zero or more property lookups.
    Path(PathExpression),
    Call(CallExpression),
    /// `"a {{b}} c"` in attribute position.
    Interpolate(InterpolateExpression),
    /// A built-in construct used as a callee.
    Keyword(KeywordExpression),
    /// `(has-block "name")`
    HasBlock(HasBlockExpression),
    /// `(has-block-params "name")`
    HasBlockParams(HasBlockExpression),
}

impl ExpressionNode {
    pub fn span(&self) -> Span {
        match self {
            ExpressionNode::Literal(e) => e.span,
            ExpressionNode::Path(e) => e.span,
            ExpressionNode::Call(e) => e.span,
            ExpressionNode::Interpolate(e) => e.span,
            ExpressionNode::Keyword(e) => e.span,
            ExpressionNode::HasBlock(e) | ExpressionNode::HasBlockParams(e) => e.span,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, ExpressionNode::Literal(_))
    }

    /// The free variable this expression names directly, if it is a bare
    /// free reference with no property lookups.
    pub fn as_free(&self) -> Option<&FreeVarReference> {
        match self {
            ExpressionNode::Path(PathExpression {
                reference: VariableReference::Free(free),
                tail,
                ..
            }) if tail.is_empty() => Some(free),
            _ => None,
        }
    }

    /// The literal string value, for constructs that require one.
    pub fn as_string_literal(&self) -> Option<&str> {
        match self {
            ExpressionNode::Literal(LiteralExpression {
                value: LiteralValue::String(s),
                ..
            }) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiteralExpression {
    pub value: LiteralValue,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    String(String),
    Number(f64),
    Boolean(bool),
    Null,
    Undefined,
}

impl LiteralValue {
    /// The text produced when the literal is appended to the document.
    pub fn to_text(&self) -> String {
        match self {
            LiteralValue::String(s) => s.clone(),
            LiteralValue::Number(n) => n.to_string(),
            LiteralValue::Boolean(b) => b.to_string(),
            LiteralValue::Null | LiteralValue::Undefined => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathExpression {
    pub reference: VariableReference,
    pub tail: Vec<String>,
    pub span: Span,
}

/// What the head of a path refers to.
#[derive(Debug, Clone, PartialEq)]
pub enum VariableReference {
    /// The template's self, always slot 0.
    This,
    /// `@name`
    Arg { name: String, slot: u32 },
    /// A block parameter or template local.
    Local { name: String, slot: u32, is_root: bool },
    Free(FreeVarReference),
}

impl VariableReference {
    pub fn name(&self) -> &str {
        match self {
            VariableReference::This => "this",
            VariableReference::Arg { name, .. } | VariableReference::Local { name, .. } => name,
            VariableReference::Free(free) => &free.name,
        }
    }
}

/// A name that is not bound anywhere in the template.
#[derive(Debug, Clone, PartialEq)]
pub struct FreeVarReference {
    /// The upvar name, after any component-name customization.
    pub name: String,
    /// Index into the template's `upvars`.
    pub slot: u32,
    pub resolution: FreeVarResolution,
    pub span: Span,
}

impl fmt::Display for FreeVarReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.resolution)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallExpression {
    pub callee: Box<ExpressionNode>,
    pub args: Args,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterpolateExpression {
    pub parts: Vec<ExpressionNode>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeywordExpression {
    pub keyword: Keyword,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HasBlockExpression {
    /// Slot of the `&block` being queried.
    pub slot: u32,
    pub span: Span,
}

// ============================================================================
// Arguments
// ============================================================================

/// Positional and named arguments of an invocation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Args {
    pub positional: Vec<ExpressionNode>,
    pub named: Vec<NamedArgument>,
    pub span: Span,
}

impl Args {
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ExpressionNode> {
        self.named
            .iter()
            .find(|arg| arg.name == name)
            .map(|arg| &arg.value)
    }

    pub fn names(&self) -> Vec<String> {
        self.named.iter().map(|arg| arg.name.clone()).collect()
    }
}

/// `name=value`, or `@name={{value}}` on a component.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedArgument {
    pub name: String,
    pub value: ExpressionNode,
    /// `@name={{{value}}}` on a component.
    pub trusting: bool,
    pub span: Span,
}
