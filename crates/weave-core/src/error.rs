//! Error types for every phase of template compilation.
//!
//! ## Error Hierarchy
//!
//! ```text
//! CompileError (top-level wrapper)
//! ├── SyntaxError      - structural misuse found while normalizing
//! ├── ResolutionError  - a free name with no applicable lookup rule
//! ├── LinkError        - the resolver could not find a named definition
//! └── EncoderError     - internal inconsistencies in the emitted program
//! ```
//!
//! Syntax and resolution errors are always raised eagerly by the normalizer.
//! Link errors are raised immediately by macros that resolve eagerly, or
//! collected by the encoder for deferred lookups. Encoder errors indicate a
//! compiler bug rather than bad input.

use std::fmt;

use thiserror::Error;

use crate::Span;

// ============================================================================
// Syntax Errors
// ============================================================================

/// Categories of structural template errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxErrorKind {
    /// A built-in construct received the wrong number or shape of arguments.
    KeywordArity,
    /// A literal was used as the callee of an invocation with arguments.
    LiteralCallee,
    /// Two named blocks with the same name were passed to one component.
    DuplicateNamedBlock,
    /// A named block appeared somewhere other than directly inside a component.
    NamedBlockPosition,
    /// Named blocks were mixed with other content.
    MixedNamedBlocks,
    /// An `@argument` was placed on a plain element.
    ArgumentOnElement,
    /// Block parameters were declared on a plain element.
    BlockParamsOnElement,
    /// A component tag was not in scope in strict mode.
    ComponentNotInScope,
    /// The same block parameter name was declared twice.
    DuplicateBlockParam,
}

impl SyntaxErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyntaxErrorKind::KeywordArity => "invalid keyword arguments",
            SyntaxErrorKind::LiteralCallee => "literal used as callee",
            SyntaxErrorKind::DuplicateNamedBlock => "duplicate named block",
            SyntaxErrorKind::NamedBlockPosition => "misplaced named block",
            SyntaxErrorKind::MixedNamedBlocks => "named blocks mixed with content",
            SyntaxErrorKind::ArgumentOnElement => "argument on element",
            SyntaxErrorKind::BlockParamsOnElement => "block params on element",
            SyntaxErrorKind::ComponentNotInScope => "component not in scope",
            SyntaxErrorKind::DuplicateBlockParam => "duplicate block param",
        }
    }
}

impl fmt::Display for SyntaxErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structural error detected while normalizing a template.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} at {span}: {message}")]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    pub span: Span,
    pub message: String,
}

impl SyntaxError {
    pub fn new(kind: SyntaxErrorKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            message: message.into(),
        }
    }

    /// A built-in construct was called with the wrong arguments.
    ///
    /// `requirement` completes the sentence "`name` requires ...".
    pub fn keyword_arity(keyword: &str, span: Span, requirement: &str) -> Self {
        Self::new(
            SyntaxErrorKind::KeywordArity,
            span,
            format!("`{keyword}` requires {requirement}"),
        )
    }

    pub fn literal_callee(literal: &str, span: Span) -> Self {
        Self::new(
            SyntaxErrorKind::LiteralCallee,
            span,
            format!("cannot invoke the literal {literal} with arguments"),
        )
    }
}

// ============================================================================
// Resolution Errors
// ============================================================================

/// A free variable appeared in a position with no loose-mode lookup rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "at {span}: `{path}` cannot be resolved in {position} position because `{head}` is not in scope"
)]
pub struct ResolutionError {
    /// The unbound head of the path.
    pub head: String,
    /// The full path as written.
    pub path: String,
    /// Human-readable name of the syntactic position.
    pub position: &'static str,
    pub span: Span,
}

// ============================================================================
// Link Errors
// ============================================================================

/// What a name was expected to resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupKind {
    Component,
    Helper,
    Modifier,
    ComponentOrHelper,
    /// A strict-mode binding supplied by the embedder's lexical scope.
    Lexical,
}

impl LookupKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LookupKind::Component => "component",
            LookupKind::Helper => "helper",
            LookupKind::Modifier => "modifier",
            LookupKind::ComponentOrHelper => "component or helper",
            LookupKind::Lexical => "lexical binding",
        }
    }
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The resolver could not find a named definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("at {span}: could not find a {kind} named `{name}`")]
pub struct LinkError {
    pub name: String,
    pub kind: LookupKind,
    pub span: Span,
}

impl LinkError {
    pub fn new(name: impl Into<String>, kind: LookupKind, span: Span) -> Self {
        Self {
            name: name.into(),
            kind,
            span,
        }
    }
}

// ============================================================================
// Encoder Errors
// ============================================================================

/// Internal consistency failures while assembling bytecode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncoderError {
    /// More operands than the instruction header can describe.
    #[error("`{opcode}` was given {count} operands, the limit is 3")]
    OperandOverflow { opcode: &'static str, count: usize },

    /// The operand count does not match the instruction's fixed arity.
    #[error("`{opcode}` takes {expected} operands but was given {found}")]
    ArityMismatch {
        opcode: &'static str,
        expected: usize,
        found: usize,
    },

    /// `stop_labels` without `start_labels`, or a commit with open label scopes.
    #[error("unbalanced label scopes ({open} still open)")]
    UnbalancedLabels { open: usize },

    /// A jump targets a label that was never placed in its scope.
    #[error("label `{name}` was targeted but never defined")]
    MissingLabel { name: String },

    /// An immediate operand that would collide with the constant tag.
    #[error("`{opcode}` immediate {value} is outside the encodable range")]
    ImmediateOutOfRange { opcode: &'static str, value: i32 },

    /// A label operand was used outside of any label scope.
    #[error("label `{name}` was used outside of a label scope")]
    LabelOutsideScope { name: String },

    /// The standard library was referenced before it was compiled.
    #[error("standard library routine `{name}` is not available yet")]
    MissingStdlib { name: &'static str },
}

// ============================================================================
// Top-level Error
// ============================================================================

/// Any error produced while turning a template into bytecode.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error("internal compiler error: {0}")]
    Internal(#[from] EncoderError),
}

impl CompileError {
    pub fn is_syntax(&self) -> bool {
        matches!(self, CompileError::Syntax(_))
    }

    pub fn is_resolution(&self) -> bool {
        matches!(self, CompileError::Resolution(_))
    }

    pub fn is_link(&self) -> bool {
        matches!(self, CompileError::Link(_))
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, CompileError::Internal(_))
    }

    /// The source location of the error, when it has one.
    pub fn span(&self) -> Option<Span> {
        match self {
            CompileError::Syntax(e) => Some(e.span),
            CompileError::Resolution(e) => Some(e.span),
            CompileError::Link(e) => Some(e.span),
            CompileError::Internal(_) => None,
        }
    }
}
