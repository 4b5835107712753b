//! The raw parse tree (ASTv1).
//!
//! This is the loosely-typed tree a parser hands to the normalizer. Nodes
//! are arena-allocated and borrow from the arena for `'ast`; identifiers are
//! raw strings that have not been classified yet. Every node carries a
//! [`Span`].
//!
//! Use [`Builder`] to construct trees without a parser.

mod builder;

pub use builder::{Builder, ElementBuilder};

use weave_core::Span;

/// A parsed template.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Template<'ast> {
    pub body: &'ast [Statement<'ast>],
    /// Block parameters declared by the template itself (`<template as |x|>`).
    pub block_params: &'ast [&'ast str],
    pub span: Span,
}

/// Top-level content.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Statement<'ast> {
    /// `{{path params hash}}` or `{{{path params hash}}}`
    Mustache(&'ast MustacheStatement<'ast>),
    /// `{{#path params hash}}...{{else}}...{{/path}}`
    Block(&'ast BlockStatement<'ast>),
    /// `<tag ...>...</tag>`
    Element(&'ast ElementNode<'ast>),
    /// Literal text.
    Text(TextNode<'ast>),
    /// `<!-- ... -->`
    Comment(CommentStatement<'ast>),
    /// `{{!-- ... --}}`
    MustacheComment(CommentStatement<'ast>),
}

impl Statement<'_> {
    pub fn span(&self) -> Span {
        match self {
            Statement::Mustache(m) => m.span,
            Statement::Block(b) => b.span,
            Statement::Element(e) => e.span,
            Statement::Text(t) => t.span,
            Statement::Comment(c) | Statement::MustacheComment(c) => c.span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MustacheStatement<'ast> {
    pub path: Expression<'ast>,
    pub params: &'ast [Expression<'ast>],
    pub hash: Hash<'ast>,
    /// `{{{ }}}` appends without escaping.
    pub trusting: bool,
    pub span: Span,
}

impl MustacheStatement<'_> {
    pub fn has_args(&self) -> bool {
        !self.params.is_empty() || !self.hash.pairs.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockStatement<'ast> {
    pub path: Expression<'ast>,
    pub params: &'ast [Expression<'ast>],
    pub hash: Hash<'ast>,
    pub program: Block<'ast>,
    pub inverse: Option<Block<'ast>>,
    pub span: Span,
}

/// The body of a block statement or named block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block<'ast> {
    pub body: &'ast [Statement<'ast>],
    pub block_params: &'ast [&'ast str],
    /// True for `{{else if ...}}` chains.
    pub chained: bool,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementNode<'ast> {
    pub tag: &'ast str,
    pub attributes: &'ast [AttrNode<'ast>],
    pub modifiers: &'ast [ElementModifier<'ast>],
    pub children: &'ast [Statement<'ast>],
    pub block_params: &'ast [&'ast str],
    pub self_closing: bool,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttrNode<'ast> {
    pub name: &'ast str,
    pub value: AttrValue<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttrValue<'ast> {
    /// `name="text"` or a valueless attribute.
    Text(TextNode<'ast>),
    /// `name={{expr}}`
    Mustache(&'ast MustacheStatement<'ast>),
    /// `name="a {{b}} c"`
    Concat(&'ast [ConcatPart<'ast>], Span),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConcatPart<'ast> {
    Text(TextNode<'ast>),
    Mustache(&'ast MustacheStatement<'ast>),
}

/// `{{modifier params hash}}` inside an element's opening tag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementModifier<'ast> {
    pub path: Expression<'ast>,
    pub params: &'ast [Expression<'ast>],
    pub hash: Hash<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextNode<'ast> {
    pub chars: &'ast str,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommentStatement<'ast> {
    pub value: &'ast str,
    pub span: Span,
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Expression<'ast> {
    Path(PathExpression<'ast>),
    SubExpression(&'ast SubExpression<'ast>),
    Literal(Literal<'ast>),
}

impl Expression<'_> {
    pub fn span(&self) -> Span {
        match self {
            Expression::Path(p) => p.span,
            Expression::SubExpression(s) => s.span,
            Expression::Literal(l) => l.span,
        }
    }
}

/// `head.tail.tail`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathExpression<'ast> {
    pub head: PathHead<'ast>,
    pub tail: &'ast [&'ast str],
    pub span: Span,
}

impl<'ast> PathExpression<'ast> {
    /// The bare variable name when the path is a single unqualified identifier.
    pub fn as_simple_var(&self) -> Option<&'ast str> {
        match self.head {
            PathHead::Var(name) if self.tail.is_empty() => Some(name),
            _ => None,
        }
    }

    /// The path as it was written in the source.
    pub fn original(&self) -> String {
        let mut out = match self.head {
            PathHead::This => "this".to_string(),
            PathHead::AtName(name) => format!("@{name}"),
            PathHead::Var(name) => name.to_string(),
        };
        for segment in self.tail {
            out.push('.');
            out.push_str(segment);
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathHead<'ast> {
    This,
    /// `@name`, stored without the sigil.
    AtName(&'ast str),
    Var(&'ast str),
}

/// `(path params hash)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubExpression<'ast> {
    pub path: Expression<'ast>,
    pub params: &'ast [Expression<'ast>],
    pub hash: Hash<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Literal<'ast> {
    pub value: LiteralValue<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LiteralValue<'ast> {
    String(&'ast str),
    Number(f64),
    Boolean(bool),
    Null,
    Undefined,
}

impl LiteralValue<'_> {
    pub fn describe(&self) -> String {
        match self {
            LiteralValue::String(s) => format!("{s:?}"),
            LiteralValue::Number(n) => n.to_string(),
            LiteralValue::Boolean(b) => b.to_string(),
            LiteralValue::Null => "null".to_string(),
            LiteralValue::Undefined => "undefined".to_string(),
        }
    }
}

/// Named arguments: `key=value ...`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Hash<'ast> {
    pub pairs: &'ast [HashPair<'ast>],
    pub span: Span,
}

impl<'ast> Hash<'ast> {
    pub fn get(&self, key: &str) -> Option<&HashPair<'ast>> {
        self.pairs.iter().find(|pair| pair.key == key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HashPair<'ast> {
    pub key: &'ast str,
    pub value: Expression<'ast>,
    pub span: Span,
}
