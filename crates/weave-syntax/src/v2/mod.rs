//! The normalized tree (ASTv2).
//!
//! Produced once by [`normalize`](crate::normalize::normalize) and never
//! mutated afterwards. Every identifier has been classified:
//!
//! - bound names are [`VariableReference::Local`] or [`VariableReference::Arg`]
//!   with a slot in the template's symbol table
//! - unbound names are [`FreeVarReference`]s with an index into `upvars` and
//!   a fixed [`FreeVarResolution`](crate::FreeVarResolution)
//! - built-in constructs are [`KeywordExpression`]s
//!
//! Blocks are reference counted so the compiler can queue them for separate
//! compilation without cloning their contents.

mod expr;

pub use expr::{
    Args, CallExpression, ExpressionNode, FreeVarReference, HasBlockExpression,
    InterpolateExpression, KeywordExpression, LiteralExpression, LiteralValue, NamedArgument,
    PathExpression, VariableReference,
};

use std::rc::Rc;

use weave_core::Span;

use crate::symbol_table::ProgramSymbolTable;

/// A normalized template with its finished symbol table.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub body: Vec<ContentNode>,
    pub table: ProgramSymbolTable,
    pub span: Span,
}

/// A block body together with the slots its parameters are bound to.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub body: Vec<ContentNode>,
    pub parameters: Vec<u32>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedBlock {
    pub name: String,
    pub block: Rc<Block>,
    pub span: Span,
}

/// The blocks passed to an invocation, in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NamedBlocks {
    pub blocks: Vec<NamedBlock>,
}

impl NamedBlocks {
    pub fn get(&self, name: &str) -> Option<&Rc<Block>> {
        self.blocks
            .iter()
            .find(|named| named.name == name)
            .map(|named| &named.block)
    }

    pub fn names(&self) -> Vec<String> {
        self.blocks.iter().map(|named| named.name.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }
}

// ============================================================================
// Content
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ContentNode {
    HtmlText(TextContent),
    /// `<!-- -->`, emitted into the document.
    HtmlComment(TextContent),
    /// `{{!-- --}}`, dropped by the compiler.
    GlimmerComment(TextContent),
    AppendContent(AppendContent),
    InvokeBlock(InvokeBlock),
    InvokeComponent(InvokeComponent),
    SimpleElement(SimpleElement),
    Yield(YieldContent),
    Debugger(Span),
}

impl ContentNode {
    pub fn span(&self) -> Span {
        match self {
            ContentNode::HtmlText(n) | ContentNode::HtmlComment(n) | ContentNode::GlimmerComment(n) => {
                n.span
            }
            ContentNode::AppendContent(n) => n.span,
            ContentNode::InvokeBlock(n) => n.span,
            ContentNode::InvokeComponent(n) => n.span,
            ContentNode::SimpleElement(n) => n.span,
            ContentNode::Yield(n) => n.span,
            ContentNode::Debugger(span) => *span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextContent {
    pub chars: String,
    pub span: Span,
}

/// `{{value}}` or `{{{value}}}`
#[derive(Debug, Clone, PartialEq)]
pub struct AppendContent {
    pub value: ExpressionNode,
    pub trusting: bool,
    pub span: Span,
}

/// `{{#callee args}}blocks{{/callee}}`
#[derive(Debug, Clone, PartialEq)]
pub struct InvokeBlock {
    pub callee: ExpressionNode,
    pub args: Args,
    pub blocks: NamedBlocks,
    pub span: Span,
}

/// `<Callee @arg=... attr=...>blocks</Callee>`
#[derive(Debug, Clone, PartialEq)]
pub struct InvokeComponent {
    pub callee: ExpressionNode,
    pub params: Rc<ElementParameters>,
    /// Named `@` arguments only.
    pub args: Args,
    pub blocks: NamedBlocks,
    pub span: Span,
}

/// A plain HTML element.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleElement {
    pub tag: String,
    pub params: Rc<ElementParameters>,
    pub body: Vec<ContentNode>,
    pub span: Span,
}

/// `{{yield ... to="name"}}`
#[derive(Debug, Clone, PartialEq)]
pub struct YieldContent {
    pub target_slot: u32,
    pub positional: Vec<ExpressionNode>,
    pub span: Span,
}

// ============================================================================
// Element parameters
// ============================================================================

/// Attributes, splats and modifiers of an element in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ElementParameters {
    pub params: Vec<ElementParameter>,
    pub span: Span,
}

impl ElementParameters {
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn has_splat(&self) -> bool {
        self.params
            .iter()
            .any(|param| matches!(param, ElementParameter::Splat { .. }))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementParameter {
    Attr(AttrNode),
    Modifier(ElementModifier),
    /// `...attributes`, forwarding the `&attrs` block in `slot`.
    Splat { slot: u32, span: Span },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttrNode {
    pub name: String,
    pub value: ExpressionNode,
    pub trusting: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementModifier {
    pub callee: ExpressionNode,
    pub args: Args,
    pub span: Span,
}
