//! Element normalization.
//!
//! An element tag is one of:
//! - a named block (`<:header>`), legal only as a direct child of a component
//! - a component invocation (`<@arg>`, `<this.x>`, `<local>`, `<Upper>`)
//! - a plain HTML element

use std::rc::Rc;

use rustc_hash::FxHashSet;
use weave_core::{ResolutionError, Span, SyntaxError, SyntaxErrorKind};

use crate::resolution::{CalleeShape, FreeVarResolution, Position};
use crate::v1::{self, AttrValue, ConcatPart, Statement};
use crate::v2::{
    Args, AttrNode, ContentNode, ElementModifier, ElementParameter, ElementParameters,
    ExpressionNode, InterpolateExpression, InvokeComponent, NamedArgument, NamedBlock,
    NamedBlocks, PathExpression, SimpleElement, VariableReference,
};

use super::expressions::string_node;
use super::{BlockContext, Result};

const SPLATTRIBUTES: &str = "...attributes";

pub(super) fn element(cx: &mut BlockContext<'_>, el: &v1::ElementNode<'_>) -> Result<ContentNode> {
    if el.tag.starts_with(':') {
        return Err(SyntaxError::new(
            SyntaxErrorKind::NamedBlockPosition,
            el.span,
            format!(
                "named block `<{}>` must be a direct child of a component invocation",
                el.tag
            ),
        )
        .into());
    }

    match component_callee(cx, el)? {
        Some(callee) => component(cx, el, callee),
        None => simple_element(cx, el),
    }
}

/// Classify the tag, returning the callee when it names a component.
fn component_callee(
    cx: &mut BlockContext<'_>,
    el: &v1::ElementNode<'_>,
) -> Result<Option<ExpressionNode>> {
    let mut segments = el.tag.split('.');
    let head = segments.next().unwrap_or_default();
    let tail: Vec<String> = segments.map(str::to_string).collect();
    let span = Span::new(el.span.line, el.span.col + 1, el.tag.len() as u32);

    let reference = if let Some(name) = head.strip_prefix('@') {
        VariableReference::Arg {
            name: name.to_string(),
            slot: cx.table.allocate_named(name),
        }
    } else if head == "this" {
        VariableReference::This
    } else if let Some((slot, is_root)) = cx.table.get(cx.scope, head) {
        VariableReference::Local {
            name: head.to_string(),
            slot,
            is_root,
        }
    } else if cx.table.has_lexical(head) {
        VariableReference::Free(cx.free(head, FreeVarResolution::Strict, span))
    } else if head.chars().next().is_some_and(char::is_uppercase) {
        if cx.options.strict {
            return Err(SyntaxError::new(
                SyntaxErrorKind::ComponentNotInScope,
                span,
                format!("`{head}` is not in scope"),
            )
            .into());
        }
        let shape = CalleeShape::new(tail.is_empty(), true);
        let resolution =
            Position::ElementTag
                .classify(shape)
                .ok_or_else(|| ResolutionError {
                    head: head.to_string(),
                    path: el.tag.to_string(),
                    position: Position::ElementTag.as_str(),
                    span,
                })?;
        VariableReference::Free(cx.free(head, resolution, span))
    } else {
        return Ok(None);
    };

    Ok(Some(ExpressionNode::Path(PathExpression {
        reference,
        tail,
        span,
    })))
}

fn simple_element(cx: &mut BlockContext<'_>, el: &v1::ElementNode<'_>) -> Result<ContentNode> {
    if !el.block_params.is_empty() {
        return Err(SyntaxError::new(
            SyntaxErrorKind::BlockParamsOnElement,
            el.span,
            format!("plain element `<{}>` cannot declare block params", el.tag),
        )
        .into());
    }

    let (params, args) = parameters(cx, el)?;
    if let Some(arg) = args.first() {
        return Err(SyntaxError::new(
            SyntaxErrorKind::ArgumentOnElement,
            arg.span,
            format!(
                "`@{}` is not valid on the plain element `<{}>`",
                arg.name, el.tag
            ),
        )
        .into());
    }

    let body = cx.statements(el.children)?;
    Ok(ContentNode::SimpleElement(SimpleElement {
        tag: el.tag.to_string(),
        params: Rc::new(params),
        body,
        span: el.span,
    }))
}

fn component(
    cx: &mut BlockContext<'_>,
    el: &v1::ElementNode<'_>,
    callee: ExpressionNode,
) -> Result<ContentNode> {
    let (params, named) = parameters(cx, el)?;
    let blocks = component_blocks(cx, el)?;
    let span = named
        .iter()
        .map(|arg| arg.span)
        .fold(Span::synthetic(), Span::merge);

    Ok(ContentNode::InvokeComponent(InvokeComponent {
        callee,
        params: Rc::new(params),
        args: Args {
            positional: Vec::new(),
            named,
            span,
        },
        blocks,
        span: el.span,
    }))
}

/// Split the opening tag into element parameters and `@` arguments.
fn parameters(
    cx: &mut BlockContext<'_>,
    el: &v1::ElementNode<'_>,
) -> Result<(ElementParameters, Vec<NamedArgument>)> {
    let mut params = Vec::new();
    let mut args = Vec::new();

    for attr in el.attributes {
        if attr.name == SPLATTRIBUTES {
            params.push(ElementParameter::Splat {
                slot: cx.table.allocate("&attrs"),
                span: attr.span,
            });
            continue;
        }

        let (value, trusting) = attr_value(cx, &attr.value)?;
        match attr.name.strip_prefix('@') {
            Some(name) => args.push(NamedArgument {
                name: name.to_string(),
                value,
                trusting,
                span: attr.span,
            }),
            None => params.push(ElementParameter::Attr(AttrNode {
                name: attr.name.to_string(),
                value,
                trusting,
                span: attr.span,
            })),
        }
    }

    for modifier in el.modifiers {
        let has_args = !modifier.params.is_empty() || !modifier.hash.pairs.is_empty();
        let callee = cx.callee(&modifier.path, Position::Modifier, has_args)?;
        let args = cx.args(modifier.params, &modifier.hash)?;
        params.push(ElementParameter::Modifier(ElementModifier {
            callee,
            args,
            span: modifier.span,
        }));
    }

    let span = el
        .attributes
        .iter()
        .map(|attr| attr.span)
        .chain(el.modifiers.iter().map(|modifier| modifier.span))
        .fold(Span::synthetic(), Span::merge);
    Ok((ElementParameters { params, span }, args))
}

fn attr_value(cx: &mut BlockContext<'_>, value: &AttrValue<'_>) -> Result<(ExpressionNode, bool)> {
    match value {
        AttrValue::Text(text) => Ok((string_node(text.chars, text.span), false)),
        AttrValue::Mustache(mustache) => Ok((cx.attr_mustache(mustache)?, mustache.trusting)),
        AttrValue::Concat(parts, span) => {
            let parts = parts
                .iter()
                .map(|part| match part {
                    ConcatPart::Text(text) => Ok(string_node(text.chars, text.span)),
                    ConcatPart::Mustache(mustache) => cx.attr_mustache(mustache),
                })
                .collect::<Result<Vec<_>>>()?;
            Ok((
                ExpressionNode::Interpolate(InterpolateExpression { parts, span: *span }),
                false,
            ))
        }
    }
}

// ============================================================================
// Component blocks
// ============================================================================

fn is_named_block(statement: &Statement<'_>) -> bool {
    matches!(statement, Statement::Element(el) if el.tag.starts_with(':'))
}

fn component_blocks(cx: &mut BlockContext<'_>, el: &v1::ElementNode<'_>) -> Result<NamedBlocks> {
    if !el.children.iter().any(is_named_block) {
        if el.self_closing && el.children.is_empty() {
            return Ok(NamedBlocks::default());
        }
        let block = cx.block(el.children, el.block_params, el.span)?;
        return Ok(NamedBlocks {
            blocks: vec![NamedBlock {
                name: "default".to_string(),
                block,
                span: el.span,
            }],
        });
    }

    if !el.block_params.is_empty() {
        return Err(SyntaxError::new(
            SyntaxErrorKind::BlockParamsOnElement,
            el.span,
            format!(
                "`<{}>` uses named blocks, declare block params on them instead",
                el.tag
            ),
        )
        .into());
    }

    let mut seen = FxHashSet::default();
    let mut blocks = Vec::new();
    for child in el.children {
        match child {
            Statement::Element(named) if named.tag.starts_with(':') => {
                let name = &named.tag[1..];
                if !seen.insert(name) {
                    return Err(SyntaxError::new(
                        SyntaxErrorKind::DuplicateNamedBlock,
                        named.span,
                        format!("`<{}>` passes the block `{name}` twice", el.tag),
                    )
                    .into());
                }
                let block = cx.block(named.children, named.block_params, named.span)?;
                blocks.push(NamedBlock {
                    name: name.to_string(),
                    block,
                    span: named.span,
                });
            }
            Statement::Text(text) if text.chars.trim().is_empty() => {}
            Statement::MustacheComment(_) => {}
            other => {
                return Err(SyntaxError::new(
                    SyntaxErrorKind::MixedNamedBlocks,
                    other.span(),
                    format!(
                        "`<{}>` mixes named blocks with other content",
                        el.tag
                    ),
                )
                .into());
            }
        }
    }
    Ok(NamedBlocks { blocks })
}
