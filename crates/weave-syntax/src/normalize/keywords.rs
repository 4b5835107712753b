//! Normalization of built-in constructs.
//!
//! Argument shapes are checked here so that the compiler can assume every
//! keyword node it sees is well formed.

use weave_core::{Span, SyntaxError, SyntaxErrorKind};

use crate::keywords::Keyword;
use crate::v1::{self, Expression};
use crate::v2::{
    AppendContent, Args, CallExpression, ContentNode, ExpressionNode, HasBlockExpression,
    InvokeBlock, KeywordExpression, YieldContent,
};

use super::{BlockContext, Result};

fn arity(keyword: Keyword, span: Span, requirement: &str) -> SyntaxError {
    SyntaxError::keyword_arity(keyword.name(), span, requirement)
}

fn keyword_callee(keyword: Keyword, span: Span) -> ExpressionNode {
    ExpressionNode::Keyword(KeywordExpression { keyword, span })
}

fn keyword_call(keyword: Keyword, callee_span: Span, args: Args, span: Span) -> ExpressionNode {
    ExpressionNode::Call(CallExpression {
        callee: Box::new(keyword_callee(keyword, callee_span)),
        args,
        span,
    })
}

/// Only the named arguments in `allowed` may appear.
fn check_named(
    keyword: Keyword,
    hash: &v1::Hash<'_>,
    allowed: &[&str],
    span: Span,
) -> Result<()> {
    let unexpected = hash
        .pairs
        .iter()
        .find(|pair| !allowed.iter().any(|name| *name == pair.key));
    if let Some(pair) = unexpected {
        let requirement = match allowed {
            [] => "no named arguments".to_string(),
            [only] => format!("only the named argument `{only}`"),
            _ => format!("only the named arguments {}", allowed.join(", ")),
        };
        return Err(arity(keyword, pair.span.merge(span), &requirement).into());
    }
    Ok(())
}

// ============================================================================
// Append position
// ============================================================================

pub(super) fn append_keyword(
    cx: &mut BlockContext<'_>,
    keyword: Keyword,
    mustache: &v1::MustacheStatement<'_>,
) -> Result<ContentNode> {
    let span = mustache.span;
    match keyword {
        Keyword::Yield => {
            check_named(keyword, &mustache.hash, &["to"], span)?;
            let target = match mustache.hash.get("to") {
                None => "default",
                Some(pair) => match &pair.value {
                    Expression::Literal(v1::Literal {
                        value: v1::LiteralValue::String(name),
                        ..
                    }) => *name,
                    _ => {
                        return Err(
                            arity(keyword, pair.span, "`to` to be a string literal").into()
                        );
                    }
                },
            };
            let positional = mustache
                .params
                .iter()
                .map(|param| cx.expression(param))
                .collect::<Result<Vec<_>>>()?;
            Ok(ContentNode::Yield(YieldContent {
                target_slot: cx.table.allocate_block(target),
                positional,
                span,
            }))
        }
        Keyword::Debugger => {
            if mustache.has_args() {
                return Err(arity(keyword, span, "no arguments").into());
            }
            cx.table.set_has_eval();
            Ok(ContentNode::Debugger(span))
        }
        Keyword::Component => {
            if mustache.params.is_empty() {
                return Err(arity(keyword, span, "a component definition").into());
            }
            let args = cx.args(mustache.params, &mustache.hash)?;
            Ok(ContentNode::AppendContent(AppendContent {
                value: keyword_call(keyword, mustache.path.span(), args, span),
                trusting: mustache.trusting,
                span,
            }))
        }
        _ => {
            let value = call_keyword(cx, keyword, mustache.params, &mustache.hash, span)?;
            Ok(ContentNode::AppendContent(AppendContent {
                value,
                trusting: mustache.trusting,
                span,
            }))
        }
    }
}

// ============================================================================
// Call position
// ============================================================================

pub(super) fn call_keyword(
    cx: &mut BlockContext<'_>,
    keyword: Keyword,
    params: &[Expression<'_>],
    hash: &v1::Hash<'_>,
    span: Span,
) -> Result<ExpressionNode> {
    let callee_span = Span::new(span.line, span.col, keyword.name().len() as u32);
    match keyword {
        Keyword::HasBlock | Keyword::HasBlockParams => {
            check_named(keyword, hash, &[], span)?;
            let name = match params {
                [] => "default",
                [
                    Expression::Literal(v1::Literal {
                        value: v1::LiteralValue::String(name),
                        ..
                    }),
                ] => *name,
                _ => {
                    let requirement = "at most one string literal argument";
                    return Err(arity(keyword, span, requirement).into());
                }
            };
            let node = HasBlockExpression {
                slot: cx.table.allocate_block(name),
                span,
            };
            Ok(if keyword == Keyword::HasBlock {
                ExpressionNode::HasBlock(node)
            } else {
                ExpressionNode::HasBlockParams(node)
            })
        }
        Keyword::If | Keyword::Unless => {
            check_named(keyword, hash, &[], span)?;
            if !(2..=3).contains(&params.len()) {
                return Err(arity(keyword, span, "two or three arguments").into());
            }
            let args = cx.args(params, hash)?;
            Ok(keyword_call(keyword, callee_span, args, span))
        }
        Keyword::GetDynamicVar => {
            check_named(keyword, hash, &[], span)?;
            if params.len() != 1 {
                return Err(arity(keyword, span, "a single argument").into());
            }
            let args = cx.args(params, hash)?;
            Ok(keyword_call(keyword, callee_span, args, span))
        }
        Keyword::Log => {
            let args = cx.args(params, hash)?;
            Ok(keyword_call(keyword, callee_span, args, span))
        }
        Keyword::Component | Keyword::Helper | Keyword::Modifier => {
            if params.is_empty() {
                let requirement = format!("a {} definition", keyword.name());
                return Err(arity(keyword, span, &requirement).into());
            }
            let args = cx.args(params, hash)?;
            Ok(keyword_call(keyword, callee_span, args, span))
        }
        Keyword::Yield
        | Keyword::Debugger
        | Keyword::Each
        | Keyword::With
        | Keyword::Let
        | Keyword::InElement
        | Keyword::WithDynamicVars => Err(SyntaxError::new(
            SyntaxErrorKind::KeywordArity,
            span,
            format!("`{}` cannot be used as a value", keyword.name()),
        )
        .into()),
    }
}

// ============================================================================
// Block position
// ============================================================================

pub(super) fn block_keyword(
    cx: &mut BlockContext<'_>,
    keyword: Keyword,
    block: &v1::BlockStatement<'_>,
) -> Result<ContentNode> {
    let span = block.span;
    let params = block.params;
    let hash = &block.hash;

    match keyword {
        Keyword::If | Keyword::Unless | Keyword::With => {
            check_named(keyword, hash, &[], span)?;
            if params.len() != 1 {
                return Err(arity(keyword, span, "a single argument").into());
            }
        }
        Keyword::Each => {
            check_named(keyword, hash, &["key"], span)?;
            if params.len() != 1 {
                return Err(arity(keyword, span, "a single argument").into());
            }
        }
        Keyword::Let => {
            check_named(keyword, hash, &[], span)?;
            if params.is_empty() {
                return Err(arity(keyword, span, "at least one argument").into());
            }
        }
        Keyword::InElement => {
            check_named(keyword, hash, &["insertBefore"], span)?;
            if params.len() != 1 {
                return Err(arity(keyword, span, "a single argument").into());
            }
        }
        Keyword::WithDynamicVars => {
            if !params.is_empty() || hash.pairs.is_empty() {
                return Err(arity(keyword, span, "named arguments only").into());
            }
        }
        Keyword::Component => {
            if params.is_empty() {
                return Err(arity(keyword, span, "a component definition").into());
            }
        }
        _ => {
            return Err(SyntaxError::new(
                SyntaxErrorKind::KeywordArity,
                span,
                format!("`{}` cannot be used as a block", keyword.name()),
            )
            .into());
        }
    }

    let args = cx.args(params, hash)?;
    let blocks = cx.block_statement_blocks(block)?;
    Ok(ContentNode::InvokeBlock(InvokeBlock {
        callee: keyword_callee(keyword, block.path.span()),
        args,
        blocks,
        span,
    }))
}
