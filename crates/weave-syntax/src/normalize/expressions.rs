//! Expression normalization.
//!
//! Heads are classified in this order:
//! 1. `this` and `@name`
//! 2. locals bound by an enclosing block
//! 3. lexical bindings (always strict)
//! 4. free variables, strict in strict mode, otherwise classified by position

use weave_core::{ResolutionError, Span, SyntaxError};

use crate::keywords::{Keyword, KeywordPosition};
use crate::resolution::{CalleeShape, FreeVarResolution, Position};
use crate::v1::{self, Expression, LiteralValue as RawLiteral, PathExpression, PathHead};
use crate::v2::{
    Args, CallExpression, ExpressionNode, FreeVarReference, LiteralExpression, LiteralValue,
    NamedArgument, PathExpression as NormalPath, VariableReference,
};

use super::{BlockContext, Result, keywords};

impl BlockContext<'_> {
    /// Normalize an expression in argument position.
    pub(super) fn expression(&mut self, expr: &Expression<'_>) -> Result<ExpressionNode> {
        match expr {
            Expression::Literal(literal) => Ok(literal_node(literal)),
            Expression::Path(path) => self.path(path, Position::Argument, false),
            Expression::SubExpression(sexpr) => {
                self.call(&sexpr.path, sexpr.params, &sexpr.hash, sexpr.span)
            }
        }
    }

    /// `(callee params hash)`, where keywords from the call table are honored.
    pub(super) fn call(
        &mut self,
        callee: &Expression<'_>,
        params: &[Expression<'_>],
        hash: &v1::Hash<'_>,
        span: Span,
    ) -> Result<ExpressionNode> {
        if let Some(keyword) = self.keyword_head(callee, KeywordPosition::Call) {
            return keywords::call_keyword(self, keyword, params, hash, span);
        }
        self.invocation(callee, params, hash, Position::Call, span)
    }

    /// A mustache in attribute or argument-value position.
    pub(super) fn attr_mustache(
        &mut self,
        mustache: &v1::MustacheStatement<'_>,
    ) -> Result<ExpressionNode> {
        if let Some(keyword) = self.keyword_head(&mustache.path, KeywordPosition::Call) {
            return keywords::call_keyword(
                self,
                keyword,
                mustache.params,
                &mustache.hash,
                mustache.span,
            );
        }
        self.invocation(
            &mustache.path,
            mustache.params,
            &mustache.hash,
            Position::AttrValue,
            mustache.span,
        )
    }

    /// A callee with optional arguments. Without arguments this is the
    /// callee itself; with arguments it is a [`CallExpression`].
    pub(super) fn invocation(
        &mut self,
        callee: &Expression<'_>,
        params: &[Expression<'_>],
        hash: &v1::Hash<'_>,
        position: Position,
        span: Span,
    ) -> Result<ExpressionNode> {
        let has_args = !params.is_empty() || !hash.pairs.is_empty();
        let callee = self.callee(callee, position, has_args)?;
        if !has_args {
            return Ok(callee);
        }
        let args = self.args(params, hash)?;
        Ok(ExpressionNode::Call(CallExpression {
            callee: Box::new(callee),
            args,
            span,
        }))
    }

    /// Normalize the head of an invocation.
    pub(super) fn callee(
        &mut self,
        callee: &Expression<'_>,
        position: Position,
        has_args: bool,
    ) -> Result<ExpressionNode> {
        match callee {
            Expression::Literal(literal) if has_args => Err(SyntaxError::literal_callee(
                &literal.value.describe(),
                literal.span,
            )
            .into()),
            Expression::Literal(literal) => Ok(literal_node(literal)),
            Expression::Path(path) => self.path(path, position, has_args),
            Expression::SubExpression(sexpr) => {
                self.call(&sexpr.path, sexpr.params, &sexpr.hash, sexpr.span)
            }
        }
    }

    pub(super) fn args(
        &mut self,
        params: &[Expression<'_>],
        hash: &v1::Hash<'_>,
    ) -> Result<Args> {
        let positional = params
            .iter()
            .map(|param| self.expression(param))
            .collect::<Result<Vec<_>>>()?;
        let named = hash
            .pairs
            .iter()
            .map(|pair| {
                Ok(NamedArgument {
                    name: pair.key.to_string(),
                    value: self.expression(&pair.value)?,
                    trusting: false,
                    span: pair.span,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let span = params
            .iter()
            .map(Expression::span)
            .fold(hash.span, Span::merge);
        Ok(Args {
            positional,
            named,
            span,
        })
    }

    /// Classify the head of `path` and attach its property tail.
    pub(super) fn path(
        &mut self,
        path: &PathExpression<'_>,
        position: Position,
        has_args: bool,
    ) -> Result<ExpressionNode> {
        let reference = match path.head {
            PathHead::This => VariableReference::This,
            PathHead::AtName(name) => VariableReference::Arg {
                name: name.to_string(),
                slot: self.table.allocate_named(name),
            },
            PathHead::Var(name) => {
                let shape = CalleeShape::new(path.tail.is_empty(), has_args);
                self.variable(name, shape, position, path)?
            }
        };

        Ok(ExpressionNode::Path(NormalPath {
            reference,
            tail: path.tail.iter().map(|segment| segment.to_string()).collect(),
            span: path.span,
        }))
    }

    fn variable(
        &mut self,
        name: &str,
        shape: CalleeShape,
        position: Position,
        path: &PathExpression<'_>,
    ) -> Result<VariableReference> {
        if let Some((slot, is_root)) = self.table.get(self.scope, name) {
            return Ok(VariableReference::Local {
                name: name.to_string(),
                slot,
                is_root,
            });
        }

        let resolution = if self.options.strict || self.table.has_lexical(name) {
            FreeVarResolution::Strict
        } else {
            position.classify(shape).ok_or_else(|| ResolutionError {
                head: name.to_string(),
                path: path.original(),
                position: position.as_str(),
                span: path.span,
            })?
        };
        Ok(VariableReference::Free(self.free(name, resolution, path.span)))
    }

    /// Register a free variable and build its reference.
    pub(super) fn free(
        &mut self,
        name: &str,
        resolution: FreeVarResolution,
        span: Span,
    ) -> FreeVarReference {
        let slot = self.table.allocate_free(name, &resolution);
        tracing::trace!(name, slot, %resolution, "free variable");
        FreeVarReference {
            name: self.table.upvar(slot).to_string(),
            slot,
            resolution,
            span,
        }
    }

    /// The keyword named by a bare, unbound callee, if any.
    pub(super) fn keyword_head(
        &self,
        callee: &Expression<'_>,
        position: KeywordPosition,
    ) -> Option<Keyword> {
        let Expression::Path(path) = callee else {
            return None;
        };
        let name = path.as_simple_var()?;
        if self.table.has(self.scope, name) || self.table.has_lexical(name) {
            return None;
        }
        Keyword::lookup(position, name)
    }
}

pub(super) fn literal_node(literal: &v1::Literal<'_>) -> ExpressionNode {
    let value = match literal.value {
        RawLiteral::String(s) => LiteralValue::String(s.to_string()),
        RawLiteral::Number(n) => LiteralValue::Number(n),
        RawLiteral::Boolean(b) => LiteralValue::Boolean(b),
        RawLiteral::Null => LiteralValue::Null,
        RawLiteral::Undefined => LiteralValue::Undefined,
    };
    ExpressionNode::Literal(LiteralExpression {
        value,
        span: literal.span,
    })
}

pub(super) fn string_node(value: &str, span: Span) -> ExpressionNode {
    ExpressionNode::Literal(LiteralExpression {
        value: LiteralValue::String(value.to_string()),
        span,
    })
}
