//! ASTv1 to ASTv2 normalization.
//!
//! [`normalize`] walks the raw tree top-down with a [`BlockContext`] that
//! tracks the current scope. It is the only place names get classified, and
//! it raises every syntax and resolution error eagerly, so a tree that
//! normalizes successfully is always compilable.
//!
//! ## Modules
//!
//! - `expressions`: heads, arguments, and free-variable classification
//! - `elements`: element classification, attributes, named blocks
//! - `keywords`: built-in constructs and their argument shapes
//! - `options`: [`NormalizeOptions`]

mod elements;
mod expressions;
mod keywords;
mod options;

pub use options::NormalizeOptions;

use std::rc::Rc;

use rustc_hash::FxHashSet;
use weave_core::{CompileError, Span, SyntaxError, SyntaxErrorKind};

use crate::keywords::KeywordPosition;
use crate::resolution::Position;
use crate::symbol_table::{ScopeId, SymbolTable};
use crate::v1::{self, Expression, Statement};
use crate::v2::{self, AppendContent, ContentNode, InvokeBlock, NamedBlock, NamedBlocks, TextContent};

type Result<T> = std::result::Result<T, CompileError>;

/// Normalize a parsed template.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn normalize(template: &v1::Template<'_>, options: &NormalizeOptions) -> Result<v2::Template> {
    let mut table = SymbolTable::top(options.template_locals.clone());
    if let Some(lexical) = &options.lexical_scope {
        table = table.with_lexical_scope(Rc::clone(lexical));
    }
    if let Some(hook) = &options.customize_component_name {
        table = table.with_component_name_hook(Rc::clone(hook));
    }

    check_block_params(template.block_params, template.span)?;
    table.declare_root_locals(template.block_params);

    let body = BlockContext {
        table: &mut table,
        options,
        scope: ScopeId::ROOT,
    }
    .statements(template.body)?;

    let table = table.into_program();
    tracing::debug!(
        module = options.module_name.as_deref().unwrap_or("<anonymous>"),
        symbols = table.symbols().len(),
        upvars = table.upvars().len(),
        "normalized template"
    );
    Ok(v2::Template {
        body,
        table,
        span: template.span,
    })
}

/// The scope a node is normalized in, plus session-wide options.
pub(crate) struct BlockContext<'a> {
    table: &'a mut SymbolTable,
    options: &'a NormalizeOptions,
    scope: ScopeId,
}

impl BlockContext<'_> {
    /// A context for a nested scope that reborrows this one's table.
    fn child(&mut self, scope: ScopeId) -> BlockContext<'_> {
        BlockContext {
            table: self.table,
            options: self.options,
            scope,
        }
    }

    fn statements(&mut self, body: &[Statement<'_>]) -> Result<Vec<ContentNode>> {
        body.iter()
            .map(|statement| self.statement(statement))
            .collect()
    }

    fn statement(&mut self, statement: &Statement<'_>) -> Result<ContentNode> {
        match statement {
            Statement::Text(text) => Ok(ContentNode::HtmlText(TextContent {
                chars: text.chars.to_string(),
                span: text.span,
            })),
            Statement::Comment(comment) => Ok(ContentNode::HtmlComment(TextContent {
                chars: comment.value.to_string(),
                span: comment.span,
            })),
            Statement::MustacheComment(comment) => Ok(ContentNode::GlimmerComment(TextContent {
                chars: comment.value.to_string(),
                span: comment.span,
            })),
            Statement::Mustache(mustache) => self.append(mustache),
            Statement::Block(block) => self.block_statement(block),
            Statement::Element(el) => elements::element(self, el),
        }
    }

    fn append(&mut self, mustache: &v1::MustacheStatement<'_>) -> Result<ContentNode> {
        if let Some(keyword) = self.keyword_head(&mustache.path, KeywordPosition::Append) {
            return keywords::append_keyword(self, keyword, mustache);
        }

        let position = Position::Append {
            trusting: mustache.trusting,
        };
        let value = self.invocation(
            &mustache.path,
            mustache.params,
            &mustache.hash,
            position,
            mustache.span,
        )?;
        Ok(ContentNode::AppendContent(AppendContent {
            value,
            trusting: mustache.trusting,
            span: mustache.span,
        }))
    }

    fn block_statement(&mut self, block: &v1::BlockStatement<'_>) -> Result<ContentNode> {
        if let Some(keyword) = self.keyword_head(&block.path, KeywordPosition::Block) {
            return keywords::block_keyword(self, keyword, block);
        }

        if let Expression::Literal(literal) = &block.path {
            return Err(SyntaxError::literal_callee(&literal.value.describe(), literal.span).into());
        }

        let has_args = !block.params.is_empty() || !block.hash.pairs.is_empty();
        let callee = self.callee(&block.path, Position::Block, has_args)?;
        let args = self.args(block.params, &block.hash)?;
        let blocks = self.block_statement_blocks(block)?;
        Ok(ContentNode::InvokeBlock(InvokeBlock {
            callee,
            args,
            blocks,
            span: block.span,
        }))
    }

    /// `default` from the program, `else` from the inverse.
    fn block_statement_blocks(&mut self, block: &v1::BlockStatement<'_>) -> Result<NamedBlocks> {
        let program = &block.program;
        let mut blocks = vec![NamedBlock {
            name: "default".to_string(),
            block: self.block(program.body, program.block_params, program.span)?,
            span: program.span,
        }];
        if let Some(inverse) = &block.inverse {
            blocks.push(NamedBlock {
                name: "else".to_string(),
                block: self.block(inverse.body, inverse.block_params, inverse.span)?,
                span: inverse.span,
            });
        }
        Ok(NamedBlocks { blocks })
    }

    /// Normalize `body` in a fresh child scope binding `params`.
    fn block(&mut self, body: &[Statement<'_>], params: &[&str], span: Span) -> Result<Rc<v2::Block>> {
        check_block_params(params, span)?;
        let scope = self.table.child(self.scope, params);
        let body = self.child(scope).statements(body)?;
        let parameters = self
            .table
            .block(scope)
            .map(|block| block.slots().to_vec())
            .unwrap_or_default();
        Ok(Rc::new(v2::Block {
            body,
            parameters,
            span,
        }))
    }
}

fn check_block_params(params: &[&str], span: Span) -> Result<()> {
    let mut seen = FxHashSet::default();
    for name in params {
        if !seen.insert(*name) {
            return Err(SyntaxError::new(
                SyntaxErrorKind::DuplicateBlockParam,
                span,
                format!("the block param `{name}` is declared twice"),
            )
            .into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests;
