//! Lowering of normalized templates to high-level ops.
//!
//! The compiler is split the same way the tree is:
//! - [`StatementCompiler`] walks [`ContentNode`]s, consulting the macro
//!   tables for built-in block and append constructs
//! - expression, argument, element, component and control-flow sequences
//!   are methods on [`OpBuilder`], since they only append ops and may run
//!   inside resolution continuations
//!
//! Nothing here talks to the heap. Names are resolved later by the encoder,
//! which is why most invocations are emitted as [`Resolve`](crate::ops::Resolve)
//! pseudo-ops carrying the ops to emit once the definition is known.

mod args;
mod components;
mod control;
mod elements;
mod expressions;

#[cfg(test)]
mod tests;

pub use args::ArgsFlags;
pub use components::InvocationBlocks;
pub use control::SwitchClauses;

use weave_core::CompileError;
use weave_registry::{ResolvedComponent, Resolver};
use weave_syntax::v2::{
    AppendContent, Args, ContentNode, ElementParameters, ExpressionNode, InvokeBlock, LiteralValue,
    YieldContent,
};
use weave_syntax::{FreeVarResolution, LooseResolution};

use crate::constants::Constant;
use crate::macros;
use crate::meta::TemplateMeta;
use crate::opcode::{ContentType, Opcode};
use crate::ops::{OpBuilder, Operand, Resolve};
use crate::stdlib::StdlibRoutine;

pub(crate) type Result<T> = std::result::Result<T, CompileError>;

/// Compiles the statements of one region.
pub struct StatementCompiler<'a> {
    pub(crate) op: OpBuilder,
    pub(crate) resolver: &'a dyn Resolver,
    pub(crate) meta: &'a TemplateMeta,
}

impl<'a> StatementCompiler<'a> {
    pub fn new(resolver: &'a dyn Resolver, meta: &'a TemplateMeta) -> Self {
        Self {
            op: OpBuilder::new(),
            resolver,
            meta,
        }
    }

    pub fn into_ops(self) -> OpBuilder {
        self.op
    }

    /// Compile a template or block body.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn compile_body(&mut self, body: &[ContentNode]) -> Result<()> {
        body.iter().try_for_each(|node| self.statement(node))
    }

    /// Compile the element parameters forwarded to a component as
    /// `...attributes`.
    pub fn compile_attributes(&mut self, params: &ElementParameters) {
        self.op.element_params(params, true);
    }

    pub fn statement(&mut self, node: &ContentNode) -> Result<()> {
        match node {
            ContentNode::HtmlText(text) => {
                self.op.op_with(Opcode::Text, [Operand::str(&text.chars)]);
            }
            ContentNode::HtmlComment(comment) => {
                self.op.op_with(Opcode::Comment, [Operand::str(&comment.chars)]);
            }
            ContentNode::GlimmerComment(_) => {}
            ContentNode::AppendContent(append) => self.append(append)?,
            ContentNode::InvokeBlock(block) => self.invoke_block(block)?,
            ContentNode::InvokeComponent(component) => self.op.invoke_component_node(component),
            ContentNode::SimpleElement(element) => self.simple_element(element)?,
            ContentNode::Yield(YieldContent {
                target_slot,
                positional,
                ..
            }) => self.op.yield_block(*target_slot, positional),
            ContentNode::Debugger(_) => self.debugger(),
        }
        Ok(())
    }

    fn debugger(&mut self) {
        self.op
            .push_constant(Constant::StringArray(self.meta.symbols.clone()));
        self.op
            .op_with(Opcode::Debugger, [Operand::flag(self.meta.has_eval)]);
    }

    // ========================================================================
    // Blocks
    // ========================================================================

    fn invoke_block(&mut self, node: &InvokeBlock) -> Result<()> {
        if let ExpressionNode::Keyword(keyword) = &node.callee {
            let name = keyword.keyword.name();
            let Some(compile) = macros::lookup_block(name) else {
                unreachable!("`{name}` is not a block construct");
            };
            return compile(self, node);
        }

        let blocks = InvocationBlocks::new(&node.blocks);
        match node.callee.as_free() {
            Some(free) if free.resolution == FreeVarResolution::Strict => {
                let args = node.args.clone();
                self.op.resolve(Resolve::TemplateLocal {
                    name: free.clone(),
                    then: Box::new(move |op, handle| {
                        op.op_with(
                            Opcode::PushComponentDefinition,
                            [Operand::Constant(Constant::Handle(handle))],
                        );
                        op.invoke_non_static(None, None, &args, &blocks, true);
                    }),
                });
            }
            Some(free) => {
                let args = node.args.clone();
                self.op.resolve(Resolve::Component {
                    name: free.clone(),
                    then: Box::new(move |op, component| {
                        op.invoke_resolved(&component, &args, &blocks);
                    }),
                });
            }
            None => self
                .op
                .invoke_dynamic_component(&node.callee, &node.args, &blocks, true, true),
        }
        Ok(())
    }

    // ========================================================================
    // Append
    // ========================================================================

    fn append(&mut self, node: &AppendContent) -> Result<()> {
        let AppendContent {
            value, trusting, ..
        } = node;
        let trusting = *trusting;

        match value {
            ExpressionNode::Literal(literal) => {
                let text = match &literal.value {
                    LiteralValue::Null | LiteralValue::Undefined => String::new(),
                    other => other.to_text(),
                };
                self.op.op_with(Opcode::Text, [Operand::Str(text)]);
            }
            ExpressionNode::Call(call) => {
                if let ExpressionNode::Keyword(keyword) = call.callee.as_ref() {
                    if let Some(compile) = macros::lookup_append(keyword.keyword.name()) {
                        return compile(self, node);
                    }
                    self.cautious_append(value, trusting);
                    return Ok(());
                }
                match call.callee.as_free() {
                    Some(free) if is_component_or_helper(&free.resolution) => {
                        let args = call.args.clone();
                        let helper_args = call.args.clone();
                        self.op.resolve(Resolve::ComponentOrHelper {
                            name: free.clone(),
                            component: Box::new(move |op, component| {
                                op.invoke_resolved(&component, &args, &InvocationBlocks::default());
                            }),
                            helper: Box::new(move |op, handle| {
                                op.op(Opcode::PushFrame);
                                op.call_helper(handle, &helper_args);
                                op.op_with(
                                    Opcode::InvokeStatic,
                                    [Operand::Stdlib(StdlibRoutine::non_dynamic(trusting))],
                                );
                                op.op(Opcode::PopFrame);
                            }),
                        });
                    }
                    Some(_) => self.cautious_append(value, trusting),
                    None => self.dynamic_append(&call.callee, &call.args, trusting),
                }
            }
            ExpressionNode::Path(_) => match value.as_free() {
                Some(free) if free.resolution == FreeVarResolution::component_or_helper(true) => {
                    let fallback_name = free.clone();
                    self.op.resolve(Resolve::OptionalComponentOrHelper {
                        name: free.clone(),
                        component: Box::new(|op, component: ResolvedComponent| {
                            op.invoke_resolved(
                                &component,
                                &Args::default(),
                                &InvocationBlocks::default(),
                            );
                        }),
                        helper: Box::new(move |op, handle| {
                            op.op(Opcode::PushFrame);
                            op.call_helper(handle, &Args::default());
                            op.op_with(
                                Opcode::InvokeStatic,
                                [Operand::Stdlib(StdlibRoutine::non_dynamic(trusting))],
                            );
                            op.op(Opcode::PopFrame);
                        }),
                        fallback: Box::new(move |op| {
                            op.op(Opcode::PushFrame);
                            op.resolve(Resolve::Local {
                                name: fallback_name,
                            });
                            op.op_with(
                                Opcode::InvokeStatic,
                                [Operand::Stdlib(StdlibRoutine::append(trusting))],
                            );
                            op.op(Opcode::PopFrame);
                        }),
                    });
                }
                _ => self.cautious_append(value, trusting),
            },
            _ => self.cautious_append(value, trusting),
        }
        Ok(())
    }

    /// Evaluate `value` and hand it to the shared append routine.
    fn cautious_append(&mut self, value: &ExpressionNode, trusting: bool) {
        self.op.op(Opcode::PushFrame);
        self.op.expr(value);
        self.op.op_with(
            Opcode::InvokeStatic,
            [Operand::Stdlib(StdlibRoutine::append(trusting))],
        );
        self.op.op(Opcode::PopFrame);
    }

    /// `{{value args}}` where `value` is only known at runtime: invoke it as
    /// a component or call it as a helper depending on what it turns out to
    /// be.
    fn dynamic_append(
        &mut self,
        callee: &ExpressionNode,
        args: &Args,
        trusting: bool,
    ) {
        self.op.switch_cases(
            |op| {
                op.expr(callee);
                op.op(Opcode::DynamicContentType);
            },
            |when| {
                when.when(ContentType::Component, |op| {
                    op.op(Opcode::ResolveCurriedComponent);
                    op.op(Opcode::PushDynamicComponentInstance);
                    op.invoke_non_static(None, None, args, &InvocationBlocks::default(), false);
                });
                when.when(ContentType::Helper, |op| {
                    op.call_dynamic_append(args, |op| {
                        op.op_with(
                            Opcode::InvokeStatic,
                            [Operand::Stdlib(StdlibRoutine::non_dynamic(trusting))],
                        );
                    });
                });
            },
        );
    }
}

fn is_component_or_helper(resolution: &FreeVarResolution) -> bool {
    matches!(
        resolution,
        FreeVarResolution::Loose(LooseResolution::ComponentOrHelper { .. })
    )
}

/// Compile a template body into ops.
pub fn compile_statements(
    resolver: &dyn Resolver,
    meta: &TemplateMeta,
    body: &[ContentNode],
) -> Result<OpBuilder> {
    let mut compiler = StatementCompiler::new(resolver, meta);
    compiler.compile_body(body)?;
    Ok(compiler.into_ops())
}
