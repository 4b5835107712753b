//! Component invocation sequences.
//!
//! A component is invoked through the `$s0` register, which holds the
//! component under construction for the whole transaction. Statically
//! resolved components may link their layout at compile time; everything
//! else asks the definition for its layout at runtime.

use std::rc::Rc;

use weave_registry::{CompilableTemplate, ComponentCapabilities, ResolvedComponent};
use weave_syntax::FreeVarResolution;
use weave_syntax::v2::{Args, ElementParameters, ExpressionNode, InvokeComponent, NamedBlocks};

use crate::constants::Constant;
use crate::opcode::{Opcode, Register};
use crate::ops::{CompilableBlock, OpBuilder, Operand, Resolve};

/// The blocks handed to a component, in the order they are pushed.
#[derive(Debug, Clone, Default)]
pub struct InvocationBlocks {
    blocks: Vec<(String, CompilableBlock)>,
}

impl InvocationBlocks {
    pub fn new(blocks: &NamedBlocks) -> Self {
        Self {
            blocks: blocks
                .blocks
                .iter()
                .map(|named| {
                    (
                        named.name.clone(),
                        CompilableBlock::Block(Rc::clone(&named.block)),
                    )
                })
                .collect(),
        }
    }

    /// Add the element parameters as the `attrs` block, when there are any.
    pub fn with_attrs(mut self, params: &Rc<ElementParameters>) -> Self {
        if !params.is_empty() {
            self.blocks.push((
                "attrs".to_string(),
                CompilableBlock::Attributes(Rc::clone(params)),
            ));
        }
        self
    }

    pub fn has(&self, name: &str) -> bool {
        self.blocks.iter().any(|(block, _)| block == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.blocks.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, CompilableBlock)> {
        self.blocks.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }
}

fn s0() -> Operand {
    Operand::register(Register::S0)
}

impl OpBuilder {
    /// `<Callee ...>`
    pub fn invoke_component_node(&mut self, node: &InvokeComponent) {
        let blocks = InvocationBlocks::new(&node.blocks).with_attrs(&node.params);
        match node.callee.as_free() {
            Some(free) if free.resolution == FreeVarResolution::Strict => {
                let args = node.args.clone();
                self.resolve(Resolve::TemplateLocal {
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
                self.resolve(Resolve::Component {
                    name: free.clone(),
                    then: Box::new(move |op, component| {
                        op.invoke_resolved(&component, &args, &blocks);
                    }),
                });
            }
            None => self.invoke_dynamic_component(&node.callee, &node.args, &blocks, true, true),
        }
    }

    /// Invoke a component returned by the resolver.
    pub fn invoke_resolved(
        &mut self,
        component: &ResolvedComponent,
        args: &Args,
        blocks: &InvocationBlocks,
    ) {
        self.op_with(
            Opcode::PushComponentDefinition,
            [Operand::Constant(Constant::Handle(component.handle))],
        );
        let layout = component
            .layout
            .as_ref()
            .filter(|_| !component.capabilities.contains(ComponentCapabilities::DYNAMIC_LAYOUT))
            .cloned();
        self.invoke_non_static(Some(component.capabilities), layout, args, blocks, true);
    }

    /// Invoke the component definition on top of the stack.
    ///
    /// `capabilities` is `None` when the definition is only known at runtime,
    /// in which case every capability has to be assumed.
    pub fn invoke_non_static(
        &mut self,
        capabilities: Option<ComponentCapabilities>,
        layout: Option<Rc<CompilableTemplate>>,
        args: &Args,
        blocks: &InvocationBlocks,
        at_names: bool,
    ) {
        let bindable_blocks = !blocks.is_empty();
        let bindable_at_names = capabilities
            .is_none_or(|caps| caps.contains(ComponentCapabilities::PREPARE_ARGS))
            || !args.named.is_empty();

        self.op_with(Opcode::Fetch, [s0()]);
        self.op_with(Opcode::Dup, [Operand::register(Register::Sp), Operand::Imm(1)]);
        self.op_with(Opcode::Load, [s0()]);
        self.op(Opcode::PushFrame);
        self.compile_args(&args.positional, &args.named, blocks, at_names);
        self.op_with(Opcode::PrepareArgs, [s0()]);
        self.invoke_prepared(
            blocks.has("default"),
            bindable_blocks,
            bindable_at_names,
            |op| {
                match layout {
                    Some(layout) => op.op_with(Opcode::PushLayout, [Operand::Layout(layout)]),
                    None => op.op_with(Opcode::GetComponentLayout, [s0()]),
                }
                op.op_with(Opcode::PopulateLayout, [s0()]);
            },
        );
        self.op_with(Opcode::Load, [s0()]);
    }

    /// The component transaction, once arguments are prepared.
    pub fn invoke_prepared(
        &mut self,
        has_block: bool,
        bindable_blocks: bool,
        bindable_at_names: bool,
        populate_layout: impl FnOnce(&mut OpBuilder),
    ) {
        self.op_with(Opcode::BeginComponentTransaction, [s0()]);
        self.op(Opcode::PushDynamicScope);
        self.op_with(Opcode::CreateComponent, [Operand::flag(has_block), s0()]);
        populate_layout(self);
        self.op_with(Opcode::RegisterComponentDestructor, [s0()]);
        self.op_with(Opcode::GetComponentSelf, [s0()]);
        self.op_with(Opcode::VirtualRootScope, [s0()]);
        self.op_with(Opcode::SetVariable, [Operand::Imm(0)]);
        self.op_with(Opcode::SetupForEval, [s0()]);
        if bindable_at_names {
            self.op_with(Opcode::SetNamedVariables, [s0()]);
        }
        if bindable_blocks {
            self.op_with(Opcode::SetBlocks, [s0()]);
        }
        self.op_with(Opcode::Pop, [Operand::Imm(1)]);
        self.op_with(Opcode::InvokeComponentLayout, [s0()]);
        self.op_with(Opcode::DidRenderLayout, [s0()]);
        self.op(Opcode::PopFrame);
        self.op(Opcode::PopScope);
        self.op(Opcode::PopDynamicScope);
        self.op(Opcode::CommitComponentTransaction);
    }

    /// Invoke a component whose definition is the value of `definition`.
    ///
    /// `curried` definitions may carry captured arguments; others are
    /// resolved from whatever value they hold. A falsy definition renders
    /// nothing.
    pub fn invoke_dynamic_component(
        &mut self,
        definition: &ExpressionNode,
        args: &Args,
        blocks: &InvocationBlocks,
        at_names: bool,
        curried: bool,
    ) {
        self.replayable(
            |op| {
                op.expr(definition);
                op.op_with(Opcode::Dup, [Operand::register(Register::Sp), Operand::Imm(0)]);
                2
            },
            |op| {
                op.op_with(Opcode::JumpUnless, [Operand::label("ELSE")]);
                if curried {
                    op.op(Opcode::ResolveCurriedComponent);
                } else {
                    op.op(Opcode::ResolveDynamicComponent);
                }
                op.op(Opcode::PushDynamicComponentInstance);
                op.invoke_non_static(None, None, args, blocks, at_names);
                op.label("ELSE");
            },
        );
    }

    /// Invoke the component instance on the stack with no arguments.
    pub fn invoke_bare_component(&mut self) {
        self.op_with(Opcode::Fetch, [s0()]);
        self.op_with(Opcode::Dup, [Operand::register(Register::Sp), Operand::Imm(1)]);
        self.op_with(Opcode::Load, [s0()]);
        self.op(Opcode::PushFrame);
        self.op(Opcode::PushEmptyArgs);
        self.op_with(Opcode::PrepareArgs, [s0()]);
        self.invoke_prepared(false, false, true, |op| {
            op.op_with(Opcode::GetComponentLayout, [s0()]);
            op.op_with(Opcode::PopulateLayout, [s0()]);
        });
        self.op_with(Opcode::Load, [s0()]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::HighLevelOp;
    use weave_syntax::v2::{Block, NamedBlock};

    fn named_blocks(names: &[&str]) -> NamedBlocks {
        NamedBlocks {
            blocks: names
                .iter()
                .map(|name| NamedBlock {
                    name: name.to_string(),
                    block: Rc::new(Block {
                        body: Vec::new(),
                        parameters: Vec::new(),
                        span: Default::default(),
                    }),
                    span: Default::default(),
                })
                .collect(),
        }
    }

    fn has_op(op: &OpBuilder, opcode: Opcode) -> bool {
        op.opcodes().contains(&opcode)
    }

    #[test]
    fn attrs_follow_user_blocks() {
        let params = Rc::new(ElementParameters {
            params: vec![weave_syntax::v2::ElementParameter::Splat {
                slot: 1,
                span: Default::default(),
            }],
            span: Default::default(),
        });
        let blocks = InvocationBlocks::new(&named_blocks(&["default", "else"])).with_attrs(&params);
        assert_eq!(blocks.names(), vec!["default", "else", "attrs"]);

        let empty = InvocationBlocks::new(&NamedBlocks::default())
            .with_attrs(&Rc::new(ElementParameters::default()));
        assert!(empty.is_empty());
    }

    #[test]
    fn dynamic_layout_is_fetched_at_runtime() {
        let layout = Rc::new(CompilableTemplate::new(
            "components/card",
            weave_syntax::v2::Template {
                body: Vec::new(),
                table: Default::default(),
                span: Default::default(),
            },
        ));
        let mut component = ResolvedComponent {
            handle: 4,
            capabilities: ComponentCapabilities::empty(),
            layout: Some(layout),
        };

        let mut op = OpBuilder::new();
        op.invoke_resolved(&component, &Args::default(), &InvocationBlocks::default());
        assert!(has_op(&op, Opcode::PushLayout));
        assert!(!has_op(&op, Opcode::GetComponentLayout));
        // no named args and no blocks to bind
        assert!(!has_op(&op, Opcode::SetNamedVariables));
        assert!(!has_op(&op, Opcode::SetBlocks));

        component.capabilities = ComponentCapabilities::DYNAMIC_LAYOUT;
        let mut op = OpBuilder::new();
        op.invoke_resolved(&component, &Args::default(), &InvocationBlocks::default());
        assert!(!has_op(&op, Opcode::PushLayout));
        assert!(has_op(&op, Opcode::GetComponentLayout));
    }

    #[test]
    fn blocks_are_pushed_before_arguments() {
        let blocks = InvocationBlocks::new(&named_blocks(&["default"]));
        let mut op = OpBuilder::new();
        op.invoke_non_static(None, None, &Args::default(), &blocks, true);

        let push_block = op
            .ops()
            .iter()
            .position(|op| matches!(op, HighLevelOp::CompileBlock(_)))
            .unwrap();
        let push_args = op
            .ops()
            .iter()
            .position(|op| matches!(op, HighLevelOp::Op(op) if op.opcode == Opcode::PushArgs))
            .unwrap();
        assert!(push_block < push_args);
        assert!(has_op(&op, Opcode::SetBlocks));
        // unknown capabilities bind named arguments
        assert!(has_op(&op, Opcode::SetNamedVariables));
    }

    #[test]
    fn falsy_dynamic_definitions_skip_invocation() {
        let definition = ExpressionNode::Path(weave_syntax::v2::PathExpression {
            reference: weave_syntax::v2::VariableReference::Arg {
                name: "as".to_string(),
                slot: 1,
            },
            tail: Vec::new(),
            span: Default::default(),
        });
        let mut op = OpBuilder::new();
        op.invoke_dynamic_component(
            &definition,
            &Args::default(),
            &InvocationBlocks::default(),
            true,
            true,
        );
        let opcodes = op.opcodes();
        assert_eq!(opcodes[2], Opcode::GetVariable);
        assert_eq!(opcodes[3], Opcode::Dup);
        assert_eq!(opcodes[4], Opcode::Enter);
        assert_eq!(opcodes[5], Opcode::JumpUnless);
        assert_eq!(opcodes[6], Opcode::ResolveCurriedComponent);
    }
}
