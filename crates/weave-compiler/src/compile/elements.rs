//! Elements, attributes, modifiers and yields.

use weave_syntax::FreeVarResolution;
use weave_syntax::v2::{
    AttrNode, ElementModifier, ElementParameter, ElementParameters, ExpressionNode, SimpleElement,
};

use crate::constants::Constant;
use crate::opcode::{Opcode, Register};
use crate::ops::{OpBuilder, Operand, Resolve, Then};

use super::{Result, StatementCompiler};

impl StatementCompiler<'_> {
    pub(super) fn simple_element(&mut self, element: &SimpleElement) -> Result<()> {
        let open = if element.params.has_splat() {
            Opcode::OpenElementWithSplat
        } else {
            Opcode::OpenElement
        };
        self.op.op_with(open, [Operand::str(&element.tag)]);
        self.op.element_params(&element.params, false);
        self.op.op(Opcode::FlushElement);
        self.compile_body(&element.body)?;
        self.op.op(Opcode::CloseElement);
        Ok(())
    }
}

impl OpBuilder {
    /// Attributes, splats and modifiers in source order.
    ///
    /// With `component`, attributes are emitted for the element a component
    /// forwards `...attributes` to.
    pub fn element_params(&mut self, params: &ElementParameters, component: bool) {
        for param in &params.params {
            match param {
                ElementParameter::Attr(attr) => self.attribute(attr, component),
                ElementParameter::Modifier(modifier) => self.modifier(modifier),
                ElementParameter::Splat { slot, .. } => self.yield_block(*slot, &[]),
            }
        }
    }

    fn attribute(&mut self, attr: &AttrNode, component: bool) {
        if let Some(value) = attr.value.as_string_literal() {
            let opcode = if component {
                Opcode::StaticComponentAttr
            } else {
                Opcode::StaticAttr
            };
            self.op_with(opcode, [Operand::str(&attr.name), Operand::str(value)]);
            return;
        }

        self.expr(&attr.value);
        let opcode = if component {
            Opcode::ComponentAttr
        } else {
            Opcode::DynamicAttr
        };
        self.op_with(
            opcode,
            [Operand::str(&attr.name), Operand::flag(attr.trusting)],
        );
    }

    fn modifier(&mut self, modifier: &ElementModifier) {
        let Some(free) = modifier.callee.as_free() else {
            self.expr(&modifier.callee);
            self.op(Opcode::PushFrame);
            self.simple_args(&modifier.args.positional, &modifier.args.named, false);
            self.op_with(Opcode::Dup, [Operand::register(Register::Fp), Operand::Imm(1)]);
            self.op(Opcode::DynamicModifier);
            self.op(Opcode::PopFrame);
            return;
        };

        let args = modifier.args.clone();
        let then: Then<u32> = Box::new(move |op, handle| {
            op.op(Opcode::PushFrame);
            op.simple_args(&args.positional, &args.named, false);
            op.op_with(Opcode::Modifier, [Operand::Constant(Constant::Handle(handle))]);
            op.op(Opcode::PopFrame);
        });
        let name = free.clone();
        match free.resolution {
            FreeVarResolution::Strict => self.resolve(Resolve::TemplateLocal { name, then }),
            FreeVarResolution::Loose(_) => self.resolve(Resolve::Modifier { name, then }),
        }
    }

    /// `{{yield}}`: invoke the block in `slot` with `positional` as its
    /// block params.
    pub fn yield_block(&mut self, slot: u32, positional: &[ExpressionNode]) {
        self.op(Opcode::PushFrame);
        self.simple_args(positional, &[], true);
        self.op_with(Opcode::GetBlock, [Operand::Imm(slot as i32)]);
        self.op(Opcode::SpreadBlock);
        self.op(Opcode::CompileBlock);
        self.op(Opcode::InvokeYield);
        self.op(Opcode::PopScope);
        self.op(Opcode::PopFrame);
    }
}
