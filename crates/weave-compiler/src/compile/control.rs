//! Control-flow skeletons shared by the built-in constructs.
//!
//! Replayable regions are laid out so the same body serves both the first
//! render and every later update:
//!
//! ```text
//! StartLabels
//! PushFrame
//! ReturnTo ENDINITIAL
//! <args>                  ; N values the runtime re-checks on update
//! Enter N
//! <body>
//! FINALLY:
//! Exit
//! Return
//! ENDINITIAL:             ; reached on first render only
//! PopFrame
//! StopLabels
//! ```

use std::rc::Rc;

use weave_syntax::v2::Block;

use crate::opcode::{ContentType, Opcode, Register};
use crate::ops::{CompilableBlock, OpBuilder, Operand};

/// The clauses of a [`OpBuilder::switch_cases`], in registration order.
pub struct SwitchClauses<'c> {
    clauses: Vec<(ContentType, Box<dyn FnOnce(&mut OpBuilder) + 'c>)>,
}

impl<'c> SwitchClauses<'c> {
    /// Emit `body` when the bootstrap value equals `content`.
    pub fn when(&mut self, content: ContentType, body: impl FnOnce(&mut OpBuilder) + 'c) {
        self.clauses.push((content, Box::new(body)));
    }
}

impl OpBuilder {
    /// A replayable region whose `args` push the values it depends on.
    ///
    /// `args` returns how many values it pushed.
    pub fn replayable(
        &mut self,
        args: impl FnOnce(&mut OpBuilder) -> u32,
        body: impl FnOnce(&mut OpBuilder),
    ) {
        self.start_labels();
        self.op(Opcode::PushFrame);
        self.op_with(Opcode::ReturnTo, [Operand::label("ENDINITIAL")]);
        let count = args(self);
        self.op_with(Opcode::Enter, [Operand::Imm(count as i32)]);
        body(self);
        self.label("FINALLY");
        self.op(Opcode::Exit);
        self.op(Opcode::Return);
        self.label("ENDINITIAL");
        self.op(Opcode::PopFrame);
        self.stop_labels();
    }

    /// A replayable branch on the value on top of the stack.
    pub fn replayable_if(
        &mut self,
        args: impl FnOnce(&mut OpBuilder) -> u32,
        if_true: impl FnOnce(&mut OpBuilder),
        if_false: impl FnOnce(&mut OpBuilder),
    ) {
        self.replayable(args, |op| {
            op.op_with(Opcode::JumpUnless, [Operand::label("ELSE")]);
            if_true(op);
            op.op_with(Opcode::Jump, [Operand::label("FINALLY")]);
            op.label("ELSE");
            if_false(op);
        });
    }

    /// Branch on a content type computed by `bootstrap`.
    ///
    /// Every clause but the last is guarded by a `JumpEq`; the last clause is
    /// the fall-through. Clauses are laid out in reverse so the first one
    /// runs straight into `END`.
    pub fn switch_cases<'c>(
        &mut self,
        bootstrap: impl FnOnce(&mut OpBuilder),
        matcher: impl FnOnce(&mut SwitchClauses<'c>),
    ) {
        let mut clauses = SwitchClauses {
            clauses: Vec::new(),
        };
        matcher(&mut clauses);
        let clauses = clauses.clauses;

        self.op_with(Opcode::Enter, [Operand::Imm(1)]);
        bootstrap(self);
        self.start_labels();

        let guarded = clauses.len().saturating_sub(1);
        for (index, (content, _)) in clauses.iter().enumerate().take(guarded) {
            self.op_with(
                Opcode::JumpEq,
                [
                    Operand::label(format!("CLAUSE{index}")),
                    Operand::Imm(u8::from(*content) as i32),
                ],
            );
        }

        for (index, (_, body)) in clauses.into_iter().enumerate().rev() {
            self.label(format!("CLAUSE{index}"));
            self.op_with(Opcode::Pop, [Operand::Imm(1)]);
            body(self);
            if index != 0 {
                self.op_with(Opcode::Jump, [Operand::label("END")]);
            }
        }

        self.label("END");
        self.stop_labels();
        self.op(Opcode::Exit);
    }

    // ========================================================================
    // Static blocks
    // ========================================================================

    /// Invoke a block known at compile time in a fresh frame.
    pub fn invoke_static_block(&mut self, block: &Rc<Block>) {
        self.op(Opcode::PushFrame);
        self.compile_block(CompilableBlock::Block(Rc::clone(block)));
        self.op(Opcode::InvokeVirtual);
        self.op(Opcode::PopFrame);
    }

    /// An optional branch such as `else`; an absent one emits nothing.
    pub fn invoke_branch(&mut self, block: Option<&Rc<Block>>) {
        if let Some(block) = block {
            self.invoke_static_block(block);
        }
    }

    /// Invoke a block, binding its parameters to the top `caller_count`
    /// stack values of the enclosing frame.
    pub fn invoke_static_block_with_stack(&mut self, block: &Rc<Block>, caller_count: u32) {
        let count = caller_count.min(block.parameters.len() as u32);
        if count == 0 {
            self.invoke_static_block(block);
            return;
        }

        self.op(Opcode::PushFrame);
        self.op(Opcode::ChildScope);
        for (i, slot) in block.parameters.iter().take(count as usize).enumerate() {
            self.op_with(
                Opcode::Dup,
                [
                    Operand::register(Register::Fp),
                    Operand::Imm((caller_count - i as u32) as i32),
                ],
            );
            self.op_with(Opcode::SetVariable, [Operand::Imm(*slot as i32)]);
        }
        self.compile_block(CompilableBlock::Block(Rc::clone(block)));
        self.op(Opcode::InvokeVirtual);
        self.op(Opcode::PopScope);
        self.op(Opcode::PopFrame);
    }

    /// Run `body` with the values on the stack bound to `names` in a new
    /// dynamic scope.
    pub fn dynamic_scope(&mut self, names: Vec<String>, body: impl FnOnce(&mut OpBuilder)) {
        self.op(Opcode::PushDynamicScope);
        self.op_with(Opcode::BindDynamicScope, [Operand::Strings(names)]);
        body(self);
        self.op(Opcode::PopDynamicScope);
    }
}
