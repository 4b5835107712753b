//! Argument pushing.
//!
//! Arguments are pushed in a fixed order: blocks, positional values, named
//! values, then a single `PushArgs` describing the layout. The positional
//! count lives in the flags word above the four flag bits.

use bitflags::bitflags;
use weave_syntax::v2::{ExpressionNode, NamedArgument};

use crate::opcode::Opcode;
use crate::ops::{OpBuilder, Operand};

use super::InvocationBlocks;

bitflags! {
    /// Low bits of the `PushArgs` flags operand.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ArgsFlags: u32 {
        /// Named argument names carry their `@` sigil.
        const AT_NAMES = 0b1000;
        /// Blocks were pushed ahead of the values.
        const BLOCKS = 0b0111;
    }
}

const POSITIONAL_SHIFT: u32 = 4;

impl ArgsFlags {
    /// Flags for `count` positional arguments.
    pub fn positional(count: usize) -> Self {
        ArgsFlags::from_bits_retain((count as u32) << POSITIONAL_SHIFT)
    }

    pub fn positional_count(self) -> u32 {
        self.bits() >> POSITIONAL_SHIFT
    }
}

fn arg_names(named: &[NamedArgument], at_names: bool) -> Vec<String> {
    named
        .iter()
        .map(|arg| {
            if at_names {
                format!("@{}", arg.name)
            } else {
                arg.name.clone()
            }
        })
        .collect()
}

impl OpBuilder {
    /// Push each expression, returning how many were pushed.
    pub fn positional(&mut self, positional: &[ExpressionNode]) -> usize {
        for expr in positional {
            self.expr(expr);
        }
        positional.len()
    }

    /// Arguments without blocks, as helpers and modifiers receive them.
    pub fn simple_args(
        &mut self,
        positional: &[ExpressionNode],
        named: &[NamedArgument],
        at_names: bool,
    ) {
        if positional.is_empty() && named.is_empty() {
            self.op(Opcode::PushEmptyArgs);
            return;
        }

        let mut flags = ArgsFlags::positional(self.positional(positional));
        if at_names {
            flags |= ArgsFlags::AT_NAMES;
        }
        for arg in named {
            self.expr(&arg.value);
        }
        self.push_args(arg_names(named, at_names), Vec::new(), flags);
    }

    /// Arguments for a component invocation, blocks included.
    pub fn compile_args(
        &mut self,
        positional: &[ExpressionNode],
        named: &[NamedArgument],
        blocks: &InvocationBlocks,
        at_names: bool,
    ) {
        let mut flags = ArgsFlags::empty();
        if !blocks.is_empty() {
            flags |= ArgsFlags::BLOCKS;
            for (_, block) in blocks.iter() {
                self.op(Opcode::PushBlockScope);
                self.compile_block(block.clone());
            }
        }

        flags |= ArgsFlags::positional(self.positional(positional));
        if at_names {
            flags |= ArgsFlags::AT_NAMES;
        }
        for arg in named {
            self.expr(&arg.value);
        }
        self.push_args(arg_names(named, at_names), blocks.names(), flags);
    }

    fn push_args(&mut self, names: Vec<String>, block_names: Vec<String>, flags: ArgsFlags) {
        self.op_with(
            Opcode::PushArgs,
            [
                Operand::Strings(names),
                Operand::Strings(block_names),
                Operand::Imm(flags.bits() as i32),
            ],
        );
    }
}
