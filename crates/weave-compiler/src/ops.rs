//! The high-level op stream produced by the statement compiler.
//!
//! Most ops map directly to one instruction. The pseudo-ops cover what the
//! compiler cannot decide on its own:
//! - labels and label scopes, resolved to relative offsets by the encoder
//! - [`Resolve`], a name lookup whose outcome selects the ops to emit
//! - [`HighLevelOp::CompileBlock`], a nested block compiled as its own region
//! - [`HighLevelOp::PushConstant`], a value interned into the constant pool
//! - [`HighLevelOp::Reject`], a malformed construct that fails the region

use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

use weave_core::{Handle, SyntaxError};
use weave_registry::{CompilableTemplate, ResolvedComponent};
use weave_syntax::v2::{Block, ElementParameters, FreeVarReference};

use crate::constants::Constant;
use crate::encoding::PrimitiveValue;
use crate::opcode::{Opcode, Register};
use crate::stdlib::StdlibRoutine;

pub type Label = Cow<'static, str>;

/// A single operand before encoding.
#[derive(Debug, Clone)]
pub enum Operand {
    Imm(i32),
    Label(Label),
    /// Interned as a string constant.
    Str(String),
    /// Interned as a string array constant.
    Strings(Vec<String>),
    Constant(Constant),
    Primitive(PrimitiveValue),
    Handle(Handle),
    /// Statically linked layout, compiled at most once per session.
    Layout(Rc<CompilableTemplate>),
    Stdlib(StdlibRoutine),
    /// Whether the template being encoded is strict.
    IsStrict,
}

impl Operand {
    pub fn register(register: Register) -> Self {
        Operand::Imm(u8::from(register) as i32)
    }

    pub fn flag(value: bool) -> Self {
        Operand::Imm(value as i32)
    }

    pub fn label(name: impl Into<Label>) -> Self {
        Operand::Label(name.into())
    }

    pub fn str(value: impl Into<String>) -> Self {
        Operand::Str(value.into())
    }
}

/// One concrete instruction.
#[derive(Debug, Clone)]
pub struct BuilderOp {
    pub opcode: Opcode,
    pub operands: Vec<Operand>,
}

/// A block that gets its own heap region.
#[derive(Debug, Clone)]
pub enum CompilableBlock {
    Block(Rc<Block>),
    /// The element parameters forwarded to a component as `...attributes`.
    Attributes(Rc<ElementParameters>),
}

pub enum HighLevelOp {
    Op(BuilderOp),
    Label(Label),
    StartLabels,
    StopLabels,
    Resolve(Resolve),
    CompileBlock(CompilableBlock),
    PushConstant(Constant),
    Reject(SyntaxError),
}

impl fmt::Debug for HighLevelOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HighLevelOp::Op(op) => write!(f, "{} {:?}", op.opcode, op.operands),
            HighLevelOp::Label(name) => write!(f, "{name}:"),
            HighLevelOp::StartLabels => f.write_str("StartLabels"),
            HighLevelOp::StopLabels => f.write_str("StopLabels"),
            HighLevelOp::Resolve(resolve) => write!(f, "Resolve({})", resolve.name()),
            HighLevelOp::CompileBlock(block) => write!(f, "CompileBlock({block:?})"),
            HighLevelOp::PushConstant(constant) => write!(f, "PushConstant({constant:?})"),
            HighLevelOp::Reject(error) => write!(f, "Reject({error})"),
        }
    }
}

// ============================================================================
// Resolution
// ============================================================================

pub type Then<T> = Box<dyn FnOnce(&mut OpBuilder, T)>;
pub type Fallback = Box<dyn FnOnce(&mut OpBuilder)>;

/// A deferred lookup and the ops to emit for each outcome.
///
/// A lookup with no fallback that finds nothing is recorded as a link error
/// and emits nothing.
pub enum Resolve {
    Component {
        name: FreeVarReference,
        then: Then<ResolvedComponent>,
    },
    Helper {
        name: FreeVarReference,
        then: Then<u32>,
    },
    /// A helper lookup that falls back to a property of `this`.
    OptionalHelper {
        name: FreeVarReference,
        then: Then<u32>,
        fallback: Fallback,
    },
    Modifier {
        name: FreeVarReference,
        then: Then<u32>,
    },
    ComponentOrHelper {
        name: FreeVarReference,
        component: Then<ResolvedComponent>,
        helper: Then<u32>,
    },
    OptionalComponentOrHelper {
        name: FreeVarReference,
        component: Then<ResolvedComponent>,
        helper: Then<u32>,
        fallback: Fallback,
    },
    /// Emitted as `ResolveMaybeLocal`.
    Local { name: FreeVarReference },
    /// A strict-mode binding from the template's lexical scope.
    TemplateLocal {
        name: FreeVarReference,
        then: Then<u32>,
    },
}

impl Resolve {
    pub fn name(&self) -> &FreeVarReference {
        match self {
            Resolve::Component { name, .. }
            | Resolve::Helper { name, .. }
            | Resolve::OptionalHelper { name, .. }
            | Resolve::Modifier { name, .. }
            | Resolve::ComponentOrHelper { name, .. }
            | Resolve::OptionalComponentOrHelper { name, .. }
            | Resolve::Local { name }
            | Resolve::TemplateLocal { name, .. } => name,
        }
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Accumulates high-level ops for one region.
#[derive(Debug, Default)]
pub struct OpBuilder {
    ops: Vec<HighLevelOp>,
}

impl OpBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit an instruction without operands.
    pub fn op(&mut self, opcode: Opcode) {
        self.op_with(opcode, Vec::new());
    }

    pub fn op_with(&mut self, opcode: Opcode, operands: impl Into<Vec<Operand>>) {
        self.ops.push(HighLevelOp::Op(BuilderOp {
            opcode,
            operands: operands.into(),
        }));
    }

    pub fn label(&mut self, name: impl Into<Label>) {
        self.ops.push(HighLevelOp::Label(name.into()));
    }

    pub fn start_labels(&mut self) {
        self.ops.push(HighLevelOp::StartLabels);
    }

    pub fn stop_labels(&mut self) {
        self.ops.push(HighLevelOp::StopLabels);
    }

    pub fn resolve(&mut self, resolve: Resolve) {
        self.ops.push(HighLevelOp::Resolve(resolve));
    }

    /// Emit `PushBlock` for `block`, compiled as a separate region.
    pub fn compile_block(&mut self, block: CompilableBlock) {
        self.ops.push(HighLevelOp::CompileBlock(block));
    }

    pub fn push_constant(&mut self, constant: Constant) {
        self.ops.push(HighLevelOp::PushConstant(constant));
    }

    /// Fail the region when it is encoded, for nodes the normalizer never
    /// produces.
    pub fn reject(&mut self, error: SyntaxError) {
        self.ops.push(HighLevelOp::Reject(error));
    }

    /// Append every op from `other`.
    pub fn extend(&mut self, other: OpBuilder) {
        self.ops.extend(other.ops);
    }

    pub fn ops(&self) -> &[HighLevelOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<HighLevelOp> {
        self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Opcodes of the concrete instructions, skipping pseudo-ops.
    pub fn opcodes(&self) -> Vec<Opcode> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                HighLevelOp::Op(op) => Some(op.opcode),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_records_ops_in_order() {
        let mut op = OpBuilder::new();
        op.start_labels();
        op.op(Opcode::PushFrame);
        op.op_with(Opcode::Jump, [Operand::label("END")]);
        op.label("END");
        op.stop_labels();

        assert_eq!(op.len(), 5);
        assert_eq!(op.opcodes(), vec![Opcode::PushFrame, Opcode::Jump]);
        assert!(matches!(op.ops()[3], HighLevelOp::Label(ref name) if name == "END"));
    }

    #[test]
    fn register_operands_use_register_numbers() {
        assert!(matches!(Operand::register(Register::S0), Operand::Imm(4)));
        assert!(matches!(Operand::flag(true), Operand::Imm(1)));
    }

    #[test]
    fn extend_appends() {
        let mut outer = OpBuilder::new();
        outer.op(Opcode::Enter);
        let mut inner = OpBuilder::new();
        inner.op(Opcode::Exit);
        outer.extend(inner);
        assert_eq!(outer.opcodes(), vec![Opcode::Enter, Opcode::Exit]);
    }
}
