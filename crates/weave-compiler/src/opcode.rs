//! Opcode definitions for the template VM.
//!
//! Opcodes come in two families sharing one byte of the instruction header:
//! - machine ops (`0..16`) drive frames, calls and jumps
//! - builder ops (`16..`) manipulate the element builder, references,
//!   arguments, scopes and component lifecycles
//!
//! Every opcode has a fixed operand count, checked by the encoder.

#![allow(ambiguous_associated_items)]

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// First discriminant of the builder family.
pub const FIRST_BUILDER_OP: u8 = 16;

macro_rules! opcodes {
    ($(
        $(#[$doc:meta])*
        $variant:ident $(= $disc:literal)? => $name:literal, $arity:literal;
    )*) => {
        /// Bytecode opcodes.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
        #[repr(u8)]
        pub enum Opcode {
            $(
                $(#[$doc])*
                $variant $(= $disc)?,
            )*
        }

        impl Opcode {
            /// Get the name of this opcode for disassembly.
            pub fn name(self) -> &'static str {
                match self {
                    $(Opcode::$variant => $name,)*
                }
            }

            /// Number of operand words that follow the header.
            pub fn arity(self) -> usize {
                match self {
                    $(Opcode::$variant => $arity,)*
                }
            }
        }
    };
}

opcodes! {
    // ==========================================================================
    // Machine
    // ==========================================================================
    PushFrame = 0 => "PUSH_FRAME", 0;
    PopFrame => "POP_FRAME", 0;
    /// Call the block handle on top of the stack.
    InvokeVirtual => "INVOKE_VIRTUAL", 0;
    /// Operand: heap handle.
    InvokeStatic => "INVOKE_STATIC", 1;
    /// Operand: relative label offset.
    Jump => "JUMP", 1;
    Return => "RETURN", 0;
    /// Operand: relative label offset of the return address.
    ReturnTo => "RETURN_TO", 1;

    // ==========================================================================
    // Content
    // ==========================================================================
    /// Operand: string constant.
    Text = 16 => "TEXT", 1;
    /// Operand: string constant.
    Comment => "COMMENT", 1;
    AppendHtml => "APPEND_HTML", 0;
    AppendSafeHtml => "APPEND_SAFE_HTML", 0;
    AppendDocumentFragment => "APPEND_DOCUMENT_FRAGMENT", 0;
    AppendNode => "APPEND_NODE", 0;
    AppendText => "APPEND_TEXT", 0;

    // ==========================================================================
    // Elements
    // ==========================================================================
    /// Operand: tag name constant.
    OpenElement => "OPEN_ELEMENT", 1;
    /// Operand: tag name constant.
    OpenElementWithSplat => "OPEN_ELEMENT_WITH_SPLAT", 1;
    FlushElement => "FLUSH_ELEMENT", 0;
    CloseElement => "CLOSE_ELEMENT", 0;
    /// Operands: name constant, value constant.
    StaticAttr => "STATIC_ATTR", 2;
    /// Operands: name constant, trusting flag.
    DynamicAttr => "DYNAMIC_ATTR", 2;
    /// Operands: name constant, trusting flag.
    ComponentAttr => "COMPONENT_ATTR", 2;
    /// Operands: name constant, value constant.
    StaticComponentAttr => "STATIC_COMPONENT_ATTR", 2;
    /// Operand: modifier definition constant.
    Modifier => "MODIFIER", 1;
    DynamicModifier => "DYNAMIC_MODIFIER", 0;
    PushRemoteElement => "PUSH_REMOTE_ELEMENT", 0;
    PopRemoteElement => "POP_REMOTE_ELEMENT", 0;

    // ==========================================================================
    // Stack and references
    // ==========================================================================
    /// Operand: constant.
    Constant => "CONSTANT", 1;
    /// Operand: constant.
    ConstantReference => "CONSTANT_REFERENCE", 1;
    /// Operand: encoded primitive.
    Primitive => "PRIMITIVE", 1;
    PrimitiveReference => "PRIMITIVE_REFERENCE", 0;
    /// Operands: register, offset.
    Dup => "DUP", 2;
    /// Operand: count.
    Pop => "POP", 1;
    /// Operand: register.
    Load => "LOAD", 1;
    /// Operand: register.
    Fetch => "FETCH", 1;
    /// Operand: symbol slot.
    GetVariable => "GET_VARIABLE", 1;
    /// Operand: symbol slot.
    SetVariable => "SET_VARIABLE", 1;
    /// Operand: symbol slot.
    SetBlock => "SET_BLOCK", 1;
    /// Operand: property name constant.
    GetProperty => "GET_PROPERTY", 1;
    /// Operand: block symbol slot.
    GetBlock => "GET_BLOCK", 1;
    SpreadBlock => "SPREAD_BLOCK", 0;
    CompileBlock => "COMPILE_BLOCK", 0;
    /// Operand: heap handle of a compiled block.
    PushBlock => "PUSH_BLOCK", 1;
    PushBlockScope => "PUSH_BLOCK_SCOPE", 0;
    HasBlock => "HAS_BLOCK", 0;
    HasBlockParams => "HAS_BLOCK_PARAMS", 0;
    /// Operand: part count.
    Concat => "CONCAT", 1;
    /// Operand: name constant.
    ResolveMaybeLocal => "RESOLVE_MAYBE_LOCAL", 1;
    IfInline => "IF_INLINE", 0;
    Not => "NOT", 0;
    GetDynamicVar => "GET_DYNAMIC_VAR", 0;
    Log => "LOG", 0;

    // ==========================================================================
    // Helpers and arguments
    // ==========================================================================
    /// Operands: curried kind, strict flag.
    Curry => "CURRY", 2;
    /// Operand: helper definition constant.
    Helper => "HELPER", 1;
    DynamicHelper => "DYNAMIC_HELPER", 0;
    PushEmptyArgs => "PUSH_EMPTY_ARGS", 0;
    /// Operands: names constant, block names constant, flags.
    PushArgs => "PUSH_ARGS", 3;
    /// Operand: register.
    PrepareArgs => "PREPARE_ARGS", 1;
    CaptureArgs => "CAPTURE_ARGS", 0;
    ToBoolean => "TO_BOOLEAN", 0;

    // ==========================================================================
    // Scopes
    // ==========================================================================
    /// Operand: symbol count.
    RootScope => "ROOT_SCOPE", 1;
    /// Operand: register.
    VirtualRootScope => "VIRTUAL_ROOT_SCOPE", 1;
    ChildScope => "CHILD_SCOPE", 0;
    PopScope => "POP_SCOPE", 0;
    PushDynamicScope => "PUSH_DYNAMIC_SCOPE", 0;
    /// Operand: names constant.
    BindDynamicScope => "BIND_DYNAMIC_SCOPE", 1;
    PopDynamicScope => "POP_DYNAMIC_SCOPE", 0;
    /// Operand: eval flag. Expects the symbol names on the stack.
    Debugger => "DEBUGGER", 1;

    // ==========================================================================
    // Control flow
    // ==========================================================================
    /// Operand: number of stack values the updatable region owns.
    Enter => "ENTER", 1;
    Exit => "EXIT", 0;
    /// Operand: relative label offset.
    JumpIf => "JUMP_IF", 1;
    /// Operand: relative label offset.
    JumpUnless => "JUMP_UNLESS", 1;
    /// Operands: relative label offset, comparand.
    JumpEq => "JUMP_EQ", 2;
    AssertSame => "ASSERT_SAME", 0;
    /// Operands: body label, else label.
    EnterList => "ENTER_LIST", 2;
    ExitList => "EXIT_LIST", 0;
    /// Operand: break label.
    Iterate => "ITERATE", 1;
    /// Operand: register.
    Main => "MAIN", 1;
    ContentType => "CONTENT_TYPE", 0;
    DynamicContentType => "DYNAMIC_CONTENT_TYPE", 0;

    // ==========================================================================
    // Components
    // ==========================================================================
    /// Operand: component definition constant.
    PushComponentDefinition => "PUSH_COMPONENT_DEFINITION", 1;
    PushDynamicComponentInstance => "PUSH_DYNAMIC_COMPONENT_INSTANCE", 0;
    ResolveDynamicComponent => "RESOLVE_DYNAMIC_COMPONENT", 0;
    ResolveCurriedComponent => "RESOLVE_CURRIED_COMPONENT", 0;
    /// Operand: register.
    BeginComponentTransaction => "BEGIN_COMPONENT_TRANSACTION", 1;
    CommitComponentTransaction => "COMMIT_COMPONENT_TRANSACTION", 0;
    /// Operands: has-default-block flag, register.
    CreateComponent => "CREATE_COMPONENT", 2;
    /// Operand: register.
    RegisterComponentDestructor => "REGISTER_COMPONENT_DESTRUCTOR", 1;
    /// Operand: register.
    GetComponentSelf => "GET_COMPONENT_SELF", 1;
    /// Operand: register.
    GetComponentLayout => "GET_COMPONENT_LAYOUT", 1;
    /// Operand: heap handle of a statically linked layout.
    PushLayout => "PUSH_LAYOUT", 1;
    /// Operand: register.
    PopulateLayout => "POPULATE_LAYOUT", 1;
    /// Operand: register.
    SetNamedVariables => "SET_NAMED_VARIABLES", 1;
    /// Operand: register.
    SetBlocks => "SET_BLOCKS", 1;
    /// Operand: register.
    SetupForEval => "SETUP_FOR_EVAL", 1;
    /// Operand: register.
    InvokeComponentLayout => "INVOKE_COMPONENT_LAYOUT", 1;
    /// Operand: register.
    DidRenderLayout => "DID_RENDER_LAYOUT", 1;
    InvokeYield => "INVOKE_YIELD", 0;
}

impl Opcode {
    /// Decode an opcode from its byte, if valid.
    pub fn from_u8(byte: u8) -> Option<Self> {
        Self::try_from(byte).ok()
    }

    /// Machine ops set the machine bit in their instruction header.
    pub fn is_machine(self) -> bool {
        u8::from(self) < FIRST_BUILDER_OP
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// VM registers addressable by `Load`, `Fetch` and `Dup`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Register {
    /// Program counter.
    Pc = 0,
    /// Return address.
    Ra,
    /// Frame pointer.
    Fp,
    /// Stack pointer.
    Sp,
    /// Saved register holding the component under construction.
    S0,
    S1,
    T0,
    T1,
    /// Return value of the last call.
    V0,
}

/// What a dynamic value turned out to be at runtime, compared by `JumpEq`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum ContentType {
    Component = 0,
    Helper,
    String,
    Empty,
    SafeString,
    Fragment,
    Node,
}

/// The kind of definition a `Curry` instruction wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum CurriedKind {
    Component = 0,
    Helper,
    Modifier,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_repr() {
        assert_eq!(Opcode::PushFrame as u8, 0);
        assert_eq!(Opcode::ReturnTo as u8, 6);
        assert_eq!(Opcode::Text as u8, FIRST_BUILDER_OP);
        assert_eq!(Opcode::Comment as u8, FIRST_BUILDER_OP + 1);
    }

    #[test]
    fn opcode_from_u8() {
        assert_eq!(Opcode::from_u8(0), Some(Opcode::PushFrame));
        assert_eq!(Opcode::from_u8(16), Some(Opcode::Text));
        assert_eq!(Opcode::from_u8(Opcode::InvokeYield as u8), Some(Opcode::InvokeYield));
        // gap between the two families
        assert_eq!(Opcode::from_u8(10), None);
        assert_eq!(Opcode::from_u8(255), None);
    }

    #[test]
    fn opcode_name() {
        assert_eq!(Opcode::PushFrame.name(), "PUSH_FRAME");
        assert_eq!(Opcode::OpenElementWithSplat.name(), "OPEN_ELEMENT_WITH_SPLAT");
        assert_eq!(Opcode::InvokeYield.to_string(), "INVOKE_YIELD");
    }

    #[test]
    fn machine_family() {
        assert!(Opcode::PushFrame.is_machine());
        assert!(Opcode::ReturnTo.is_machine());
        assert!(!Opcode::Text.is_machine());
        assert!(!Opcode::InvokeYield.is_machine());
    }

    #[test]
    fn operand_counts() {
        assert_eq!(Opcode::Return.arity(), 0);
        assert_eq!(Opcode::Jump.arity(), 1);
        assert_eq!(Opcode::Dup.arity(), 2);
        assert_eq!(Opcode::PushArgs.arity(), 3);
        assert_eq!(Opcode::EnterList.arity(), 2);
    }

    #[test]
    fn registers_and_content_types() {
        assert_eq!(u8::from(Register::Fp), 2);
        assert_eq!(u8::from(Register::V0), 8);
        assert_eq!(ContentType::try_from(4).ok(), Some(ContentType::SafeString));
        assert_eq!(u8::from(CurriedKind::Modifier), 2);
    }
}
