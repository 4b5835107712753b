//! Expression lowering.
//!
//! Every expression leaves exactly one reference on the stack. Calls run in
//! their own frame and leave their result in `$v0`, which is fetched back
//! onto the stack once the frame is popped.

use weave_core::SyntaxError;
use weave_syntax::v2::{
    Args, CallExpression, ExpressionNode, FreeVarReference, HasBlockExpression, LiteralValue,
    PathExpression, VariableReference,
};
use weave_syntax::{FreeVarNamespace, FreeVarResolution, Keyword, LooseResolution};

use crate::constants::Constant;
use crate::encoding::PrimitiveValue;
use crate::opcode::{CurriedKind, Opcode, Register};
use crate::ops::{OpBuilder, Operand, Resolve, Then};

impl From<&LiteralValue> for PrimitiveValue {
    fn from(value: &LiteralValue) -> Self {
        match value {
            LiteralValue::String(s) => PrimitiveValue::String(s.clone()),
            LiteralValue::Number(n) => PrimitiveValue::Number(*n),
            LiteralValue::Boolean(b) => PrimitiveValue::Boolean(*b),
            LiteralValue::Null => PrimitiveValue::Null,
            LiteralValue::Undefined => PrimitiveValue::Undefined,
        }
    }
}

impl OpBuilder {
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn expr(&mut self, expr: &ExpressionNode) {
        match expr {
            ExpressionNode::Literal(literal) => self.primitive_reference((&literal.value).into()),
            ExpressionNode::Path(path) => self.path(path),
            ExpressionNode::Call(call) => self.call(call),
            ExpressionNode::Interpolate(interpolate) => {
                let count = self.positional(&interpolate.parts);
                self.op_with(Opcode::Concat, [Operand::Imm(count as i32)]);
            }
            ExpressionNode::HasBlock(HasBlockExpression { slot, .. }) => {
                self.op_with(Opcode::GetBlock, [Operand::Imm(*slot as i32)]);
                self.op(Opcode::HasBlock);
            }
            ExpressionNode::HasBlockParams(HasBlockExpression { slot, .. }) => {
                self.op_with(Opcode::GetBlock, [Operand::Imm(*slot as i32)]);
                self.op(Opcode::SpreadBlock);
                self.op(Opcode::CompileBlock);
                self.op(Opcode::HasBlockParams);
            }
            ExpressionNode::Keyword(keyword) => {
                unreachable!("`{}` is only valid as a callee", keyword.keyword.name())
            }
        }
    }

    pub fn primitive_reference(&mut self, value: PrimitiveValue) {
        self.op_with(Opcode::Primitive, [Operand::Primitive(value)]);
        self.op(Opcode::PrimitiveReference);
    }

    fn path(&mut self, path: &PathExpression) {
        match &path.reference {
            VariableReference::This => self.get_variable(0),
            VariableReference::Arg { slot, .. } | VariableReference::Local { slot, .. } => {
                self.get_variable(*slot)
            }
            VariableReference::Free(free) => self.free_value(free),
        }
        for segment in &path.tail {
            self.op_with(Opcode::GetProperty, [Operand::str(segment)]);
        }
    }

    fn get_variable(&mut self, slot: u32) {
        self.op_with(Opcode::GetVariable, [Operand::Imm(slot as i32)]);
    }

    /// A free variable used as a value.
    fn free_value(&mut self, free: &FreeVarReference) {
        let name = free.clone();
        match free.resolution {
            FreeVarResolution::Strict => self.resolve(Resolve::TemplateLocal {
                name,
                then: Box::new(|op, handle| op.constant_reference(handle)),
            }),
            FreeVarResolution::Loose(LooseResolution::Fallback) => {
                self.resolve(Resolve::Local { name })
            }
            FreeVarResolution::Loose(
                LooseResolution::Namespaced {
                    namespace: FreeVarNamespace::Helper,
                    fallback: true,
                }
                | LooseResolution::ComponentOrHelper { fallback: true },
            ) => {
                let fallback = free.clone();
                self.resolve(Resolve::OptionalHelper {
                    name,
                    then: Box::new(|op, handle| op.call_helper(handle, &Args::default())),
                    fallback: Box::new(move |op| op.resolve(Resolve::Local { name: fallback })),
                });
            }
            FreeVarResolution::Loose(
                LooseResolution::Namespaced {
                    namespace: FreeVarNamespace::Helper,
                    fallback: false,
                }
                | LooseResolution::ComponentOrHelper { fallback: false },
            ) => self.resolve(Resolve::Helper {
                name,
                then: Box::new(|op, handle| op.call_helper(handle, &Args::default())),
            }),
            FreeVarResolution::Loose(LooseResolution::Namespaced {
                namespace: FreeVarNamespace::Component,
                ..
            }) => self.resolve(Resolve::Component {
                name,
                then: Box::new(|op, component| op.constant_reference(component.handle)),
            }),
            FreeVarResolution::Loose(LooseResolution::Namespaced {
                namespace: FreeVarNamespace::Modifier,
                ..
            }) => self.resolve(Resolve::Modifier {
                name,
                then: Box::new(|op, handle| op.constant_reference(handle)),
            }),
        }
    }

    fn constant_reference(&mut self, handle: u32) {
        self.op_with(
            Opcode::ConstantReference,
            [Operand::Constant(Constant::Handle(handle))],
        );
    }

    // ========================================================================
    // Calls
    // ========================================================================

    fn call(&mut self, call: &CallExpression) {
        let CallExpression { callee, args, .. } = call;
        if let ExpressionNode::Keyword(keyword) = callee.as_ref() {
            self.keyword_call(keyword.keyword, args);
            return;
        }

        match callee.as_free() {
            Some(free) => {
                let args = args.clone();
                let then: Then<u32> = Box::new(move |op, handle| op.call_helper(handle, &args));
                match free.resolution {
                    FreeVarResolution::Strict => self.resolve(Resolve::TemplateLocal {
                        name: free.clone(),
                        then,
                    }),
                    FreeVarResolution::Loose(_) => self.resolve(Resolve::Helper {
                        name: free.clone(),
                        then,
                    }),
                }
            }
            None => {
                self.expr(callee);
                self.call_dynamic(args);
            }
        }
    }

    /// Call a statically known helper.
    pub fn call_helper(&mut self, handle: u32, args: &Args) {
        self.op(Opcode::PushFrame);
        self.simple_args(&args.positional, &args.named, false);
        self.op_with(Opcode::Helper, [Operand::Constant(Constant::Handle(handle))]);
        self.op(Opcode::PopFrame);
        self.op_with(Opcode::Fetch, [Operand::register(Register::V0)]);
    }

    /// Call the helper reference on top of the stack.
    pub fn call_dynamic(&mut self, args: &Args) {
        self.op(Opcode::PushFrame);
        self.simple_args(&args.positional, &args.named, false);
        self.op(Opcode::DynamicHelper);
        self.op(Opcode::PopFrame);
        self.op_with(Opcode::Pop, [Operand::Imm(1)]);
        self.op_with(Opcode::Fetch, [Operand::register(Register::V0)]);
    }

    /// Call the helper reference on top of the stack and run `append` on its
    /// result while the call frame is still live.
    pub fn call_dynamic_append(&mut self, args: &Args, append: impl FnOnce(&mut OpBuilder)) {
        self.op(Opcode::PushFrame);
        self.simple_args(&args.positional, &args.named, false);
        self.op(Opcode::DynamicHelper);
        self.op_with(Opcode::Fetch, [Operand::register(Register::V0)]);
        append(self);
        self.op(Opcode::PopFrame);
        self.op_with(Opcode::Pop, [Operand::Imm(1)]);
    }

    // ========================================================================
    // Keywords
    // ========================================================================

    fn reject_arity(&mut self, keyword: Keyword, args: &Args, requirement: &str) {
        self.reject(SyntaxError::keyword_arity(keyword.name(), args.span, requirement));
    }

    fn keyword_call(&mut self, keyword: Keyword, args: &Args) {
        match keyword {
            Keyword::If | Keyword::Unless => {
                let (condition, truthy, falsy) = match args.positional.as_slice() {
                    [condition, truthy] => (condition, truthy, None),
                    [condition, truthy, falsy] => (condition, truthy, Some(falsy)),
                    _ => {
                        self.reject_arity(keyword, args, "two or three arguments");
                        return;
                    }
                };
                match falsy {
                    Some(falsy) => self.expr(falsy),
                    None => self.primitive_reference(PrimitiveValue::Undefined),
                }
                self.expr(truthy);
                self.expr(condition);
                if keyword == Keyword::Unless {
                    self.op(Opcode::Not);
                }
                self.op(Opcode::IfInline);
            }
            Keyword::Log => {
                self.op(Opcode::PushFrame);
                self.simple_args(&args.positional, &args.named, false);
                self.op(Opcode::Log);
                self.op(Opcode::PopFrame);
                self.op_with(Opcode::Fetch, [Operand::register(Register::V0)]);
            }
            Keyword::GetDynamicVar => {
                let [name] = args.positional.as_slice() else {
                    self.reject_arity(keyword, args, "a single argument");
                    return;
                };
                self.expr(name);
                self.op(Opcode::GetDynamicVar);
            }
            Keyword::Component => self.curry(CurriedKind::Component, args),
            Keyword::Helper => self.curry(CurriedKind::Helper, args),
            Keyword::Modifier => self.curry(CurriedKind::Modifier, args),
            Keyword::HasBlock
            | Keyword::HasBlockParams
            | Keyword::Yield
            | Keyword::Debugger
            | Keyword::Each
            | Keyword::With
            | Keyword::Let
            | Keyword::InElement
            | Keyword::WithDynamicVars => {
                unreachable!("`{}` is not a callable keyword", keyword.name())
            }
        }
    }

    /// `(component def ...)` and friends: capture the remaining arguments
    /// with the definition.
    fn curry(&mut self, kind: CurriedKind, args: &Args) {
        let Some((definition, rest)) = args.positional.split_first() else {
            unreachable!("curried definitions require a definition argument");
        };
        self.op(Opcode::PushFrame);
        self.simple_args(rest, &args.named, false);
        self.op(Opcode::CaptureArgs);
        self.expr(definition);
        self.op_with(
            Opcode::Curry,
            [Operand::Imm(u8::from(kind) as i32), Operand::IsStrict],
        );
        self.op(Opcode::PopFrame);
        self.op_with(Opcode::Fetch, [Operand::register(Register::V0)]);
    }
}
