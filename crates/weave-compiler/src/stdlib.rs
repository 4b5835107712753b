//! The standard library: shared routines compiled once per session.
//!
//! Templates never inline the logic for appending a value of unknown kind.
//! They push the value and `InvokeStatic` one of these routines instead:
//!
//! - `main`: the entry point that prepares and invokes a root component
//! - `trusting-append` / `cautious-append`: append any value, including
//!   curried components and helpers
//! - `trusting-non-dynamic-append` / `cautious-non-dynamic-append`: append
//!   the result of a helper, which is never invoked again
//!
//! "Trusting" appends insert strings as HTML; cautious ones as text.

use std::rc::Rc;

use weave_core::{CompileError, Handle};
use weave_registry::Resolver;
use weave_syntax::v2::Args;

use crate::constants::ConstantPool;
use crate::encoder::Encoder;
use crate::heap::Heap;
use crate::jobs::JobQueue;
use crate::meta::TemplateMeta;
use crate::opcode::{ContentType, Opcode, Register};
use crate::ops::{OpBuilder, Operand};

const STDLIB_MODULE: &str = "@weave/stdlib";
const ROUTINES: usize = 5;

/// A routine of the standard library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StdlibRoutine {
    Main,
    TrustingNonDynamicAppend,
    CautiousNonDynamicAppend,
    TrustingAppend,
    CautiousAppend,
}

impl StdlibRoutine {
    /// Every routine, in compilation order. The append routines refer to
    /// the non-dynamic ones, so those come first.
    pub const ALL: [StdlibRoutine; ROUTINES] = [
        StdlibRoutine::Main,
        StdlibRoutine::TrustingNonDynamicAppend,
        StdlibRoutine::CautiousNonDynamicAppend,
        StdlibRoutine::TrustingAppend,
        StdlibRoutine::CautiousAppend,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StdlibRoutine::Main => "main",
            StdlibRoutine::TrustingNonDynamicAppend => "trusting-non-dynamic-append",
            StdlibRoutine::CautiousNonDynamicAppend => "cautious-non-dynamic-append",
            StdlibRoutine::TrustingAppend => "trusting-append",
            StdlibRoutine::CautiousAppend => "cautious-append",
        }
    }

    /// The append routine for values of unknown kind.
    pub fn append(trusting: bool) -> Self {
        if trusting {
            StdlibRoutine::TrustingAppend
        } else {
            StdlibRoutine::CautiousAppend
        }
    }

    /// The append routine for helper results.
    pub fn non_dynamic(trusting: bool) -> Self {
        if trusting {
            StdlibRoutine::TrustingNonDynamicAppend
        } else {
            StdlibRoutine::CautiousNonDynamicAppend
        }
    }

    fn trusting(self) -> bool {
        matches!(
            self,
            StdlibRoutine::TrustingAppend | StdlibRoutine::TrustingNonDynamicAppend
        )
    }
}

/// Heap handles of the compiled routines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stdlib {
    handles: [u32; ROUTINES],
}

impl Stdlib {
    pub fn handle(&self, routine: StdlibRoutine) -> u32 {
        self.handles[routine as usize]
    }

    pub fn main(&self) -> u32 {
        self.handle(StdlibRoutine::Main)
    }

    /// Compile every routine into `heap`.
    pub(crate) fn compile(
        heap: &mut Heap,
        constants: &mut ConstantPool,
        jobs: &mut JobQueue,
        resolver: &dyn Resolver,
    ) -> Result<Self, CompileError> {
        let meta = Rc::new(TemplateMeta::synthetic(STDLIB_MODULE));
        let mut handles = [0; ROUTINES];

        for routine in StdlibRoutine::ALL {
            let mut op = OpBuilder::new();
            match routine {
                StdlibRoutine::Main => main(&mut op),
                StdlibRoutine::TrustingNonDynamicAppend
                | StdlibRoutine::CautiousNonDynamicAppend => {
                    std_append(&mut op, routine.trusting(), None)
                }
                StdlibRoutine::TrustingAppend | StdlibRoutine::CautiousAppend => {
                    let non_dynamic = StdlibRoutine::non_dynamic(routine.trusting());
                    std_append(&mut op, routine.trusting(), Some(handles[non_dynamic as usize]))
                }
            }

            let encoder = Encoder::begin(heap, constants, jobs, resolver, None, Rc::clone(&meta));
            let (handle, _) = encoder.encode_all(op, 0)?;
            handles[routine as usize] = handle;
        }

        tracing::debug!(?handles, "compiled standard library");
        Ok(Self { handles })
    }
}

/// Prepare the root component left in `$s0` by the host and invoke it.
fn main(op: &mut OpBuilder) {
    op.op_with(Opcode::Main, [Operand::register(Register::S0)]);
    op.invoke_prepared(false, false, true, |op| {
        op.op_with(Opcode::GetComponentLayout, [Operand::register(Register::S0)]);
        op.op_with(Opcode::PopulateLayout, [Operand::register(Register::S0)]);
    });
}

/// Append the value on top of the stack according to its content type.
///
/// With `non_dynamic`, curried components are invoked and helpers are
/// called, their result appended through the routine at that handle.
/// Without it, components and helpers can only be shown as text.
fn std_append(op: &mut OpBuilder, trusting: bool, non_dynamic: Option<u32>) {
    let no_args = Args::default();
    op.switch_cases(
        |op| op.op(Opcode::DynamicContentType),
        |when| {
            when.when(ContentType::String, move |op| {
                if trusting {
                    op.op(Opcode::AssertSame);
                    op.op(Opcode::AppendHtml);
                } else {
                    op.op(Opcode::AppendText);
                }
            });

            match non_dynamic {
                Some(handle) => {
                    when.when(ContentType::Component, |op| {
                        op.op(Opcode::ResolveCurriedComponent);
                        op.op(Opcode::PushDynamicComponentInstance);
                        op.invoke_bare_component();
                    });
                    when.when(ContentType::Helper, move |op| {
                        op.call_dynamic_append(&no_args, |op| {
                            op.op_with(
                                Opcode::InvokeStatic,
                                [Operand::Handle(Handle::Resolved(handle))],
                            );
                        });
                    });
                }
                None => {
                    when.when(ContentType::Component, |op| op.op(Opcode::AppendText));
                    when.when(ContentType::Helper, |op| op.op(Opcode::AppendText));
                }
            }

            when.when(ContentType::Empty, |op| op.op(Opcode::AppendText));
            when.when(ContentType::SafeString, |op| {
                op.op(Opcode::AssertSame);
                op.op(Opcode::AppendSafeHtml);
            });
            when.when(ContentType::Fragment, |op| {
                op.op(Opcode::AssertSame);
                op.op(Opcode::AppendDocumentFragment);
            });
            when.when(ContentType::Node, |op| {
                op.op(Opcode::AssertSame);
                op.op(Opcode::AppendNode);
            });
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::Instructions;
    use weave_registry::Registry;

    fn compile() -> (Heap, Stdlib) {
        let mut heap = Heap::new();
        let mut constants = ConstantPool::new();
        let mut jobs = JobQueue::default();
        let registry = Registry::new();
        let stdlib = Stdlib::compile(&mut heap, &mut constants, &mut jobs, &registry).unwrap();
        assert!(jobs.is_empty());
        (heap, stdlib)
    }

    fn opcodes(heap: &Heap, handle: u32) -> Vec<Opcode> {
        let entry = heap.entry(handle).copied().unwrap();
        Instructions::new(heap.region(handle).unwrap(), entry.offset)
            .map(|i| i.opcode)
            .collect()
    }

    #[test]
    fn routine_selection() {
        assert_eq!(StdlibRoutine::append(true), StdlibRoutine::TrustingAppend);
        assert_eq!(StdlibRoutine::append(false), StdlibRoutine::CautiousAppend);
        assert_eq!(
            StdlibRoutine::non_dynamic(false),
            StdlibRoutine::CautiousNonDynamicAppend
        );
        assert_eq!(StdlibRoutine::CautiousAppend.name(), "cautious-append");
    }

    #[test]
    fn every_routine_gets_its_own_region() {
        let (heap, stdlib) = compile();
        let mut handles: Vec<_> = StdlibRoutine::ALL.iter().map(|r| stdlib.handle(*r)).collect();
        handles.sort_unstable();
        handles.dedup();
        assert_eq!(handles.len(), StdlibRoutine::ALL.len());
        assert_eq!(heap.placeholders().count(), 0);
    }

    #[test]
    fn main_prepares_the_root_component() {
        let (heap, stdlib) = compile();
        let ops = opcodes(&heap, stdlib.main());
        assert_eq!(ops[0], Opcode::Main);
        assert!(ops.contains(&Opcode::InvokeComponentLayout));
        assert_eq!(ops.last(), Some(&Opcode::Return));
    }

    #[test]
    fn append_calls_the_matching_non_dynamic_routine() {
        let (heap, stdlib) = compile();
        let target = stdlib.handle(StdlibRoutine::TrustingNonDynamicAppend);
        let entry = heap.entry(stdlib.handle(StdlibRoutine::TrustingAppend)).copied().unwrap();
        let statics: Vec<_> = Instructions::new(
            heap.region(stdlib.handle(StdlibRoutine::TrustingAppend)).unwrap(),
            entry.offset,
        )
        .filter(|i| i.opcode == Opcode::InvokeStatic)
        .map(|i| i.operands[0])
        .collect();
        assert_eq!(statics, vec![target]);
    }

    #[test]
    fn non_dynamic_routines_never_invoke() {
        let (heap, stdlib) = compile();
        let ops = opcodes(&heap, stdlib.handle(StdlibRoutine::CautiousNonDynamicAppend));
        assert!(!ops.contains(&Opcode::InvokeStatic));
        assert!(!ops.contains(&Opcode::ResolveCurriedComponent));
        assert!(ops.contains(&Opcode::AppendText));
    }
}
