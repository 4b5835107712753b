//! The encoder: high-level ops to heap words.
//!
//! An [`Encoder`] owns one open heap region. It lowers each
//! [`HighLevelOp`] to instructions:
//! - concrete ops are checked against their opcode's arity and encoded
//! - label pseudo-ops open, fill and patch label scopes
//! - [`Resolve`] asks the resolver and encodes whichever branch applies
//! - nested blocks and layouts become jobs referenced by pending handles
//!
//! Lookups that fail are collected as [`LinkError`]s rather than aborting,
//! so one pass reports every missing name. Structural problems in the op
//! stream are compiler bugs and surface as [`EncoderError`]s.

mod labels;

use std::rc::Rc;

use weave_core::{CompileError, EncoderError, Handle, LinkError, LookupKind};
use weave_registry::Resolver;
use weave_syntax::v2::FreeVarReference;

use crate::constants::ConstantPool;
use crate::encoding::{
    CONSTANT_TAG, MAX_OPERANDS, constant_operand, encode_header, encode_primitive,
};
use crate::heap::Heap;
use crate::jobs::{Job, JobQueue};
use crate::meta::TemplateMeta;
use crate::opcode::Opcode;
use crate::ops::{BuilderOp, HighLevelOp, OpBuilder, Operand, Resolve};
use crate::stdlib::Stdlib;

use labels::Labels;

type Result<T> = std::result::Result<T, CompileError>;

/// Encodes ops into a single heap region.
pub(crate) struct Encoder<'s> {
    heap: &'s mut Heap,
    constants: &'s mut ConstantPool,
    jobs: &'s mut JobQueue,
    resolver: &'s dyn Resolver,
    /// `None` while the standard library itself is being built.
    stdlib: Option<&'s Stdlib>,
    meta: Rc<TemplateMeta>,
    labels: Vec<Labels>,
    handle: u32,
    errors: Vec<LinkError>,
}

impl<'s> Encoder<'s> {
    /// Open a new region for `meta`.
    pub fn begin(
        heap: &'s mut Heap,
        constants: &'s mut ConstantPool,
        jobs: &'s mut JobQueue,
        resolver: &'s dyn Resolver,
        stdlib: Option<&'s Stdlib>,
        meta: Rc<TemplateMeta>,
    ) -> Self {
        let handle = heap.malloc();
        Self {
            heap,
            constants,
            jobs,
            resolver,
            stdlib,
            meta,
            labels: Vec::new(),
            handle,
            errors: Vec::new(),
        }
    }

    /// Encode every op of `ops`, then close the region.
    pub fn encode_all(mut self, ops: OpBuilder, scope_size: u32) -> Result<(u32, Vec<LinkError>)> {
        let encoded = ops.into_ops().into_iter().try_for_each(|op| self.encode(op));
        match encoded {
            Ok(()) => self.commit(scope_size),
            Err(err) => {
                // leave the heap usable for the next region
                self.heap.finish_malloc(self.handle, 0);
                Err(err)
            }
        }
    }

    pub fn encode(&mut self, op: HighLevelOp) -> Result<()> {
        match op {
            HighLevelOp::Op(op) => self.push(op),
            HighLevelOp::Label(name) => {
                let offset = self.heap.offset();
                let Some(labels) = self.labels.last_mut() else {
                    return Err(EncoderError::LabelOutsideScope {
                        name: name.into_owned(),
                    }
                    .into());
                };
                labels.label(name, offset);
                Ok(())
            }
            HighLevelOp::StartLabels => {
                self.labels.push(Labels::new());
                Ok(())
            }
            HighLevelOp::StopLabels => {
                let labels = self
                    .labels
                    .pop()
                    .ok_or(EncoderError::UnbalancedLabels { open: 0 })?;
                labels.patch(self.heap)?;
                Ok(())
            }
            HighLevelOp::Resolve(resolve) => self.resolve(resolve),
            HighLevelOp::CompileBlock(block) => {
                let job = self.jobs.enqueue(Job::Block {
                    block,
                    meta: Rc::clone(&self.meta),
                });
                self.push(BuilderOp {
                    opcode: Opcode::PushBlock,
                    operands: vec![Operand::Handle(Handle::Pending(job))],
                })
            }
            HighLevelOp::PushConstant(constant) => self.push(BuilderOp {
                opcode: Opcode::Constant,
                operands: vec![Operand::Constant(constant)],
            }),
            HighLevelOp::Reject(error) => Err(error.into()),
        }
    }

    /// Close the region with a trailing `Return`.
    pub fn commit(mut self, scope_size: u32) -> Result<(u32, Vec<LinkError>)> {
        if !self.labels.is_empty() {
            let open = self.labels.len();
            self.heap.finish_malloc(self.handle, 0);
            return Err(EncoderError::UnbalancedLabels { open }.into());
        }
        self.push(BuilderOp {
            opcode: Opcode::Return,
            operands: Vec::new(),
        })?;
        self.heap.finish_malloc(self.handle, scope_size);
        tracing::trace!(
            module = %self.meta.module_name,
            handle = self.handle,
            scope_size,
            errors = self.errors.len(),
            "committed region"
        );
        Ok((self.handle, self.errors))
    }

    // ========================================================================
    // Instructions
    // ========================================================================

    fn push(&mut self, op: BuilderOp) -> Result<()> {
        let BuilderOp { opcode, operands } = op;
        if operands.len() > MAX_OPERANDS {
            return Err(EncoderError::OperandOverflow {
                opcode: opcode.name(),
                count: operands.len(),
            }
            .into());
        }
        if operands.len() != opcode.arity() {
            return Err(EncoderError::ArityMismatch {
                opcode: opcode.name(),
                expected: opcode.arity(),
                found: operands.len(),
            }
            .into());
        }

        let start = self.heap.offset();
        self.heap.push(encode_header(opcode, operands.len()));
        for operand in operands {
            match self.operand(opcode, operand, start)? {
                Some(word) => self.heap.push(word),
                None => {
                    self.heap.reserve();
                }
            }
        }
        Ok(())
    }

    /// Encode one operand of the instruction starting at `start`.
    ///
    /// `None` reserves the word for a later patch.
    fn operand(&mut self, opcode: Opcode, operand: Operand, start: u32) -> Result<Option<u32>> {
        let at = self.heap.offset();
        let word = match operand {
            Operand::Imm(value) => match u32::try_from(value) {
                Ok(word) if word < CONSTANT_TAG => word,
                _ => {
                    return Err(EncoderError::ImmediateOutOfRange {
                        opcode: opcode.name(),
                        value,
                    }
                    .into());
                }
            },
            Operand::Label(name) => {
                let Some(labels) = self.labels.last_mut() else {
                    return Err(EncoderError::LabelOutsideScope {
                        name: name.into_owned(),
                    }
                    .into());
                };
                labels.target(at, start, name);
                return Ok(None);
            }
            Operand::Str(s) => constant_operand(self.constants.add_string(&s)),
            Operand::Strings(values) => constant_operand(self.constants.add_string_array(&values)),
            Operand::Constant(constant) => constant_operand(self.constants.add(constant)),
            Operand::Primitive(value) => encode_primitive(&value, self.constants),
            Operand::Handle(handle) => return Ok(self.handle_word(handle, at)),
            Operand::Layout(layout) => {
                let handle = self.jobs.layout(&layout, self.meta.owner);
                return Ok(self.handle_word(handle, at));
            }
            Operand::Stdlib(routine) => {
                let stdlib = self.stdlib.ok_or(EncoderError::MissingStdlib {
                    name: routine.name(),
                })?;
                stdlib.handle(routine)
            }
            Operand::IsStrict => self.meta.strict as u32,
        };
        Ok(Some(word))
    }

    fn handle_word(&mut self, handle: Handle, at: u32) -> Option<u32> {
        match self.jobs.resolved(handle) {
            Handle::Resolved(handle) => Some(handle),
            Handle::Pending(job) => {
                self.jobs.fixup(at, job);
                None
            }
        }
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    fn resolve(&mut self, resolve: Resolve) -> Result<()> {
        let owner = self.meta.owner;
        let resolver = self.resolver;
        let mut op = OpBuilder::new();

        match resolve {
            Resolve::Component { name, then } => {
                match resolver.lookup_component(&name.name, owner) {
                    Some(component) => then(&mut op, component),
                    None => self.missing(&name, LookupKind::Component),
                }
            }
            Resolve::Helper { name, then } => match resolver.lookup_helper(&name.name, owner) {
                Some(handle) => then(&mut op, handle),
                None => self.missing(&name, LookupKind::Helper),
            },
            Resolve::OptionalHelper {
                name,
                then,
                fallback,
            } => match resolver.lookup_helper(&name.name, owner) {
                Some(handle) => then(&mut op, handle),
                None => fallback(&mut op),
            },
            Resolve::Modifier { name, then } => {
                match resolver.lookup_modifier(&name.name, owner) {
                    Some(handle) => then(&mut op, handle),
                    None => self.missing(&name, LookupKind::Modifier),
                }
            }
            Resolve::ComponentOrHelper {
                name,
                component,
                helper,
            } => {
                if let Some(found) = resolver.lookup_component(&name.name, owner) {
                    component(&mut op, found);
                } else if let Some(handle) = resolver.lookup_helper(&name.name, owner) {
                    helper(&mut op, handle);
                } else {
                    self.missing(&name, LookupKind::ComponentOrHelper);
                }
            }
            Resolve::OptionalComponentOrHelper {
                name,
                component,
                helper,
                fallback,
            } => {
                if let Some(found) = resolver.lookup_component(&name.name, owner) {
                    component(&mut op, found);
                } else if let Some(handle) = resolver.lookup_helper(&name.name, owner) {
                    helper(&mut op, handle);
                } else {
                    fallback(&mut op);
                }
            }
            Resolve::Local { name } => {
                op.op_with(Opcode::ResolveMaybeLocal, [Operand::Str(name.name)]);
            }
            Resolve::TemplateLocal { name, then } => match self.meta.lexical(&name.name) {
                Some(handle) => then(&mut op, handle),
                None => self.missing(&name, LookupKind::Lexical),
            },
        }

        op.into_ops().into_iter().try_for_each(|op| self.encode(op))
    }

    fn missing(&mut self, name: &FreeVarReference, kind: LookupKind) {
        tracing::debug!(
            module = %self.meta.module_name,
            name = %name.name,
            %kind,
            "unresolved name"
        );
        self.errors.push(LinkError::new(name.name.clone(), kind, name.span));
    }
}
