//! Compilation sessions.
//!
//! A [`CompileSession`] owns the heap and constant pool shared by every
//! template it compiles. Compiling a template:
//!
//! 1. normalizes the raw tree, failing on syntax and resolution errors
//! 2. compiles the body to ops and encodes them as one heap region
//! 3. drains the job queue, encoding every nested block and statically
//!    linked layout as its own region and patching the handles that were
//!    waiting on it
//!
//! When `compile` returns, every handle reachable from the template points
//! at a committed region.

use std::rc::Rc;

use weave_core::{CompileError, Handle, LinkError};
use weave_registry::{CompilableTemplate, Owner, Resolver};
use weave_syntax::v2::ContentNode;
use weave_syntax::{normalize, v1, v2};

use crate::compile::{StatementCompiler, compile_statements};
use crate::constants::ConstantPool;
use crate::encoder::Encoder;
use crate::heap::Heap;
use crate::jobs::{Job, JobQueue};
use crate::meta::TemplateMeta;
use crate::ops::{CompilableBlock, OpBuilder};
use crate::options::CompileOptions;
use crate::program::Program;
use crate::stdlib::Stdlib;

type Result<T> = std::result::Result<T, CompileError>;

/// The handle of a compiled template and the names that failed to link.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileOutput {
    pub handle: u32,
    pub errors: Vec<LinkError>,
}

impl CompileOutput {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Compiles templates into one shared program.
pub struct CompileSession<'r> {
    resolver: &'r dyn Resolver,
    heap: Heap,
    constants: ConstantPool,
    jobs: JobQueue,
    stdlib: Stdlib,
}

impl<'r> CompileSession<'r> {
    /// Start a session, compiling the standard library up front.
    pub fn new(resolver: &'r dyn Resolver) -> Result<Self> {
        let mut heap = Heap::new();
        let mut constants = ConstantPool::new();
        let mut jobs = JobQueue::default();
        let stdlib = Stdlib::compile(&mut heap, &mut constants, &mut jobs, resolver)?;
        Ok(Self {
            resolver,
            heap,
            constants,
            jobs,
            stdlib,
        })
    }

    /// Compile `template`, failing on the first name that does not link.
    pub fn compile(&mut self, template: &v1::Template<'_>, options: &CompileOptions) -> Result<u32> {
        let output = self.compile_lenient(template, options)?;
        match output.errors.into_iter().next() {
            Some(error) => Err(error.into()),
            None => Ok(output.handle),
        }
    }

    /// Compile `template`, reporting names that do not link alongside the
    /// handle instead of failing.
    ///
    /// Syntax and resolution errors are still fatal.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn compile_lenient(
        &mut self,
        template: &v1::Template<'_>,
        options: &CompileOptions,
    ) -> Result<CompileOutput> {
        let normalized = normalize(template, options.normalize_options())?;
        self.compile_normalized(&normalized, options)
    }

    /// Compile an already normalized template.
    pub fn compile_normalized(
        &mut self,
        template: &v2::Template,
        options: &CompileOptions,
    ) -> Result<CompileOutput> {
        let meta = Rc::new(TemplateMeta::new(template, options));
        let result = self.compile_region(&meta, &template.body).and_then(|(handle, mut errors)| {
            self.drain(&mut errors)?;
            Ok(CompileOutput { handle, errors })
        });
        self.settle(meta.module_name.as_str(), result)
    }

    /// Compile a component layout on behalf of `owner`.
    ///
    /// Layouts are compiled once per session; later calls return the same
    /// handle.
    pub fn compile_layout(
        &mut self,
        layout: &Rc<CompilableTemplate>,
        owner: Owner,
    ) -> Result<CompileOutput> {
        let pending = self.jobs.layout(layout, owner);
        let mut errors = Vec::new();
        let result = self.drain(&mut errors).map(|()| {
            let handle = match self.jobs.resolved(pending) {
                Handle::Resolved(handle) => handle,
                Handle::Pending(job) => unreachable!("layout job {job:?} outlived the queue"),
            };
            CompileOutput { handle, errors }
        });
        self.settle(&layout.module_name, result)
    }

    pub fn stdlib(&self) -> &Stdlib {
        &self.stdlib
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn constants(&self) -> &ConstantPool {
        &self.constants
    }

    /// Operands still waiting on a region that has not committed.
    pub fn outstanding_fixups(&self) -> usize {
        self.jobs.outstanding()
    }

    /// End the session and hand the program to the runtime.
    pub fn finish(self) -> Program {
        Program::new(self.heap, self.constants, self.stdlib)
    }

    // ========================================================================
    // Regions
    // ========================================================================

    fn compile_region(
        &mut self,
        meta: &Rc<TemplateMeta>,
        body: &[ContentNode],
    ) -> Result<(u32, Vec<LinkError>)> {
        let ops = compile_statements(self.resolver, meta, body)?;
        self.encode(meta, ops)
    }

    fn encode(&mut self, meta: &Rc<TemplateMeta>, ops: OpBuilder) -> Result<(u32, Vec<LinkError>)> {
        Encoder::begin(
            &mut self.heap,
            &mut self.constants,
            &mut self.jobs,
            self.resolver,
            Some(&self.stdlib),
            Rc::clone(meta),
        )
        .encode_all(ops, meta.scope_size)
    }

    /// Encode queued jobs until none are left.
    #[cfg_attr(feature = "profiling", profiling::function)]
    fn drain(&mut self, errors: &mut Vec<LinkError>) -> Result<()> {
        let mut drained = 0usize;
        while let Some((id, job)) = self.jobs.next() {
            let (handle, job_errors) = match job {
                Job::Block {
                    block: CompilableBlock::Block(block),
                    meta,
                } => self.compile_region(&meta, &block.body)?,
                Job::Block {
                    block: CompilableBlock::Attributes(params),
                    meta,
                } => {
                    let mut compiler = StatementCompiler::new(self.resolver, &meta);
                    compiler.compile_attributes(&params);
                    self.encode(&meta, compiler.into_ops())?
                }
                Job::Layout { layout, owner } => {
                    let meta = Rc::new(TemplateMeta::for_layout(&layout, owner));
                    self.compile_region(&meta, &layout.template.body)?
                }
            };
            self.jobs.complete(id, handle, &mut self.heap);
            errors.extend(job_errors);
            drained += 1;
        }
        if drained > 0 {
            tracing::debug!(drained, "drained queued regions");
        }
        Ok(())
    }

    /// Log the outcome of a compile and drop leftover jobs when it failed.
    fn settle(
        &mut self,
        module_name: &str,
        result: Result<CompileOutput>,
    ) -> Result<CompileOutput> {
        match &result {
            Ok(output) => {
                let size = self.heap.entry(output.handle).map_or(0, |entry| entry.size);
                tracing::debug!(
                    module = module_name,
                    handle = output.handle,
                    size,
                    errors = output.errors.len(),
                    "compiled template"
                );
                self.jobs.settle();
            }
            Err(error) => {
                tracing::debug!(module = module_name, %error, "compile failed");
                self.jobs.abandon(&mut self.heap);
            }
        }
        result
    }
}
