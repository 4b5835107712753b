//! Deferred compilation of nested blocks and component layouts.
//!
//! A region that references another region before it exists gets a
//! [`Handle::Pending`] operand: the operand address is recorded as a fixup
//! and patched when the job commits. Layouts are memoized by
//! [`TemplateId`], so a component that invokes itself links to its own
//! region instead of recursing.
//!
//! A compile that fails partway leaves regions whose pending operands will
//! never be patched. Every job queued since the last successful compile is
//! therefore suspect, and [`JobQueue::abandon`] forgets the layouts among
//! them even when they committed.

use std::collections::VecDeque;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use weave_core::{Handle, JobId, TemplateId};
use weave_registry::{CompilableTemplate, Owner};

use crate::heap::Heap;
use crate::meta::TemplateMeta;
use crate::ops::CompilableBlock;

pub(crate) enum Job {
    /// A nested block of an already compiling template.
    Block {
        block: CompilableBlock,
        meta: Rc<TemplateMeta>,
    },
    Layout {
        layout: Rc<CompilableTemplate>,
        owner: Owner,
    },
}

#[derive(Debug, Clone, Copy)]
struct Fixup {
    addr: u32,
    job: JobId,
}

#[derive(Default)]
pub(crate) struct JobQueue {
    queue: VecDeque<(JobId, Job)>,
    /// Committed handle of every job, by job id.
    handles: Vec<Option<u32>>,
    layouts: FxHashMap<TemplateId, JobId>,
    fixups: Vec<Fixup>,
    /// Jobs below this id belong to compiles that finished.
    settled: u32,
}

impl JobQueue {
    pub fn enqueue(&mut self, job: Job) -> JobId {
        let id = JobId(self.handles.len() as u32);
        self.handles.push(None);
        self.queue.push_back((id, job));
        id
    }

    /// The handle of `layout`, queueing it the first time it is seen.
    pub fn layout(&mut self, layout: &Rc<CompilableTemplate>, owner: Owner) -> Handle {
        if let Some(&job) = self.layouts.get(&layout.id) {
            return self.handle(job);
        }
        tracing::trace!(module = %layout.module_name, "queueing layout");
        let job = self.enqueue(Job::Layout {
            layout: Rc::clone(layout),
            owner,
        });
        self.layouts.insert(layout.id, job);
        Handle::Pending(job)
    }

    pub fn handle(&self, job: JobId) -> Handle {
        match self.handles.get(job.0 as usize).copied().flatten() {
            Some(handle) => Handle::Resolved(handle),
            None => Handle::Pending(job),
        }
    }

    /// Refresh a handle that may have committed since it was issued.
    pub fn resolved(&self, handle: Handle) -> Handle {
        match handle {
            Handle::Pending(job) => self.handle(job),
            resolved => resolved,
        }
    }

    /// Patch `addr` once `job` commits.
    pub fn fixup(&mut self, addr: u32, job: JobId) {
        self.fixups.push(Fixup { addr, job });
    }

    pub fn next(&mut self) -> Option<(JobId, Job)> {
        self.queue.pop_front()
    }

    /// Record the committed handle of `job` and patch every operand waiting
    /// on it.
    pub fn complete(&mut self, job: JobId, handle: u32, heap: &mut Heap) {
        self.handles[job.0 as usize] = Some(handle);
        let mut patched = 0;
        self.fixups.retain(|fixup| {
            if fixup.job != job {
                return true;
            }
            heap.patch(fixup.addr, handle);
            patched += 1;
            false
        });
        if patched > 0 {
            tracing::trace!(job = job.0, handle, patched, "patched pending handles");
        }
    }

    /// Fixups whose job has not committed yet.
    pub fn outstanding(&self) -> usize {
        self.fixups.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Mark every job so far as part of a finished compile.
    pub fn settle(&mut self) {
        debug_assert!(self.queue.is_empty() && self.fixups.is_empty());
        self.settled = self.handles.len() as u32;
    }

    /// Drop every queued job and pending fixup after a failed compile.
    ///
    /// Layouts queued by the failed compile are forgotten, committed or not,
    /// so the next reference compiles them again. Regions committed by the
    /// failed compile are orphaned and their placeholders released.
    pub fn abandon(&mut self, heap: &mut Heap) {
        let dropped = self.queue.len();
        self.queue.clear();
        self.fixups.clear();
        let settled = self.settled;
        let layouts = self.layouts.len();
        self.layouts.retain(|_, job| job.0 < settled);
        let forgotten = layouts - self.layouts.len();
        let released = heap.release_placeholders();
        self.settled = self.handles.len() as u32;
        if dropped + forgotten + released > 0 {
            tracing::debug!(dropped, forgotten, released, "abandoned queued regions");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weave_syntax::v2;

    fn layout(name: &str) -> Rc<CompilableTemplate> {
        let template = v2::Template {
            body: Vec::new(),
            table: Default::default(),
            span: Default::default(),
        };
        Rc::new(CompilableTemplate::new(name, template))
    }

    #[test]
    fn layouts_are_memoized() {
        let mut jobs = JobQueue::default();
        let nav = layout("components/nav");

        let first = jobs.layout(&nav, Owner::default());
        let second = jobs.layout(&nav, Owner::default());
        assert!(first.is_pending());
        assert_eq!(first, second);
        assert!(jobs.next().is_some());
        assert!(jobs.next().is_none());
    }

    #[test]
    fn completing_a_job_patches_fixups() {
        let mut heap = Heap::new();
        let mut jobs = JobQueue::default();
        let Handle::Pending(job) = jobs.layout(&layout("components/tree"), Owner::default())
        else {
            panic!("fresh layouts are pending");
        };

        let region = heap.malloc();
        let a = heap.reserve();
        jobs.fixup(a, job);
        let b = heap.reserve();
        jobs.fixup(b, job);
        heap.finish_malloc(region, 0);
        assert_eq!(jobs.outstanding(), 2);

        jobs.complete(job, 5, &mut heap);
        assert_eq!(jobs.outstanding(), 0);
        assert_eq!(heap.words(), &[5, 5]);
        assert_eq!(jobs.handle(job), Handle::Resolved(5));
    }

    #[test]
    fn abandoned_layouts_are_queued_again() {
        let mut jobs = JobQueue::default();
        let tree = layout("components/tree");
        let first = jobs.layout(&tree, Owner::default());
        jobs.fixup(0, JobId(0));
        jobs.abandon(&mut Heap::new());

        assert!(jobs.is_empty());
        assert_eq!(jobs.outstanding(), 0);
        let second = jobs.layout(&tree, Owner::default());
        assert_ne!(first, second);
        assert!(jobs.next().is_some());
    }

    #[test]
    fn layouts_committed_by_a_failed_compile_are_forgotten() {
        let mut heap = Heap::new();
        let mut jobs = JobQueue::default();
        let card = layout("components/card");
        let Handle::Pending(job) = jobs.layout(&card, Owner::default()) else {
            panic!("fresh layouts are pending");
        };
        let (id, _) = jobs.next().unwrap();
        assert_eq!(id, job);

        // the layout commits with a nested block that never does
        let region = heap.malloc();
        let block = jobs.enqueue(Job::Layout {
            layout: layout("components/card-body"),
            owner: Owner::default(),
        });
        let at = heap.reserve();
        jobs.fixup(at, block);
        heap.finish_malloc(region, 0);
        jobs.complete(job, region, &mut heap);
        assert_eq!(jobs.layout(&card, Owner::default()), Handle::Resolved(region));

        jobs.abandon(&mut heap);
        assert_eq!(heap.placeholders().count(), 0);
        assert!(jobs.layout(&card, Owner::default()).is_pending());
    }

    #[test]
    fn settled_layouts_survive_a_failed_compile() {
        let mut heap = Heap::new();
        let mut jobs = JobQueue::default();
        let card = layout("components/card");
        let Handle::Pending(job) = jobs.layout(&card, Owner::default()) else {
            panic!("fresh layouts are pending");
        };
        jobs.next();
        jobs.complete(job, 3, &mut heap);
        jobs.settle();

        jobs.layout(&layout("components/other"), Owner::default());
        jobs.abandon(&mut heap);
        assert_eq!(jobs.layout(&card, Owner::default()), Handle::Resolved(3));
    }

    #[test]
    fn memoized_layouts_resolve_after_completion() {
        let mut heap = Heap::new();
        let mut jobs = JobQueue::default();
        let tree = layout("components/tree");
        let Handle::Pending(job) = jobs.layout(&tree, Owner::default()) else {
            panic!("fresh layouts are pending");
        };
        jobs.complete(job, 2, &mut heap);
        assert_eq!(jobs.layout(&tree, Owner::default()), Handle::Resolved(2));
    }
}
