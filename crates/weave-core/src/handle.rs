//! Identities for compiled regions of the shared heap.
//!
//! - [`TemplateId`]: a deterministic identity for a template source, derived
//!   from its module name, used to compile each layout only once per session.
//! - [`Handle`]: a heap handle that may still be waiting on an outstanding
//!   compilation job.

use std::fmt;

use xxhash_rust::xxh64::xxh64;

/// Domain marker mixed into template identities.
const TEMPLATE_DOMAIN: u64 = 0x6a09e667f3bcc908;

/// Deterministic identity of a template, computed from its module name.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateId(pub u64);

impl TemplateId {
    pub fn from_module(module_name: &str) -> Self {
        TemplateId(xxh64(module_name.as_bytes(), TEMPLATE_DOMAIN))
    }
}

impl fmt::Debug for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TemplateId({:#018x})", self.0)
    }
}

/// Index of a queued compilation job within one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub u32);

/// A reference to a compiled region of the heap.
///
/// A `Pending` handle is written into the heap as a placeholder and patched
/// exactly once, when the job it names commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handle {
    Pending(JobId),
    Resolved(u32),
}

impl Handle {
    pub fn resolved(&self) -> Option<u32> {
        match self {
            Handle::Resolved(handle) => Some(*handle),
            Handle::Pending(_) => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Handle::Pending(_))
    }
}
