//! The finished artifact handed to the runtime.

use crate::constants::{Constant, ConstantPool};
use crate::encoding::Instructions;
use crate::heap::{HandleEntry, Heap};
use crate::stdlib::Stdlib;

/// Everything a session compiled: the heap with every region, the shared
/// constant pool and the standard library handles.
#[derive(Debug, Clone)]
pub struct Program {
    heap: Heap,
    constants: ConstantPool,
    stdlib: Stdlib,
}

impl Program {
    pub(crate) fn new(heap: Heap, constants: ConstantPool, stdlib: Stdlib) -> Self {
        Self {
            heap,
            constants,
            stdlib,
        }
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn constants(&self) -> &ConstantPool {
        &self.constants
    }

    pub fn constant(&self, index: u32) -> Option<&Constant> {
        self.constants.get(index)
    }

    pub fn stdlib(&self) -> &Stdlib {
        &self.stdlib
    }

    pub fn entry(&self, handle: u32) -> Option<&HandleEntry> {
        self.heap.entry(handle)
    }

    /// Decode the region behind `handle`.
    pub fn instructions(&self, handle: u32) -> Option<Instructions<'_>> {
        let entry = self.heap.entry(handle)?;
        let words = self.heap.region(handle)?;
        Some(Instructions::new(words, entry.offset))
    }

    pub fn into_parts(self) -> (Heap, ConstantPool, Stdlib) {
        (self.heap, self.constants, self.stdlib)
    }
}
