//! The growable word heap shared by every compiled region.
//!
//! Each region is reached through a handle: an index into the handle table
//! that records where the region starts, how long it is, and how many local
//! slots it needs. Only one region is open for writing at a time.
//!
//! Operands patched after the fact are reserved with [`Heap::reserve`]. The
//! heap tracks their addresses, so a patched word that happens to equal
//! [`PLACEHOLDER`] is never mistaken for an unpatched one.

use rustc_hash::FxHashSet;

/// Word written where an operand will be patched later.
pub const PLACEHOLDER: u32 = u32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    /// Space is reserved and words are still being pushed.
    Allocated,
    Committed,
}

/// One entry of the handle table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleEntry {
    pub offset: u32,
    pub size: u32,
    pub scope_size: u32,
    pub state: HandleState,
}

#[derive(Debug, Clone, Default)]
pub struct Heap {
    words: Vec<u32>,
    table: Vec<HandleEntry>,
    open: Option<u32>,
    /// Addresses reserved and not yet patched.
    reserved: FxHashSet<u32>,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new region at the end of the heap and return its handle.
    ///
    /// # Panics
    ///
    /// Panics if another region is still open.
    pub fn malloc(&mut self) -> u32 {
        assert!(
            self.open.is_none(),
            "heap region {:?} is still open",
            self.open
        );
        let handle = self.table.len() as u32;
        self.table.push(HandleEntry {
            offset: self.offset(),
            size: 0,
            scope_size: 0,
            state: HandleState::Allocated,
        });
        self.open = Some(handle);
        handle
    }

    /// Close the open region, recording its size and local slot count.
    pub fn finish_malloc(&mut self, handle: u32, scope_size: u32) {
        assert_eq!(self.open, Some(handle), "region {handle} is not the open region");
        let end = self.offset();
        let entry = &mut self.table[handle as usize];
        entry.size = end - entry.offset;
        entry.scope_size = scope_size;
        entry.state = HandleState::Committed;
        self.open = None;
    }

    pub fn push(&mut self, word: u32) {
        self.words.push(word);
    }

    /// Push a placeholder to be patched later, returning its address.
    pub fn reserve(&mut self) -> u32 {
        let addr = self.offset();
        self.words.push(PLACEHOLDER);
        self.reserved.insert(addr);
        addr
    }

    /// Address of the next word to be pushed.
    pub fn offset(&self) -> u32 {
        self.words.len() as u32
    }

    pub fn get_by_addr(&self, addr: u32) -> u32 {
        self.words[addr as usize]
    }

    pub fn set_by_addr(&mut self, addr: u32, word: u32) {
        self.words[addr as usize] = word;
    }

    /// Replace the placeholder at `addr`.
    ///
    /// # Panics
    ///
    /// Panics if `addr` does not hold a placeholder, which means it was
    /// already patched.
    pub fn patch(&mut self, addr: u32, word: u32) {
        assert!(
            self.reserved.remove(&addr),
            "operand at {addr} was patched twice"
        );
        self.set_by_addr(addr, word);
    }

    pub fn entry(&self, handle: u32) -> Option<&HandleEntry> {
        self.table.get(handle as usize)
    }

    /// The words of a committed region.
    pub fn region(&self, handle: u32) -> Option<&[u32]> {
        let entry = self.entry(handle)?;
        let start = entry.offset as usize;
        self.words.get(start..start + entry.size as usize)
    }

    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// Number of allocated handles.
    pub fn handles(&self) -> usize {
        self.table.len()
    }

    /// Forget every outstanding reservation, returning how many there were.
    ///
    /// Only for regions that will never be linked again.
    pub fn release_placeholders(&mut self) -> usize {
        let released = self.reserved.len();
        self.reserved.clear();
        released
    }

    /// Addresses that still hold a placeholder.
    pub fn placeholders(&self) -> impl Iterator<Item = u32> + '_ {
        let mut reserved: Vec<u32> = self.reserved.iter().copied().collect();
        reserved.sort_unstable();
        reserved.into_iter()
    }
}
