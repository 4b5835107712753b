//! Module-level bindings for strict-mode templates.

use rustc_hash::FxHashMap;
use weave_syntax::LexicalScope;

/// Names in scope for a strict-mode template, each bound to an opaque
/// handle the runtime understands.
#[derive(Debug, Clone, Default)]
pub struct LexicalBindings {
    bindings: FxHashMap<String, u32>,
}

impl LexicalBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, name: impl Into<String>, handle: u32) -> &mut Self {
        self.bindings.insert(name.into(), handle);
        self
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl LexicalScope for LexicalBindings {
    fn lookup(&self, name: &str) -> Option<u32> {
        self.bindings.get(name).copied()
    }
}

impl<S: Into<String>> FromIterator<(S, u32)> for LexicalBindings {
    fn from_iter<I: IntoIterator<Item = (S, u32)>>(iter: I) -> Self {
        Self {
            bindings: iter
                .into_iter()
                .map(|(name, handle)| (name.into(), handle))
                .collect(),
        }
    }
}
