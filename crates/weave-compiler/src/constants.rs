//! Constant pool shared by every template compiled in a session.
//!
//! The constant pool stores values referenced by instruction operands:
//! strings, string arrays (argument and block names), numbers that do not
//! fit inline, and opaque definition handles returned by the resolver.

use ordered_float::OrderedFloat;
use rustc_hash::FxHashMap;

/// Values stored in the constant pool.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    String(String),
    StringArray(Vec<String>),
    Number(f64),
    /// A component, helper or modifier definition handle.
    Handle(u32),
}

/// Session-wide constant pool with deduplication.
///
/// Equal values always share one index, so emitting the same string from
/// many templates costs one entry.
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    constants: Vec<Constant>,
    index: FxHashMap<ConstantKey, u32>,
}

/// Hashable mirror of [`Constant`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ConstantKey {
    String(String),
    StringArray(Vec<String>),
    Number(OrderedFloat<f64>),
    Handle(u32),
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or get existing constant, returns index.
    pub fn add(&mut self, constant: Constant) -> u32 {
        let key = Self::to_key(&constant);

        if let Some(&idx) = self.index.get(&key) {
            return idx;
        }

        let idx = self.constants.len() as u32;
        self.constants.push(constant);
        self.index.insert(key, idx);
        idx
    }

    pub fn add_string(&mut self, value: &str) -> u32 {
        self.add(Constant::String(value.to_string()))
    }

    pub fn add_string_array(&mut self, values: &[String]) -> u32 {
        self.add(Constant::StringArray(values.to_vec()))
    }

    pub fn add_number(&mut self, value: f64) -> u32 {
        self.add(Constant::Number(value))
    }

    pub fn add_handle(&mut self, handle: u32) -> u32 {
        self.add(Constant::Handle(handle))
    }

    /// Get constant by index.
    pub fn get(&self, index: u32) -> Option<&Constant> {
        self.constants.get(index as usize)
    }

    /// The string at `index`, if that entry is a string.
    pub fn string(&self, index: u32) -> Option<&str> {
        match self.get(index)? {
            Constant::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn constants(&self) -> &[Constant] {
        &self.constants
    }

    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    fn to_key(constant: &Constant) -> ConstantKey {
        match constant {
            Constant::String(s) => ConstantKey::String(s.clone()),
            Constant::StringArray(v) => ConstantKey::StringArray(v.clone()),
            Constant::Number(n) => ConstantKey::Number(OrderedFloat(*n)),
            Constant::Handle(h) => ConstantKey::Handle(*h),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_pool_is_empty() {
        let pool = ConstantPool::new();
        assert!(pool.is_empty());
        assert_eq!(pool.len(), 0);
    }

    #[test]
    fn deduplication() {
        let mut pool = ConstantPool::new();
        let a = pool.add_string("hello");
        let b = pool.add_number(1.5);
        let c = pool.add_string("hello");

        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn string_arrays_dedup_by_content() {
        let mut pool = ConstantPool::new();
        let names = vec!["@title".to_string(), "@body".to_string()];
        let a = pool.add_string_array(&names);
        let b = pool.add_string_array(&names);
        let reordered = pool.add_string_array(&[names[1].clone(), names[0].clone()]);

        assert_eq!(a, b);
        assert_ne!(a, reordered);
    }

    #[test]
    fn kinds_do_not_collide() {
        let mut pool = ConstantPool::new();
        let number = pool.add_number(3.0);
        let handle = pool.add_handle(3);
        let string = pool.add_string("3");

        assert_ne!(number, handle);
        assert_ne!(handle, string);
        assert_eq!(pool.get(handle), Some(&Constant::Handle(3)));
    }

    #[test]
    fn nan_is_deduplicated() {
        let mut pool = ConstantPool::new();
        let a = pool.add_number(f64::NAN);
        let b = pool.add_number(f64::NAN);
        assert_eq!(a, b);
    }

    #[test]
    fn string_lookup() {
        let mut pool = ConstantPool::new();
        let idx = pool.add_string("div");
        let handle = pool.add_handle(0);
        assert_eq!(pool.string(idx), Some("div"));
        assert_eq!(pool.string(handle), None);
        assert_eq!(pool.string(99), None);
    }
}
