//! In-memory definition registry.
//!
//! [`Registry`] hands out sequential definition handles and answers
//! [`Resolver`] lookups by exact name. Owners are not partitioned: every
//! lookup sees every registration.
//!
//! Components that render themselves are registered in two steps, because
//! their layout can only be normalized once the name is known:
//!
//! ```
//! use std::rc::Rc;
//! use bumpalo::Bump;
//! use weave_registry::{CompilableTemplate, ComponentCapabilities, Registry};
//! use weave_syntax::{NormalizeOptions, normalize, v1::Builder};
//!
//! let mut registry = Registry::new();
//! registry.register_component("Tree", ComponentCapabilities::empty(), None);
//!
//! let arena = Bump::new();
//! let b = Builder::new(&arena);
//! let layout = normalize(&b.template(&[b.element("Tree").build()]), &NormalizeOptions::new())?;
//! registry.set_layout("Tree", Rc::new(CompilableTemplate::new("components/tree", layout)));
//! # Ok::<(), weave_core::CompileError>(())
//! ```

use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::resolver::{CompilableTemplate, ComponentCapabilities, Owner, ResolvedComponent, Resolver};

/// Name-keyed storage for components, helpers and modifiers.
#[derive(Debug, Default)]
pub struct Registry {
    components: FxHashMap<String, ResolvedComponent>,
    helpers: FxHashMap<String, u32>,
    modifiers: FxHashMap<String, u32>,
    next_handle: u32,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_handle(&mut self) -> u32 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    // ==========================================================================
    // Registration
    // ==========================================================================

    /// Register a component, returning its definition handle.
    ///
    /// Re-registering a name replaces the previous definition.
    pub fn register_component(
        &mut self,
        name: impl Into<String>,
        capabilities: ComponentCapabilities,
        layout: Option<Rc<CompilableTemplate>>,
    ) -> u32 {
        let handle = self.allocate_handle();
        self.components.insert(
            name.into(),
            ResolvedComponent {
                handle,
                capabilities,
                layout,
            },
        );
        handle
    }

    /// Attach a layout to an already registered component.
    ///
    /// Returns `false` when no component named `name` exists.
    pub fn set_layout(&mut self, name: &str, layout: Rc<CompilableTemplate>) -> bool {
        match self.components.get_mut(name) {
            Some(component) => {
                component.layout = Some(layout);
                true
            }
            None => false,
        }
    }

    pub fn register_helper(&mut self, name: impl Into<String>) -> u32 {
        let handle = self.allocate_handle();
        self.helpers.insert(name.into(), handle);
        handle
    }

    pub fn register_modifier(&mut self, name: impl Into<String>) -> u32 {
        let handle = self.allocate_handle();
        self.modifiers.insert(name.into(), handle);
        handle
    }

    // ==========================================================================
    // Queries
    // ==========================================================================

    pub fn component(&self, name: &str) -> Option<&ResolvedComponent> {
        self.components.get(name)
    }

    pub fn helper(&self, name: &str) -> Option<u32> {
        self.helpers.get(name).copied()
    }

    pub fn modifier(&self, name: &str) -> Option<u32> {
        self.modifiers.get(name).copied()
    }

    /// Total number of registered definitions.
    pub fn len(&self) -> usize {
        self.components.len() + self.helpers.len() + self.modifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Resolver for Registry {
    fn lookup_component(&self, name: &str, owner: Owner) -> Option<ResolvedComponent> {
        let found = self.components.get(name).cloned();
        tracing::trace!(name, ?owner, found = found.is_some(), "component lookup");
        found
    }

    fn lookup_helper(&self, name: &str, owner: Owner) -> Option<u32> {
        let found = self.helper(name);
        tracing::trace!(name, ?owner, found = found.is_some(), "helper lookup");
        found
    }

    fn lookup_modifier(&self, name: &str, owner: Owner) -> Option<u32> {
        let found = self.modifier(name);
        tracing::trace!(name, ?owner, found = found.is_some(), "modifier lookup");
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weave_syntax::v2;

    fn empty_layout(module: &str) -> Rc<CompilableTemplate> {
        let template = v2::Template {
            body: Vec::new(),
            table: Default::default(),
            span: Default::default(),
        };
        Rc::new(CompilableTemplate::new(module, template))
    }

    #[test]
    fn handles_are_sequential_across_kinds() {
        let mut registry = Registry::new();
        let helper = registry.register_helper("t");
        let modifier = registry.register_modifier("on");
        let component = registry.register_component("Nav", ComponentCapabilities::empty(), None);
        assert_eq!((helper, modifier, component), (0, 1, 2));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn namespaces_do_not_overlap() {
        let mut registry = Registry::new();
        registry.register_helper("format");
        assert!(registry.lookup_helper("format", Owner::default()).is_some());
        assert!(registry.lookup_modifier("format", Owner::default()).is_none());
        assert!(registry.lookup_component("format", Owner::default()).is_none());
    }

    #[test]
    fn layouts_can_be_attached_after_registration() {
        let mut registry = Registry::new();
        registry.register_component("Tree", ComponentCapabilities::DYNAMIC_TAG, None);
        assert!(registry.set_layout("Tree", empty_layout("components/tree")));
        assert!(!registry.set_layout("Missing", empty_layout("components/missing")));

        let tree = registry.lookup_component("Tree", Owner(1)).unwrap();
        assert_eq!(tree.capabilities, ComponentCapabilities::DYNAMIC_TAG);
        assert_eq!(tree.layout.unwrap().module_name, "components/tree");
    }
}
