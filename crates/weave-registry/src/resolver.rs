//! The resolver delegate consulted while encoding.

use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;
use weave_core::TemplateId;
use weave_syntax::{LexicalScope, v2};

/// Embedder-defined context a lookup is made on behalf of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Owner(pub u32);

bitflags! {
    /// What a component's manager supports at runtime.
    ///
    /// The compiler only branches on [`ComponentCapabilities::DYNAMIC_LAYOUT`];
    /// the rest are carried through to the runtime unchanged.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ComponentCapabilities: u32 {
        /// The layout is chosen at runtime, so it cannot be linked statically.
        const DYNAMIC_LAYOUT = 1 << 0;
        const DYNAMIC_TAG = 1 << 1;
        const PREPARE_ARGS = 1 << 2;
        const CREATE_ARGS = 1 << 3;
        const ATTRIBUTE_HOOK = 1 << 4;
        const ELEMENT_HOOK = 1 << 5;
        const DYNAMIC_SCOPE = 1 << 6;
        const CREATE_CALLER = 1 << 7;
        const UPDATE_HOOK = 1 << 8;
        const CREATE_INSTANCE = 1 << 9;
        const WRAPPED = 1 << 10;
        const WILL_DESTROY = 1 << 11;
        const HAS_SUB_OWNER = 1 << 12;
    }
}

/// A normalized template that can be compiled as a component layout.
pub struct CompilableTemplate {
    pub id: TemplateId,
    pub module_name: String,
    pub template: Rc<v2::Template>,
    /// Strict layouts resolve their free names through `lexical_scope`.
    pub strict: bool,
    pub lexical_scope: Option<Rc<dyn LexicalScope>>,
}

impl CompilableTemplate {
    pub fn new(module_name: impl Into<String>, template: v2::Template) -> Self {
        let module_name = module_name.into();
        Self {
            id: TemplateId::from_module(&module_name),
            module_name,
            template: Rc::new(template),
            strict: false,
            lexical_scope: None,
        }
    }

    /// Mark the layout as strict, resolving free names through `scope`.
    pub fn with_lexical_scope(mut self, scope: Rc<dyn LexicalScope>) -> Self {
        self.strict = true;
        self.lexical_scope = Some(scope);
        self
    }
}

impl fmt::Debug for CompilableTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompilableTemplate")
            .field("id", &self.id)
            .field("module_name", &self.module_name)
            .field("strict", &self.strict)
            .finish_non_exhaustive()
    }
}

/// A component definition returned by the resolver.
#[derive(Debug, Clone)]
pub struct ResolvedComponent {
    /// Opaque definition handle, stored in the constant pool.
    pub handle: u32,
    pub capabilities: ComponentCapabilities,
    /// The layout to link statically, when the component has one.
    pub layout: Option<Rc<CompilableTemplate>>,
}

/// Answers name lookups for free variables.
///
/// Every method returns `None` when nothing is registered under `name`; the
/// caller turns that into a link error naming the expected kind.
pub trait Resolver {
    fn lookup_component(&self, name: &str, owner: Owner) -> Option<ResolvedComponent>;

    fn lookup_helper(&self, name: &str, owner: Owner) -> Option<u32>;

    fn lookup_modifier(&self, name: &str, owner: Owner) -> Option<u32>;
}

impl<R: Resolver + ?Sized> Resolver for &R {
    fn lookup_component(&self, name: &str, owner: Owner) -> Option<ResolvedComponent> {
        (**self).lookup_component(name, owner)
    }

    fn lookup_helper(&self, name: &str, owner: Owner) -> Option<u32> {
        (**self).lookup_helper(name, owner)
    }

    fn lookup_modifier(&self, name: &str, owner: Owner) -> Option<u32> {
        (**self).lookup_modifier(name, owner)
    }
}
