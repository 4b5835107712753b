//! Configuration for normalization.

use std::fmt;
use std::rc::Rc;

use crate::symbol_table::{ComponentNameHook, LexicalScope};

/// Options controlling how free names are classified.
///
/// ```
/// use weave_syntax::NormalizeOptions;
///
/// let options = NormalizeOptions::new()
///     .with_strict(true)
///     .with_module_name("components/nav-bar")
///     .with_template_locals(["Button"]);
/// assert!(options.strict);
/// ```
#[derive(Clone, Default)]
pub struct NormalizeOptions {
    /// Strict templates never fall back to loose lookups.
    pub strict: bool,
    pub module_name: Option<String>,
    pub lexical_scope: Option<Rc<dyn LexicalScope>>,
    pub customize_component_name: Option<ComponentNameHook>,
    /// Names the template may reference as lexical bindings.
    pub template_locals: Vec<String>,
}

impl NormalizeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_module_name(mut self, name: impl Into<String>) -> Self {
        self.module_name = Some(name.into());
        self
    }

    pub fn with_lexical_scope(mut self, scope: Rc<dyn LexicalScope>) -> Self {
        self.lexical_scope = Some(scope);
        self
    }

    pub fn with_component_name_hook(mut self, hook: ComponentNameHook) -> Self {
        self.customize_component_name = Some(hook);
        self
    }

    pub fn with_template_locals<I, S>(mut self, locals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.template_locals = locals.into_iter().map(Into::into).collect();
        self
    }
}

impl fmt::Debug for NormalizeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NormalizeOptions")
            .field("strict", &self.strict)
            .field("module_name", &self.module_name)
            .field("lexical_scope", &self.lexical_scope.is_some())
            .field(
                "customize_component_name",
                &self.customize_component_name.is_some(),
            )
            .field("template_locals", &self.template_locals)
            .finish()
    }
}
