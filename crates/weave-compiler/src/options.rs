//! Per-template compile options.

use std::rc::Rc;

use weave_registry::Owner;
use weave_syntax::{ComponentNameHook, LexicalScope, NormalizeOptions};

/// Options for compiling one template.
///
/// Everything that affects name classification lives in the embedded
/// [`NormalizeOptions`]; the owner is only consulted when the encoder asks
/// the resolver for definitions.
///
/// ```
/// use weave_compiler::CompileOptions;
/// use weave_registry::Owner;
///
/// let options = CompileOptions::new()
///     .with_owner(Owner(7))
///     .with_module_name("templates/application")
///     .with_strict(true);
/// assert!(options.normalize_options().strict);
/// assert_eq!(options.module_name(), "templates/application");
/// ```
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    pub owner: Owner,
    pub syntax: NormalizeOptions,
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_owner(mut self, owner: Owner) -> Self {
        self.owner = owner;
        self
    }

    pub fn with_module_name(mut self, name: impl Into<String>) -> Self {
        self.syntax = self.syntax.with_module_name(name);
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.syntax = self.syntax.with_strict(strict);
        self
    }

    pub fn with_lexical_scope(mut self, scope: Rc<dyn LexicalScope>) -> Self {
        self.syntax = self.syntax.with_lexical_scope(scope);
        self
    }

    pub fn with_component_name_hook(mut self, hook: ComponentNameHook) -> Self {
        self.syntax = self.syntax.with_component_name_hook(hook);
        self
    }

    pub fn with_template_locals<I, S>(mut self, locals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.syntax = self.syntax.with_template_locals(locals);
        self
    }

    /// The options handed to [`weave_syntax::normalize`].
    pub fn normalize_options(&self) -> &NormalizeOptions {
        &self.syntax
    }

    pub fn module_name(&self) -> &str {
        self.syntax.module_name.as_deref().unwrap_or("<anonymous>")
    }
}
