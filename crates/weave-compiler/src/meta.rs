//! Per-template facts shared by every region compiled from one template.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use weave_registry::{CompilableTemplate, Owner};
use weave_syntax::{LexicalScope, v2};

use crate::options::CompileOptions;

/// What the encoder needs to know about the template it is encoding.
///
/// A template and all of its nested blocks share one `TemplateMeta`, since
/// blocks use the template's symbol table and lexical scope.
pub struct TemplateMeta {
    pub module_name: String,
    pub owner: Owner,
    pub strict: bool,
    pub symbols: Vec<String>,
    pub upvars: Vec<String>,
    pub has_eval: bool,
    pub scope_size: u32,
    lexical: Option<Rc<dyn LexicalScope>>,
    next_guid: Cell<u32>,
}

impl TemplateMeta {
    pub fn new(template: &v2::Template, options: &CompileOptions) -> Self {
        let syntax = options.normalize_options();
        Self::from_parts(
            template,
            options.module_name().to_string(),
            options.owner,
            syntax.strict,
            syntax.lexical_scope.clone(),
        )
    }

    /// Meta for a component layout, resolved on behalf of `owner`.
    pub fn for_layout(layout: &CompilableTemplate, owner: Owner) -> Self {
        Self::from_parts(
            &layout.template,
            layout.module_name.clone(),
            owner,
            layout.strict,
            layout.lexical_scope.clone(),
        )
    }

    /// Meta for hand-built regions with no source template.
    pub(crate) fn synthetic(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            owner: Owner::default(),
            strict: false,
            symbols: Vec::new(),
            upvars: Vec::new(),
            has_eval: false,
            scope_size: 0,
            lexical: None,
            next_guid: Cell::new(0),
        }
    }

    fn from_parts(
        template: &v2::Template,
        module_name: String,
        owner: Owner,
        strict: bool,
        lexical: Option<Rc<dyn LexicalScope>>,
    ) -> Self {
        Self {
            module_name,
            owner,
            strict,
            symbols: template.table.symbols().to_vec(),
            upvars: template.table.upvars().to_vec(),
            has_eval: template.table.has_eval(),
            scope_size: template.table.scope_size(),
            lexical,
            next_guid: Cell::new(0),
        }
    }

    /// The handle bound to `name` in the template's lexical scope.
    pub fn lexical(&self, name: &str) -> Option<u32> {
        self.lexical.as_ref()?.lookup(name)
    }

    /// A fresh in-element cursor id, unique within this template.
    pub fn next_guid(&self) -> String {
        let id = self.next_guid.get();
        self.next_guid.set(id + 1);
        format!("%cursor:{id}%")
    }
}

impl fmt::Debug for TemplateMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateMeta")
            .field("module_name", &self.module_name)
            .field("owner", &self.owner)
            .field("strict", &self.strict)
            .field("symbols", &self.symbols)
            .field("upvars", &self.upvars)
            .field("scope_size", &self.scope_size)
            .finish_non_exhaustive()
    }
}
