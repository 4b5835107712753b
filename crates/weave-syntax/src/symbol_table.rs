//! Slot allocation for template scopes.
//!
//! A template owns one [`ProgramSymbolTable`]: the ordered list of local
//! symbols (slot 0 is reserved for the invocation's self, so the first
//! symbol lives in slot 1), the ordered list of free variables (`upvars`),
//! and memo tables for `@named` arguments and `&block` names.
//!
//! Block scopes ([`BlockSymbolTable`]) only *name* slots that the program
//! table owns. They are stored in an index arena inside [`SymbolTable`] and
//! refer to their parent by [`ScopeId`]; lookups walk outward, allocation
//! always lands on the root.
//!
//! None of these operations fail. Validation is the normalizer's job.

use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::resolution::FreeVarResolution;

// ============================================================================
// Embedder hooks
// ============================================================================

/// Module-level bindings supplied by the embedder (strict mode).
pub trait LexicalScope {
    /// The opaque handle bound to `name`, if any.
    fn lookup(&self, name: &str) -> Option<u32>;
}

/// Rewrites uppercase component names before they become upvars.
pub type ComponentNameHook = Rc<dyn Fn(&str) -> String>;

// ============================================================================
// Tables
// ============================================================================

/// Identifies a scope within one [`SymbolTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

impl ScopeId {
    pub const ROOT: ScopeId = ScopeId(0);

    pub fn is_root(&self) -> bool {
        self.0 == 0
    }
}

/// Storage owned by a whole template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgramSymbolTable {
    symbols: Vec<String>,
    upvars: Vec<String>,
    upvar_index: FxHashMap<String, u32>,
    named: FxHashMap<String, u32>,
    blocks: FxHashMap<String, u32>,
    /// Template-level block params, visible everywhere in the template.
    locals: FxHashMap<String, u32>,
    template_locals: Vec<String>,
    has_eval: bool,
}

impl ProgramSymbolTable {
    /// Local symbols in slot order, starting at slot 1.
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Free variable names in first-use order.
    pub fn upvars(&self) -> &[String] {
        &self.upvars
    }

    pub fn has_eval(&self) -> bool {
        self.has_eval
    }

    pub fn named_slot(&self, name: &str) -> Option<u32> {
        self.named.get(name).copied()
    }

    pub fn block_slot(&self, name: &str) -> Option<u32> {
        self.blocks.get(name).copied()
    }

    pub fn template_locals(&self) -> &[String] {
        &self.template_locals
    }

    /// Number of local slots the template declares.
    pub fn scope_size(&self) -> u32 {
        self.symbols.len() as u32
    }
}

/// A nested scope introduced by block parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockSymbolTable {
    parent: ScopeId,
    symbols: Vec<String>,
    slots: Vec<u32>,
}

impl BlockSymbolTable {
    pub fn parent(&self) -> ScopeId {
        self.parent
    }

    /// Parameter names in declaration order.
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Program slots backing each parameter.
    pub fn slots(&self) -> &[u32] {
        &self.slots
    }
}

/// The scope chain of one template being normalized.
pub struct SymbolTable {
    program: ProgramSymbolTable,
    scopes: Vec<BlockSymbolTable>,
    lexical: Option<Rc<dyn LexicalScope>>,
    customize_component_name: Option<ComponentNameHook>,
}

impl SymbolTable {
    /// Create the root table. `template_locals` are strict-mode names that
    /// the template may reference as lexical bindings.
    pub fn top(template_locals: Vec<String>) -> Self {
        Self {
            program: ProgramSymbolTable {
                template_locals,
                ..Default::default()
            },
            scopes: Vec::new(),
            lexical: None,
            customize_component_name: None,
        }
    }

    pub fn with_lexical_scope(mut self, lexical: Rc<dyn LexicalScope>) -> Self {
        self.lexical = Some(lexical);
        self
    }

    pub fn with_component_name_hook(mut self, hook: ComponentNameHook) -> Self {
        self.customize_component_name = Some(hook);
        self
    }

    pub fn program(&self) -> &ProgramSymbolTable {
        &self.program
    }

    pub fn into_program(self) -> ProgramSymbolTable {
        self.program
    }

    /// The block scope for `scope`, or `None` for the root.
    pub fn block(&self, scope: ScopeId) -> Option<&BlockSymbolTable> {
        if scope.is_root() {
            None
        } else {
            self.scopes.get(scope.0 as usize - 1)
        }
    }

    /// Open a child scope of `parent` whose parameters get fresh slots.
    pub fn child(&mut self, parent: ScopeId, params: &[&str]) -> ScopeId {
        let slots = params.iter().map(|name| self.allocate(name)).collect();
        self.scopes.push(BlockSymbolTable {
            parent,
            symbols: params.iter().map(|name| name.to_string()).collect(),
            slots,
        });
        ScopeId(self.scopes.len() as u32)
    }

    /// Bind template-level block params on the root scope.
    pub fn declare_root_locals(&mut self, params: &[&str]) -> Vec<u32> {
        params
            .iter()
            .map(|name| {
                let slot = self.allocate(name);
                self.program.locals.insert(name.to_string(), slot);
                slot
            })
            .collect()
    }

    // ==========================================================================
    // Allocation
    // ==========================================================================

    /// Append a symbol and return its 1-based slot.
    pub fn allocate(&mut self, name: &str) -> u32 {
        self.program.symbols.push(name.to_string());
        self.program.symbols.len() as u32
    }

    /// Slot for `@name`, shared by every reference in the template.
    pub fn allocate_named(&mut self, name: &str) -> u32 {
        if let Some(&slot) = self.program.named.get(name) {
            return slot;
        }
        let slot = self.allocate(&format!("@{name}"));
        self.program.named.insert(name.to_string(), slot);
        slot
    }

    /// Slot for the block `&name`. `inverse` is an alias of `else`.
    pub fn allocate_block(&mut self, name: &str) -> u32 {
        let name = if name == "inverse" { "else" } else { name };
        if let Some(&slot) = self.program.blocks.get(name) {
            return slot;
        }
        let slot = self.allocate(&format!("&{name}"));
        self.program.blocks.insert(name.to_string(), slot);
        slot
    }

    /// Index of `name` in `upvars`, appending it on first use.
    pub fn allocate_free(&mut self, name: &str, resolution: &FreeVarResolution) -> u32 {
        let name = match &self.customize_component_name {
            Some(hook) if resolution.is_component() && starts_uppercase(name) => hook(name),
            _ => name.to_string(),
        };

        if let Some(&index) = self.program.upvar_index.get(&name) {
            return index;
        }
        let index = self.program.upvars.len() as u32;
        self.program.upvar_index.insert(name.clone(), index);
        self.program.upvars.push(name);
        index
    }

    pub fn upvar(&self, index: u32) -> &str {
        &self.program.upvars[index as usize]
    }

    pub fn set_has_eval(&mut self) {
        self.program.has_eval = true;
    }

    // ==========================================================================
    // Lookup
    // ==========================================================================

    /// Find a lexically bound local, walking outward from `scope`.
    ///
    /// Returns the slot and whether the binding lives on the root scope.
    pub fn get(&self, scope: ScopeId, name: &str) -> Option<(u32, bool)> {
        let mut current = scope;
        while let Some(block) = self.block(current) {
            if let Some(index) = block.symbols.iter().rposition(|symbol| symbol == name) {
                return Some((block.slots[index], false));
            }
            current = block.parent;
        }
        self.program.locals.get(name).map(|&slot| (slot, true))
    }

    pub fn has(&self, scope: ScopeId, name: &str) -> bool {
        self.get(scope, name).is_some()
    }

    /// True for template locals and embedder-supplied lexical bindings.
    pub fn has_lexical(&self, name: &str) -> bool {
        self.program.template_locals.iter().any(|local| local == name)
            || self
                .lexical
                .as_ref()
                .is_some_and(|lexical| lexical.lookup(name).is_some())
    }
}

impl fmt::Debug for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymbolTable")
            .field("program", &self.program)
            .field("scopes", &self.scopes)
            .field("lexical", &self.lexical.is_some())
            .finish()
    }
}

fn starts_uppercase(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}
