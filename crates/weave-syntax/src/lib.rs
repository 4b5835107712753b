//! Front end of the weave template compiler.
//!
//! - [`v1`]: the raw parse tree, plus arena builders
//! - [`v2`]: the normalized, scope-annotated tree
//! - [`normalize()`]: ASTv1 -> ASTv2, raising syntax and resolution errors
//! - [`SymbolTable`]: slot allocation for locals, arguments, blocks and upvars
//! - [`resolution`]: how free variables are looked up, by position
//! - [`TemplateParser`]: the seam for an external parser

pub mod keywords;
pub mod normalize;
mod parser;
pub mod resolution;
mod symbol_table;
pub mod v1;
pub mod v2;

pub use keywords::{Keyword, KeywordPosition};
pub use normalize::{NormalizeOptions, normalize};
pub use parser::TemplateParser;
pub use resolution::{FreeVarNamespace, FreeVarResolution, LooseResolution};
pub use symbol_table::{
    BlockSymbolTable, ComponentNameHook, LexicalScope, ProgramSymbolTable, ScopeId, SymbolTable,
};
