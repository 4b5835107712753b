//! Built-in constructs.
//!
//! Two tables map a construct name to the function that compiles it:
//! - block macros, for `{{#name}}...{{/name}}`
//! - append macros, for `{{name ...}}`
//!
//! A name that is not in a table is compiled the ordinary way. Argument
//! shapes were already checked by the normalizer, so macros only look up
//! what they need and treat missing blocks as absent.

mod append;
mod blocks;

use weave_syntax::v2::{AppendContent, InvokeBlock};

use crate::compile::{Result, StatementCompiler};

pub type BlockMacro = fn(&mut StatementCompiler<'_>, &InvokeBlock) -> Result<()>;
pub type AppendMacro = fn(&mut StatementCompiler<'_>, &AppendContent) -> Result<()>;

/// The block macro registered under `name`.
pub fn lookup_block(name: &str) -> Option<BlockMacro> {
    let compile: BlockMacro = match name {
        "if" => blocks::if_block,
        "unless" => blocks::unless_block,
        "with" => blocks::with_block,
        "each" => blocks::each_block,
        "let" => blocks::let_block,
        "in-element" => blocks::in_element,
        "-with-dynamic-vars" => blocks::with_dynamic_vars,
        "component" => blocks::component_block,
        _ => return None,
    };
    Some(compile)
}

/// The append macro registered under `name`.
pub fn lookup_append(name: &str) -> Option<AppendMacro> {
    match name {
        "component" => Some(append::component_append),
        _ => None,
    }
}
