//! weave: a template-to-bytecode compiler.
//!
//! Templates go through three phases:
//!
//! 1. **Normalize** ([`syntax`]): the raw tree is scope-checked, every free
//!    name is classified and built-in constructs are recognized
//! 2. **Compile** ([`compiler`]): the normalized tree is lowered to ops,
//!    then encoded into a heap shared by every template of a session
//! 3. **Link**: names are resolved through a [`Resolver`], and nested blocks
//!    and component layouts are compiled as their own regions
//!
//! ```
//! use bumpalo::Bump;
//! use weave::{CompileOptions, CompileSession, Registry};
//! use weave::syntax::v1::Builder;
//!
//! let mut registry = Registry::new();
//! registry.register_helper("format-date");
//!
//! let arena = Bump::new();
//! let b = Builder::new(&arena);
//! let template = b.template(&[
//!     b.text("Posted "),
//!     b.append(b.path("format-date"), &[b.path("this.date")], b.no_hash()),
//! ]);
//!
//! let mut session = CompileSession::new(&registry).unwrap();
//! let handle = weave::compile(&mut session, &template, &CompileOptions::new()).unwrap();
//! let program = session.finish();
//! assert!(program.entry(handle).is_some());
//! ```

use bumpalo::Bump;

pub use weave_compiler as compiler;
pub use weave_registry as registry;
pub use weave_syntax as syntax;

pub use weave_compiler::{
    CompileOptions, CompileOutput, CompileSession, Opcode, Program, Stdlib, StdlibRoutine,
};
pub use weave_core::{
    CompileError, EncoderError, Handle, LinkError, LookupKind, ResolutionError, Span,
    SyntaxError, SyntaxErrorKind,
};
pub use weave_registry::{
    CompilableTemplate, ComponentCapabilities, LexicalBindings, Owner, Registry, ResolvedComponent,
    Resolver,
};
pub use weave_syntax::{NormalizeOptions, TemplateParser};

pub type Result<T> = std::result::Result<T, CompileError>;

/// Compile a raw template into `session`, failing on any error.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn compile(
    session: &mut CompileSession<'_>,
    template: &syntax::v1::Template<'_>,
    options: &CompileOptions,
) -> Result<u32> {
    session.compile(template, options)
}

/// Parse `source` with `parser` and compile it into `session`.
///
/// The raw tree only lives for the duration of the call.
pub fn compile_source(
    session: &mut CompileSession<'_>,
    parser: &dyn TemplateParser,
    source: &str,
    options: &CompileOptions,
) -> Result<u32> {
    let arena = Bump::new();
    let template = parser.parse(source, &arena)?;
    tracing::trace!(
        module = options.module_name(),
        statements = template.body.len(),
        "parsed template"
    );
    session.compile(&template, options)
}
