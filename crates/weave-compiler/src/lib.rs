//! Weave Compiler
//!
//! Lowers normalized templates into bytecode for the template VM.
//!
//! ## Architecture
//!
//! - **Compile**: the statement compiler walks the normalized tree and
//!   produces a stream of high-level ops, expanding built-in constructs
//!   through the macro tables
//! - **Encode**: the encoder lowers ops to instruction words in a shared
//!   heap, interning operands in the constant pool, resolving labels and
//!   asking the resolver for named definitions
//! - **Link**: nested blocks and component layouts are compiled as their own
//!   regions, with pending handles patched once each region commits
//!
//! ## Modules
//!
//! - [`session`]: [`CompileSession`], the entry point
//! - [`compile`]: statement and expression lowering
//! - [`macros`]: block and append constructs (`if`, `each`, `component`, ...)
//! - [`ops`]: the high-level op stream
//! - [`encoder`]: ops to heap words
//! - [`heap`] / [`constants`]: the shared program storage
//! - [`opcode`] / [`encoding`]: the instruction set and its word layout
//! - [`stdlib`]: routines shared by every template
//!
//! ```
//! use bumpalo::Bump;
//! use weave_compiler::{CompileOptions, CompileSession};
//! use weave_registry::Registry;
//! use weave_syntax::v1::Builder;
//!
//! let registry = Registry::new();
//! let arena = Bump::new();
//! let b = Builder::new(&arena);
//! let template = b.template(&[b.text("Hello")]);
//!
//! let mut session = CompileSession::new(&registry).unwrap();
//! let handle = session.compile(&template, &CompileOptions::new()).unwrap();
//! let program = session.finish();
//! assert!(program.instructions(handle).is_some());
//! ```

pub mod compile;
pub mod constants;
pub(crate) mod encoder;
pub mod encoding;
pub mod heap;
pub(crate) mod jobs;
pub mod macros;
pub mod meta;
pub mod opcode;
pub mod ops;
pub mod options;
pub mod program;
pub mod session;
pub mod stdlib;

pub use compile::{ArgsFlags, InvocationBlocks, StatementCompiler, compile_statements};
pub use constants::{Constant, ConstantPool};
pub use encoding::{Instruction, Instructions, PrimitiveValue};
pub use heap::{HandleEntry, HandleState, Heap};
pub use meta::TemplateMeta;
pub use opcode::{ContentType, CurriedKind, Opcode, Register};
pub use ops::{HighLevelOp, OpBuilder, Operand};
pub use options::CompileOptions;
pub use program::Program;
pub use session::{CompileOutput, CompileSession};
pub use stdlib::{Stdlib, StdlibRoutine};

pub use weave_core::CompileError;
pub use weave_registry::Resolver;
