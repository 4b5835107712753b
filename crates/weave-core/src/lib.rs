//! Shared vocabulary for the weave template compiler.
//!
//! - [`Span`]: source locations forwarded into diagnostics
//! - [`error`]: the error taxonomy used by every phase
//! - [`Handle`] / [`TemplateId`]: identities of compiled heap regions

pub mod error;
mod handle;
mod span;

pub use error::{
    CompileError, EncoderError, LinkError, LookupKind, ResolutionError, SyntaxError,
    SyntaxErrorKind,
};
pub use handle::{Handle, JobId, TemplateId};
pub use span::Span;
