//! Name resolution for the weave template compiler.
//!
//! - [`Resolver`]: the delegate the encoder asks for component, helper and
//!   modifier definitions
//! - [`Registry`]: an in-memory [`Resolver`] keyed by name
//! - [`LexicalBindings`]: module-level bindings for strict-mode templates
//!
//! # Example
//!
//! ```
//! use weave_registry::{ComponentCapabilities, Owner, Registry, Resolver};
//!
//! let mut registry = Registry::new();
//! let handle = registry.register_helper("format-date");
//! registry.register_component("nav-bar", ComponentCapabilities::empty(), None);
//!
//! assert_eq!(registry.lookup_helper("format-date", Owner::default()), Some(handle));
//! assert!(registry.lookup_component("nav-bar", Owner::default()).is_some());
//! ```

mod lexical;
mod registry;
mod resolver;

pub use lexical::LexicalBindings;
pub use registry::Registry;
pub use resolver::{CompilableTemplate, ComponentCapabilities, Owner, ResolvedComponent, Resolver};
