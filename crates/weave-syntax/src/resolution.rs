//! Free-variable resolution rules.
//!
//! Every free variable in a normalized template carries exactly one
//! [`FreeVarResolution`], decided from the syntactic position it appears in.
//! The per-position functions below are pure: they only look at the
//! [`CalleeShape`] and never at what the name means.
//!
//! | position               | simple                        | non-simple           |
//! |------------------------|-------------------------------|----------------------|
//! | `(x ...)`              | helper                        | none                 |
//! | `{{#x}}`               | component                     | none                 |
//! | `<div {{x}}>`          | modifier                      | none                 |
//! | `<X>`                  | component                     | none                 |
//! | `attr={{x ...}}`       | helper (fallback without args)| fallback without args|
//! | `{{x ...}}`            | component or helper           | fallback without args|
//! | `{{{x ...}}}`          | helper                        | fallback without args|
//! | argument               | fallback                      | fallback             |
//!
//! Strict-mode templates never consult these rules.

use std::fmt;

/// The namespace a loose free variable is looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FreeVarNamespace {
    Component,
    Helper,
    Modifier,
}

impl FreeVarNamespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            FreeVarNamespace::Component => "component",
            FreeVarNamespace::Helper => "helper",
            FreeVarNamespace::Modifier => "modifier",
        }
    }
}

/// How a free variable is looked up at link time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FreeVarResolution {
    /// Must be supplied by the embedder's lexical scope.
    Strict,
    Loose(LooseResolution),
}

/// Loose-mode lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LooseResolution {
    /// The position admits exactly one namespace. With `fallback`, a missing
    /// definition falls back to a property lookup on the template's self.
    Namespaced {
        namespace: FreeVarNamespace,
        fallback: bool,
    },
    /// The name can only be a property lookup.
    Fallback,
    /// Append position, where both a component and a helper are legal.
    ComponentOrHelper { fallback: bool },
}

impl FreeVarResolution {
    pub const fn namespaced(namespace: FreeVarNamespace) -> Self {
        FreeVarResolution::Loose(LooseResolution::Namespaced {
            namespace,
            fallback: false,
        })
    }

    pub const fn namespaced_with_fallback(namespace: FreeVarNamespace) -> Self {
        FreeVarResolution::Loose(LooseResolution::Namespaced {
            namespace,
            fallback: true,
        })
    }

    pub const fn fallback() -> Self {
        FreeVarResolution::Loose(LooseResolution::Fallback)
    }

    pub const fn component_or_helper(fallback: bool) -> Self {
        FreeVarResolution::Loose(LooseResolution::ComponentOrHelper { fallback })
    }

    /// The namespace for single-namespace resolutions.
    pub fn namespace(&self) -> Option<FreeVarNamespace> {
        match self {
            FreeVarResolution::Loose(LooseResolution::Namespaced { namespace, .. }) => {
                Some(*namespace)
            }
            _ => None,
        }
    }

    pub fn is_component(&self) -> bool {
        self.namespace() == Some(FreeVarNamespace::Component)
    }
}

impl fmt::Display for FreeVarResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FreeVarResolution::Strict => f.write_str("strict"),
            FreeVarResolution::Loose(LooseResolution::Namespaced {
                namespace,
                fallback,
            }) => {
                write!(f, "loose {}", namespace.as_str())?;
                if *fallback {
                    f.write_str(" (with fallback)")?;
                }
                Ok(())
            }
            FreeVarResolution::Loose(LooseResolution::Fallback) => f.write_str("loose fallback"),
            FreeVarResolution::Loose(LooseResolution::ComponentOrHelper { fallback }) => {
                f.write_str("loose component or helper")?;
                if *fallback {
                    f.write_str(" (with fallback)")?;
                }
                Ok(())
            }
        }
    }
}

/// The syntactic shape of an invocation's callee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalleeShape {
    /// A bare variable head with no path segments.
    pub is_simple: bool,
    /// Any positional or named arguments are present.
    pub has_args: bool,
}

impl CalleeShape {
    pub fn new(is_simple: bool, has_args: bool) -> Self {
        Self {
            is_simple,
            has_args,
        }
    }
}

/// A syntactic position that can contain a free variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// `(x ...)`
    Call,
    /// `{{#x ...}}`
    Block,
    /// `<div {{x ...}}>`
    Modifier,
    /// `<X>`
    ElementTag,
    /// `attr={{x ...}}` and `@arg={{x ...}}`
    AttrValue,
    /// `{{x ...}}` or `{{{x ...}}}`
    Append { trusting: bool },
    /// A positional or named argument value.
    Argument,
}

impl Position {
    /// Apply the rule for this position.
    pub fn classify(self, shape: CalleeShape) -> Option<FreeVarResolution> {
        match self {
            Position::Call => call_resolution(shape),
            Position::Block => block_resolution(shape),
            Position::Modifier => modifier_resolution(shape),
            Position::ElementTag => element_resolution(shape),
            Position::AttrValue => attr_value_resolution(shape),
            Position::Append { trusting } => append_resolution(shape, trusting),
            Position::Argument => Some(argument_resolution(shape)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Position::Call => "subexpression",
            Position::Block => "block",
            Position::Modifier => "modifier",
            Position::ElementTag => "element tag",
            Position::AttrValue => "attribute value",
            Position::Append { trusting: false } => "append",
            Position::Append { trusting: true } => "trusting append",
            Position::Argument => "argument",
        }
    }
}

pub fn call_resolution(shape: CalleeShape) -> Option<FreeVarResolution> {
    shape
        .is_simple
        .then_some(FreeVarResolution::namespaced(FreeVarNamespace::Helper))
}

pub fn block_resolution(shape: CalleeShape) -> Option<FreeVarResolution> {
    shape
        .is_simple
        .then_some(FreeVarResolution::namespaced(FreeVarNamespace::Component))
}

pub fn modifier_resolution(shape: CalleeShape) -> Option<FreeVarResolution> {
    shape
        .is_simple
        .then_some(FreeVarResolution::namespaced(FreeVarNamespace::Modifier))
}

pub fn element_resolution(shape: CalleeShape) -> Option<FreeVarResolution> {
    shape
        .is_simple
        .then_some(FreeVarResolution::namespaced(FreeVarNamespace::Component))
}

pub fn attr_value_resolution(shape: CalleeShape) -> Option<FreeVarResolution> {
    match (shape.is_simple, shape.has_args) {
        (true, true) => Some(FreeVarResolution::namespaced(FreeVarNamespace::Helper)),
        (true, false) => Some(FreeVarResolution::namespaced_with_fallback(
            FreeVarNamespace::Helper,
        )),
        (false, true) => None,
        (false, false) => Some(FreeVarResolution::fallback()),
    }
}

pub fn append_resolution(shape: CalleeShape, trusting: bool) -> Option<FreeVarResolution> {
    match (shape.is_simple, shape.has_args, trusting) {
        (true, has_args, false) => Some(FreeVarResolution::component_or_helper(!has_args)),
        (true, true, true) => Some(FreeVarResolution::namespaced(FreeVarNamespace::Helper)),
        (true, false, true) => Some(FreeVarResolution::namespaced_with_fallback(
            FreeVarNamespace::Helper,
        )),
        (false, true, _) => None,
        (false, false, _) => Some(FreeVarResolution::fallback()),
    }
}

pub fn argument_resolution(_shape: CalleeShape) -> FreeVarResolution {
    FreeVarResolution::fallback()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: CalleeShape = CalleeShape {
        is_simple: true,
        has_args: false,
    };
    const SIMPLE_ARGS: CalleeShape = CalleeShape {
        is_simple: true,
        has_args: true,
    };
    const PATH: CalleeShape = CalleeShape {
        is_simple: false,
        has_args: false,
    };
    const PATH_ARGS: CalleeShape = CalleeShape {
        is_simple: false,
        has_args: true,
    };

    #[test]
    fn single_namespace_positions_need_a_simple_callee() {
        assert_eq!(
            Position::Call.classify(SIMPLE_ARGS),
            Some(FreeVarResolution::namespaced(FreeVarNamespace::Helper))
        );
        assert_eq!(
            Position::Block.classify(SIMPLE),
            Some(FreeVarResolution::namespaced(FreeVarNamespace::Component))
        );
        assert_eq!(
            Position::Modifier.classify(SIMPLE_ARGS),
            Some(FreeVarResolution::namespaced(FreeVarNamespace::Modifier))
        );
        for position in [Position::Call, Position::Block, Position::Modifier, Position::ElementTag] {
            assert_eq!(position.classify(PATH), None, "{}", position.as_str());
        }
    }

    #[test]
    fn attribute_values_fall_back_without_arguments() {
        let resolution = Position::AttrValue.classify(SIMPLE);
        assert_eq!(
            resolution,
            Some(FreeVarResolution::namespaced_with_fallback(
                FreeVarNamespace::Helper
            ))
        );
        assert_eq!(
            Position::AttrValue.classify(PATH),
            Some(FreeVarResolution::fallback())
        );
        assert_eq!(Position::AttrValue.classify(PATH_ARGS), None);
    }

    #[test]
    fn append_is_ambiguous_unless_trusting() {
        assert_eq!(
            Position::Append { trusting: false }.classify(SIMPLE),
            Some(FreeVarResolution::component_or_helper(true))
        );
        assert_eq!(
            Position::Append { trusting: false }.classify(SIMPLE_ARGS),
            Some(FreeVarResolution::component_or_helper(false))
        );
        assert_eq!(
            Position::Append { trusting: true }.classify(SIMPLE_ARGS),
            Some(FreeVarResolution::namespaced(FreeVarNamespace::Helper))
        );
        assert_eq!(Position::Append { trusting: true }.classify(PATH_ARGS), None);
    }

    #[test]
    fn arguments_always_fall_back() {
        for shape in [SIMPLE, SIMPLE_ARGS, PATH, PATH_ARGS] {
            assert_eq!(
                Position::Argument.classify(shape),
                Some(FreeVarResolution::fallback())
            );
        }
    }

    #[test]
    fn display_describes_lookup() {
        assert_eq!(
            FreeVarResolution::namespaced_with_fallback(FreeVarNamespace::Helper).to_string(),
            "loose helper (with fallback)"
        );
        assert_eq!(FreeVarResolution::Strict.to_string(), "strict");
    }
}
