//! The seam between template source text and the raw tree.
//!
//! Tokenizing is not part of this workspace. Hosts plug in a parser that
//! allocates a [`v1::Template`] in a caller-supplied arena, with a span on
//! every node.

use bumpalo::Bump;
use weave_core::SyntaxError;

use crate::v1;

/// Turns template source into a raw tree.
pub trait TemplateParser {
    fn parse<'ast>(&self, source: &str, arena: &'ast Bump)
    -> Result<v1::Template<'ast>, SyntaxError>;
}

impl<F> TemplateParser for F
where
    F: for<'ast> Fn(&str, &'ast Bump) -> Result<v1::Template<'ast>, SyntaxError>,
{
    fn parse<'ast>(
        &self,
        source: &str,
        arena: &'ast Bump,
    ) -> Result<v1::Template<'ast>, SyntaxError> {
        self(source, arena)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::v1::Builder;

    fn text_only<'ast>(source: &str, arena: &'ast Bump) -> Result<v1::Template<'ast>, SyntaxError> {
        let b = Builder::new(arena);
        Ok(b.template(&[b.text(source)]))
    }

    #[test]
    fn functions_are_parsers() {
        let arena = Bump::new();
        let template = text_only.parse("hello", &arena).unwrap();
        assert!(matches!(
            template.body[0],
            v1::Statement::Text(text) if text.chars == "hello"
        ));
    }
}
