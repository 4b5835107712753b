//! Arena-backed construction helpers for raw trees.
//!
//! Hosts without a parser (and most tests) build templates directly:
//!
//! ```
//! use bumpalo::Bump;
//! use weave_syntax::v1::Builder;
//!
//! let arena = Bump::new();
//! let b = Builder::new(&arena);
//! let template = b.template(&[
//!     b.text("Hello, "),
//!     b.append(b.path("@name"), &[], b.no_hash()),
//! ]);
//! assert_eq!(template.body.len(), 2);
//! ```

use std::cell::Cell;

use bumpalo::Bump;
use bumpalo::collections::Vec as BumpVec;
use weave_core::Span;

use super::*;

/// Allocates raw-tree nodes in an arena.
///
/// Every node receives the builder's current span, set with [`Builder::at`].
pub struct Builder<'ast> {
    arena: &'ast Bump,
    span: Cell<Span>,
}

impl<'ast> Builder<'ast> {
    pub fn new(arena: &'ast Bump) -> Self {
        Self {
            arena,
            span: Cell::new(Span::synthetic()),
        }
    }

    /// Set the span attached to nodes built from now on.
    pub fn at(&self, line: u32, col: u32, len: u32) -> &Self {
        self.span.set(Span::new(line, col, len));
        self
    }

    fn span(&self) -> Span {
        self.span.get()
    }

    fn str(&self, s: &str) -> &'ast str {
        self.arena.alloc_str(s)
    }

    fn slice<T: Copy>(&self, items: &[T]) -> &'ast [T] {
        self.arena.alloc_slice_copy(items)
    }

    fn names(&self, names: &[&str]) -> &'ast [&'ast str] {
        let mut out = BumpVec::with_capacity_in(names.len(), self.arena);
        out.extend(names.iter().map(|name| self.str(name)));
        out.into_bump_slice()
    }

    // ==========================================================================
    // Content
    // ==========================================================================

    pub fn template(&self, body: &[Statement<'ast>]) -> Template<'ast> {
        self.template_with_params(&[], body)
    }

    pub fn template_with_params(
        &self,
        block_params: &[&str],
        body: &[Statement<'ast>],
    ) -> Template<'ast> {
        Template {
            body: self.slice(body),
            block_params: self.names(block_params),
            span: self.span(),
        }
    }

    pub fn text(&self, chars: &str) -> Statement<'ast> {
        Statement::Text(self.text_node(chars))
    }

    fn text_node(&self, chars: &str) -> TextNode<'ast> {
        TextNode {
            chars: self.str(chars),
            span: self.span(),
        }
    }

    pub fn comment(&self, value: &str) -> Statement<'ast> {
        Statement::Comment(CommentStatement {
            value: self.str(value),
            span: self.span(),
        })
    }

    pub fn mustache_comment(&self, value: &str) -> Statement<'ast> {
        Statement::MustacheComment(CommentStatement {
            value: self.str(value),
            span: self.span(),
        })
    }

    pub fn mustache(
        &self,
        path: Expression<'ast>,
        params: &[Expression<'ast>],
        hash: Hash<'ast>,
    ) -> &'ast MustacheStatement<'ast> {
        self.arena.alloc(MustacheStatement {
            path,
            params: self.slice(params),
            hash,
            trusting: false,
            span: self.span(),
        })
    }

    /// `{{path params hash}}`
    pub fn append(
        &self,
        path: Expression<'ast>,
        params: &[Expression<'ast>],
        hash: Hash<'ast>,
    ) -> Statement<'ast> {
        Statement::Mustache(self.mustache(path, params, hash))
    }

    /// `{{{path params hash}}}`
    pub fn trusting_append(
        &self,
        path: Expression<'ast>,
        params: &[Expression<'ast>],
        hash: Hash<'ast>,
    ) -> Statement<'ast> {
        let mustache = self.arena.alloc(MustacheStatement {
            path,
            params: self.slice(params),
            hash,
            trusting: true,
            span: self.span(),
        });
        Statement::Mustache(mustache)
    }

    pub fn program(
        &self,
        block_params: &[&str],
        body: &[Statement<'ast>],
    ) -> Block<'ast> {
        Block {
            body: self.slice(body),
            block_params: self.names(block_params),
            chained: false,
            span: self.span(),
        }
    }

    /// `{{#path params hash}}program{{else}}inverse{{/path}}`
    pub fn block(
        &self,
        path: Expression<'ast>,
        params: &[Expression<'ast>],
        hash: Hash<'ast>,
        program: Block<'ast>,
        inverse: Option<Block<'ast>>,
    ) -> Statement<'ast> {
        Statement::Block(self.arena.alloc(BlockStatement {
            path,
            params: self.slice(params),
            hash,
            program,
            inverse,
            span: self.span(),
        }))
    }

    pub fn element(&self, tag: &str) -> ElementBuilder<'ast> {
        ElementBuilder {
            arena: self.arena,
            tag: self.str(tag),
            attributes: BumpVec::new_in(self.arena),
            modifiers: BumpVec::new_in(self.arena),
            children: BumpVec::new_in(self.arena),
            block_params: BumpVec::new_in(self.arena),
            span: self.span(),
        }
    }

    // ==========================================================================
    // Attributes and modifiers
    // ==========================================================================

    pub fn attr_text(&self, chars: &str) -> AttrValue<'ast> {
        AttrValue::Text(self.text_node(chars))
    }

    pub fn attr_mustache(
        &self,
        path: Expression<'ast>,
        params: &[Expression<'ast>],
        hash: Hash<'ast>,
    ) -> AttrValue<'ast> {
        AttrValue::Mustache(self.mustache(path, params, hash))
    }

    pub fn concat(&self, parts: &[ConcatPart<'ast>]) -> AttrValue<'ast> {
        AttrValue::Concat(self.slice(parts), self.span())
    }

    pub fn concat_text(&self, chars: &str) -> ConcatPart<'ast> {
        ConcatPart::Text(self.text_node(chars))
    }

    pub fn concat_mustache(
        &self,
        path: Expression<'ast>,
        params: &[Expression<'ast>],
        hash: Hash<'ast>,
    ) -> ConcatPart<'ast> {
        ConcatPart::Mustache(self.mustache(path, params, hash))
    }

    pub fn modifier(
        &self,
        path: Expression<'ast>,
        params: &[Expression<'ast>],
        hash: Hash<'ast>,
    ) -> ElementModifier<'ast> {
        ElementModifier {
            path,
            params: self.slice(params),
            hash,
            span: self.span(),
        }
    }

    // ==========================================================================
    // Expressions
    // ==========================================================================

    /// Parse a dotted path: `this`, `this.a`, `@arg.b`, `name.c`.
    pub fn path(&self, original: &str) -> Expression<'ast> {
        let mut segments = original.split('.');
        let head = match segments.next().unwrap_or_default() {
            "this" => PathHead::This,
            head => match head.strip_prefix('@') {
                Some(name) => PathHead::AtName(self.str(name)),
                None => PathHead::Var(self.str(head)),
            },
        };
        Expression::Path(PathExpression {
            head,
            tail: {
                let mut tail = BumpVec::new_in(self.arena);
                tail.extend(segments.map(|segment| self.str(segment)));
                tail.into_bump_slice()
            },
            span: self.span(),
        })
    }

    pub fn string(&self, value: &str) -> Expression<'ast> {
        self.literal(LiteralValue::String(self.str(value)))
    }

    pub fn number(&self, value: f64) -> Expression<'ast> {
        self.literal(LiteralValue::Number(value))
    }

    pub fn boolean(&self, value: bool) -> Expression<'ast> {
        self.literal(LiteralValue::Boolean(value))
    }

    pub fn null(&self) -> Expression<'ast> {
        self.literal(LiteralValue::Null)
    }

    pub fn undefined(&self) -> Expression<'ast> {
        self.literal(LiteralValue::Undefined)
    }

    fn literal(&self, value: LiteralValue<'ast>) -> Expression<'ast> {
        Expression::Literal(Literal {
            value,
            span: self.span(),
        })
    }

    /// `(path params hash)`
    pub fn sexpr(
        &self,
        path: Expression<'ast>,
        params: &[Expression<'ast>],
        hash: Hash<'ast>,
    ) -> Expression<'ast> {
        Expression::SubExpression(self.arena.alloc(SubExpression {
            path,
            params: self.slice(params),
            hash,
            span: self.span(),
        }))
    }

    pub fn hash(&self, pairs: &[(&str, Expression<'ast>)]) -> Hash<'ast> {
        let span = self.span();
        let mut out = BumpVec::with_capacity_in(pairs.len(), self.arena);
        out.extend(pairs.iter().map(|(key, value)| HashPair {
            key: self.str(key),
            value: *value,
            span,
        }));
        Hash {
            pairs: out.into_bump_slice(),
            span,
        }
    }

    pub fn no_hash(&self) -> Hash<'ast> {
        Hash {
            pairs: &[],
            span: self.span(),
        }
    }
}

/// Accumulates the parts of an element before allocating it.
pub struct ElementBuilder<'ast> {
    arena: &'ast Bump,
    tag: &'ast str,
    attributes: BumpVec<'ast, AttrNode<'ast>>,
    modifiers: BumpVec<'ast, ElementModifier<'ast>>,
    children: BumpVec<'ast, Statement<'ast>>,
    block_params: BumpVec<'ast, &'ast str>,
    span: Span,
}

impl<'ast> ElementBuilder<'ast> {
    pub fn attr(mut self, name: &str, value: AttrValue<'ast>) -> Self {
        self.attributes.push(AttrNode {
            name: self.arena.alloc_str(name),
            value,
            span: self.span,
        });
        self
    }

    /// `...attributes`
    pub fn splattributes(self) -> Self {
        let empty = AttrValue::Text(TextNode {
            chars: "",
            span: self.span,
        });
        self.attr("...attributes", empty)
    }

    pub fn modifier(mut self, modifier: ElementModifier<'ast>) -> Self {
        self.modifiers.push(modifier);
        self
    }

    pub fn child(mut self, child: Statement<'ast>) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: &[Statement<'ast>]) -> Self {
        self.children.extend_from_slice(children);
        self
    }

    pub fn block_params(mut self, names: &[&str]) -> Self {
        for name in names {
            let name: &'ast str = self.arena.alloc_str(name);
            self.block_params.push(name);
        }
        self
    }

    pub fn build(self) -> Statement<'ast> {
        let self_closing = self.children.is_empty();
        Statement::Element(self.arena.alloc(ElementNode {
            tag: self.tag,
            attributes: self.attributes.into_bump_slice(),
            modifiers: self.modifiers.into_bump_slice(),
            children: self.children.into_bump_slice(),
            block_params: self.block_params.into_bump_slice(),
            self_closing,
            span: self.span,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_parsing_classifies_heads() {
        let arena = Bump::new();
        let b = Builder::new(&arena);

        let Expression::Path(this) = b.path("this.title") else {
            panic!("expected path");
        };
        assert_eq!(this.head, PathHead::This);
        assert_eq!(this.tail, &["title"]);

        let Expression::Path(arg) = b.path("@model.name") else {
            panic!("expected path");
        };
        assert_eq!(arg.head, PathHead::AtName("model"));
        assert_eq!(arg.original(), "@model.name");

        let Expression::Path(var) = b.path("helper-call") else {
            panic!("expected path");
        };
        assert_eq!(var.as_simple_var(), Some("helper-call"));
    }

    #[test]
    fn spans_follow_the_cursor() {
        let arena = Bump::new();
        let b = Builder::new(&arena);
        let first = b.at(1, 1, 3).text("one");
        let second = b.at(2, 5, 3).text("two");
        assert_eq!(first.span(), Span::new(1, 1, 3));
        assert_eq!(second.span(), Span::new(2, 5, 3));
    }

    #[test]
    fn element_builder_collects_parts() {
        let arena = Bump::new();
        let b = Builder::new(&arena);
        let element = b
            .element("div")
            .attr("class", b.attr_text("box"))
            .splattributes()
            .child(b.text("hi"))
            .build();

        let Statement::Element(node) = element else {
            panic!("expected element");
        };
        assert_eq!(node.tag, "div");
        assert_eq!(node.attributes.len(), 2);
        assert_eq!(node.attributes[1].name, "...attributes");
        assert!(!node.self_closing);
    }

    #[test]
    fn hash_lookup_by_key() {
        let arena = Bump::new();
        let b = Builder::new(&arena);
        let hash = b.hash(&[("key", b.string("id")), ("to", b.string("inverse"))]);
        assert!(hash.get("to").is_some());
        assert!(hash.get("missing").is_none());
    }
}
