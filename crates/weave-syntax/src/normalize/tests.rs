use bumpalo::Bump;
use weave_core::{CompileError, SyntaxErrorKind};

use super::*;
use crate::resolution::{FreeVarNamespace, FreeVarResolution};
use crate::v1::Builder;
use crate::v2::{ContentNode, ElementParameter, ExpressionNode, VariableReference};

fn loose(template: &v1::Template<'_>) -> Result<v2::Template> {
    normalize(template, &NormalizeOptions::new())
}

fn syntax_kind(result: Result<v2::Template>) -> SyntaxErrorKind {
    match result {
        Err(CompileError::Syntax(err)) => err.kind,
        other => panic!("expected a syntax error, got {other:?}"),
    }
}

fn append_value(node: &ContentNode) -> &ExpressionNode {
    match node {
        ContentNode::AppendContent(append) => &append.value,
        other => panic!("expected an append, got {other:?}"),
    }
}

fn reference(expr: &ExpressionNode) -> &VariableReference {
    match expr {
        ExpressionNode::Path(path) => &path.reference,
        other => panic!("expected a path, got {other:?}"),
    }
}

#[test]
fn if_with_two_arguments_names_the_keyword() {
    let arena = Bump::new();
    let b = Builder::new(&arena);
    let template = b.template(&[b.at(1, 1, 22).block(
        b.path("if"),
        &[b.path("a"), b.path("b")],
        b.no_hash(),
        b.program(&[], &[b.text("x")]),
        None,
    )]);

    let err = loose(&template).unwrap_err();
    assert!(err.is_syntax());
    assert!(err.to_string().contains("`if` requires a single argument"));
}

#[test]
fn block_params_shadow_free_variables() {
    let arena = Bump::new();
    let b = Builder::new(&arena);
    let template = b.template(&[b.block(
        b.path("each"),
        &[b.path("items")],
        b.no_hash(),
        b.program(&["item"], &[b.append(b.path("item"), &[], b.no_hash())]),
        None,
    )]);

    let normalized = loose(&template).unwrap();
    let ContentNode::InvokeBlock(invoke) = &normalized.body[0] else {
        panic!("expected a block");
    };
    let items = reference(&invoke.args.positional[0]);
    assert!(matches!(
        items,
        VariableReference::Free(free) if free.resolution == FreeVarResolution::fallback()
    ));

    let default = invoke.blocks.get("default").unwrap();
    let VariableReference::Local { slot, .. } = reference(append_value(&default.body[0])) else {
        panic!("expected a local");
    };
    assert_eq!(default.parameters, vec![*slot]);
    assert_eq!(normalized.table.upvars(), &["items"]);
}

#[test]
fn component_argument_values_resolve_as_helpers_with_fallback() {
    let arena = Bump::new();
    let b = Builder::new(&arena);
    let template = b.template(&[b
        .element("Foo")
        .attr("@bar", b.attr_mustache(b.path("x"), &[], b.no_hash()))
        .build()]);

    let normalized = loose(&template).unwrap();
    let ContentNode::InvokeComponent(component) = &normalized.body[0] else {
        panic!("expected a component");
    };
    let VariableReference::Free(callee) = reference(&component.callee) else {
        panic!("expected a free callee");
    };
    assert!(callee.resolution.is_component());

    let VariableReference::Free(x) = reference(component.args.get("bar").unwrap()) else {
        panic!("expected a free argument value");
    };
    assert_eq!(
        x.resolution,
        FreeVarResolution::namespaced_with_fallback(FreeVarNamespace::Helper)
    );
    assert!(component.blocks.is_empty());
}

#[test]
fn sibling_splattributes_get_distinct_slots() {
    let arena = Bump::new();
    let b = Builder::new(&arena);
    let template = b.template(&[
        b.element("div").splattributes().build(),
        b.element("span").splattributes().build(),
    ]);

    let normalized = loose(&template).unwrap();
    let slots: Vec<u32> = normalized
        .body
        .iter()
        .map(|node| match node {
            ContentNode::SimpleElement(el) => match el.params.params[0] {
                ElementParameter::Splat { slot, .. } => slot,
                ref other => panic!("expected a splat, got {other:?}"),
            },
            other => panic!("expected an element, got {other:?}"),
        })
        .collect();
    assert_eq!(slots.len(), 2);
    assert_ne!(slots[0], slots[1]);
}

#[test]
fn repeated_free_names_share_an_upvar() {
    let arena = Bump::new();
    let b = Builder::new(&arena);
    let template = b.template(&[
        b.at(1, 1, 15).append(b.path("helper-call"), &[], b.no_hash()),
        b.at(2, 1, 15).append(b.path("helper-call"), &[], b.no_hash()),
    ]);

    let normalized = loose(&template).unwrap();
    let first = reference(append_value(&normalized.body[0]));
    let second = reference(append_value(&normalized.body[1]));
    let (VariableReference::Free(first), VariableReference::Free(second)) = (first, second) else {
        panic!("expected free references");
    };
    assert_eq!(first.slot, second.slot);
    assert_ne!(first.span, second.span);
    assert_eq!(first.resolution, FreeVarResolution::component_or_helper(true));
    assert_eq!(normalized.table.upvars().len(), 1);
}

#[test]
fn strict_mode_makes_every_free_name_strict() {
    let arena = Bump::new();
    let b = Builder::new(&arena);
    let template = b.template(&[b.append(b.path("format"), &[b.path("value")], b.no_hash())]);
    let options = NormalizeOptions::new().with_strict(true);

    let normalized = normalize(&template, &options).unwrap();
    let ExpressionNode::Call(call) = append_value(&normalized.body[0]) else {
        panic!("expected a call");
    };
    assert!(matches!(
        reference(&call.callee),
        VariableReference::Free(free) if free.resolution == FreeVarResolution::Strict
    ));
}

#[test]
fn strict_mode_rejects_unknown_component_tags() {
    let arena = Bump::new();
    let b = Builder::new(&arena);
    let template = b.template(&[b.element("Missing").build()]);
    let options = NormalizeOptions::new().with_strict(true);
    assert_eq!(
        syntax_kind(normalize(&template, &options)),
        SyntaxErrorKind::ComponentNotInScope
    );

    let options = options.with_template_locals(["Missing"]);
    assert!(normalize(&template, &options).is_ok());
}

#[test]
fn literal_callees_with_arguments_are_rejected() {
    let arena = Bump::new();
    let b = Builder::new(&arena);
    let template = b.template(&[b.append(b.string("foo"), &[b.path("bar")], b.no_hash())]);
    assert_eq!(syntax_kind(loose(&template)), SyntaxErrorKind::LiteralCallee);
}

#[test]
fn non_simple_callees_with_arguments_cannot_resolve() {
    let arena = Bump::new();
    let b = Builder::new(&arena);
    let template = b.template(&[b.append(b.path("foo.bar"), &[b.path("baz")], b.no_hash())]);

    match loose(&template) {
        Err(CompileError::Resolution(err)) => {
            assert_eq!(err.head, "foo");
            assert_eq!(err.path, "foo.bar");
            assert_eq!(err.position, "append");
        }
        other => panic!("expected a resolution error, got {other:?}"),
    }
}

#[test]
fn named_blocks_become_component_blocks() {
    let arena = Bump::new();
    let b = Builder::new(&arena);
    let template = b.template(&[b
        .element("Card")
        .children(&[
            b.element(":header").child(b.text("Title")).build(),
            b.text("\n  "),
            b.element(":body")
                .block_params(&["close"])
                .child(b.append(b.path("close"), &[], b.no_hash()))
                .build(),
        ])
        .build()]);

    let normalized = loose(&template).unwrap();
    let ContentNode::InvokeComponent(component) = &normalized.body[0] else {
        panic!("expected a component");
    };
    assert_eq!(component.blocks.names(), vec!["header", "body"]);
    assert_eq!(component.blocks.get("body").unwrap().parameters.len(), 1);
}

#[test]
fn named_blocks_cannot_mix_with_content() {
    let arena = Bump::new();
    let b = Builder::new(&arena);
    let template = b.template(&[b
        .element("Card")
        .children(&[b.element(":header").build(), b.text("stray")])
        .build()]);
    assert_eq!(syntax_kind(loose(&template)), SyntaxErrorKind::MixedNamedBlocks);
}

#[test]
fn named_blocks_must_be_unique() {
    let arena = Bump::new();
    let b = Builder::new(&arena);
    let template = b.template(&[b
        .element("Card")
        .children(&[b.element(":header").build(), b.element(":header").build()])
        .build()]);
    assert_eq!(
        syntax_kind(loose(&template)),
        SyntaxErrorKind::DuplicateNamedBlock
    );
}

#[test]
fn named_blocks_outside_components_are_rejected() {
    let arena = Bump::new();
    let b = Builder::new(&arena);
    let template = b.template(&[b
        .element("div")
        .child(b.element(":header").build())
        .build()]);
    assert_eq!(
        syntax_kind(loose(&template)),
        SyntaxErrorKind::NamedBlockPosition
    );
}

#[test]
fn arguments_on_plain_elements_are_rejected() {
    let arena = Bump::new();
    let b = Builder::new(&arena);
    let template = b.template(&[b
        .element("div")
        .attr("@title", b.attr_text("x"))
        .build()]);
    assert_eq!(
        syntax_kind(loose(&template)),
        SyntaxErrorKind::ArgumentOnElement
    );
}

#[test]
fn duplicate_block_params_are_rejected() {
    let arena = Bump::new();
    let b = Builder::new(&arena);
    let template = b.template(&[b.block(
        b.path("each"),
        &[b.path("items")],
        b.no_hash(),
        b.program(&["item", "item"], &[]),
        None,
    )]);
    assert_eq!(
        syntax_kind(loose(&template)),
        SyntaxErrorKind::DuplicateBlockParam
    );
}

#[test]
fn yield_to_inverse_targets_the_else_block() {
    let arena = Bump::new();
    let b = Builder::new(&arena);
    let template = b.template(&[
        b.append(
            b.path("yield"),
            &[],
            b.hash(&[("to", b.string("inverse"))]),
        ),
        b.append(b.path("has-block"), &[b.string("else")], b.no_hash()),
    ]);

    let normalized = loose(&template).unwrap();
    let ContentNode::Yield(yielded) = &normalized.body[0] else {
        panic!("expected a yield");
    };
    let ExpressionNode::HasBlock(has_block) = append_value(&normalized.body[1]) else {
        panic!("expected has-block");
    };
    assert_eq!(yielded.target_slot, has_block.slot);
    assert_eq!(normalized.table.block_slot("else"), Some(has_block.slot));
}

#[test]
fn yield_target_must_be_a_literal() {
    let arena = Bump::new();
    let b = Builder::new(&arena);
    let template = b.template(&[b.append(
        b.path("yield"),
        &[],
        b.hash(&[("to", b.path("target"))]),
    )]);
    assert_eq!(syntax_kind(loose(&template)), SyntaxErrorKind::KeywordArity);
}

#[test]
fn debugger_marks_the_template_as_using_eval() {
    let arena = Bump::new();
    let b = Builder::new(&arena);
    let template = b.template(&[b.append(b.path("debugger"), &[], b.no_hash())]);
    let normalized = loose(&template).unwrap();
    assert!(normalized.table.has_eval());
    assert!(matches!(normalized.body[0], ContentNode::Debugger(_)));
}

#[test]
fn bound_names_are_never_keywords() {
    let arena = Bump::new();
    let b = Builder::new(&arena);
    let template = b.template(&[b.block(
        b.path("let"),
        &[b.path("@value")],
        b.no_hash(),
        b.program(&["if"], &[b.append(b.path("if"), &[], b.no_hash())]),
        None,
    )]);

    let normalized = loose(&template).unwrap();
    let ContentNode::InvokeBlock(invoke) = &normalized.body[0] else {
        panic!("expected a block");
    };
    let body = &invoke.blocks.get("default").unwrap().body;
    assert!(matches!(
        reference(append_value(&body[0])),
        VariableReference::Local { name, .. } if name == "if"
    ));
}

#[test]
fn concatenated_attributes_become_interpolations() {
    let arena = Bump::new();
    let b = Builder::new(&arena);
    let template = b.template(&[b
        .element("img")
        .attr(
            "src",
            b.concat(&[
                b.concat_mustache(b.path("@name"), &[], b.no_hash()),
                b.concat_text(".png"),
            ]),
        )
        .build()]);

    let normalized = loose(&template).unwrap();
    let ContentNode::SimpleElement(el) = &normalized.body[0] else {
        panic!("expected an element");
    };
    let ElementParameter::Attr(attr) = &el.params.params[0] else {
        panic!("expected an attribute");
    };
    let ExpressionNode::Interpolate(interpolate) = &attr.value else {
        panic!("expected an interpolation");
    };
    assert_eq!(interpolate.parts.len(), 2);
    assert_eq!(interpolate.parts[1].as_string_literal(), Some(".png"));
    assert_eq!(normalized.table.named_slot("name"), Some(1));
}
