use bumpalo::Bump;
use weave_registry::{ComponentCapabilities, Registry};
use weave_syntax::v1::Builder;
use weave_syntax::v2::ContentNode;
use weave_syntax::{NormalizeOptions, normalize, v1};

use super::*;
use crate::encoding::PrimitiveValue;
use crate::ops::{CompilableBlock, HighLevelOp};
use crate::options::CompileOptions;

fn lower_with(template: &v1::Template<'_>, registry: &Registry) -> Result<OpBuilder> {
    let normalized = normalize(template, &NormalizeOptions::new())?;
    let meta = TemplateMeta::new(&normalized, &CompileOptions::new());
    compile_statements(registry, &meta, &normalized.body)
}

fn lower(template: &v1::Template<'_>) -> OpBuilder {
    lower_with(template, &Registry::new()).unwrap()
}

fn resolutions(op: &OpBuilder) -> Vec<&'static str> {
    op.ops()
        .iter()
        .filter_map(|op| match op {
            HighLevelOp::Resolve(resolve) => Some(match resolve {
                Resolve::Component { .. } => "component",
                Resolve::Helper { .. } => "helper",
                Resolve::OptionalHelper { .. } => "optional-helper",
                Resolve::Modifier { .. } => "modifier",
                Resolve::ComponentOrHelper { .. } => "component-or-helper",
                Resolve::OptionalComponentOrHelper { .. } => "optional-component-or-helper",
                Resolve::Local { .. } => "local",
                Resolve::TemplateLocal { .. } => "template-local",
            }),
            _ => None,
        })
        .collect()
}

fn operands(op: &OpBuilder, opcode: Opcode) -> Vec<&[Operand]> {
    op.ops()
        .iter()
        .filter_map(|hl| match hl {
            HighLevelOp::Op(op) if op.opcode == opcode => Some(op.operands.as_slice()),
            _ => None,
        })
        .collect()
}

/// Bodies of the nested blocks, in the order they are pushed.
fn nested_texts(op: &OpBuilder) -> Vec<String> {
    op.ops()
        .iter()
        .filter_map(|hl| match hl {
            HighLevelOp::CompileBlock(CompilableBlock::Block(block)) => {
                match block.body.first() {
                    Some(ContentNode::HtmlText(text)) => Some(text.chars.clone()),
                    _ => Some(String::new()),
                }
            }
            _ => None,
        })
        .collect()
}

fn count(op: &OpBuilder, opcode: Opcode) -> usize {
    op.opcodes().iter().filter(|o| **o == opcode).count()
}

// ============================================================================
// Content
// ============================================================================

#[test]
fn text_and_comments() {
    let arena = Bump::new();
    let b = Builder::new(&arena);
    let op = lower(&b.template(&[
        b.text("a"),
        b.comment(" html "),
        b.mustache_comment(" dropped "),
    ]));
    assert_eq!(op.opcodes(), vec![Opcode::Text, Opcode::Comment]);
}

#[test]
fn literal_appends_become_text() {
    let arena = Bump::new();
    let b = Builder::new(&arena);
    let op = lower(&b.template(&[
        b.append(b.string("hi"), &[], b.no_hash()),
        b.append(b.null(), &[], b.no_hash()),
    ]));
    let texts: Vec<_> = operands(&op, Opcode::Text)
        .into_iter()
        .map(|operands| match &operands[0] {
            Operand::Str(s) => s.clone(),
            other => panic!("expected a string operand, got {other:?}"),
        })
        .collect();
    assert_eq!(texts, vec!["hi".to_string(), String::new()]);
}

#[test]
fn path_appends_use_the_cautious_routine() {
    let arena = Bump::new();
    let b = Builder::new(&arena);
    let op = lower(&b.template(&[b.append(b.path("this.user.name"), &[], b.no_hash())]));
    assert_eq!(
        op.opcodes(),
        vec![
            Opcode::PushFrame,
            Opcode::GetVariable,
            Opcode::GetProperty,
            Opcode::GetProperty,
            Opcode::InvokeStatic,
            Opcode::PopFrame,
        ]
    );
    assert!(matches!(
        operands(&op, Opcode::InvokeStatic)[0],
        [Operand::Stdlib(StdlibRoutine::CautiousAppend)]
    ));
}

#[test]
fn trusting_appends_use_the_trusting_routine() {
    let arena = Bump::new();
    let b = Builder::new(&arena);
    let op = lower(&b.template(&[b.trusting_append(b.path("this.html"), &[], b.no_hash())]));
    assert!(matches!(
        operands(&op, Opcode::InvokeStatic)[0],
        [Operand::Stdlib(StdlibRoutine::TrustingAppend)]
    ));
}

#[test]
fn bare_names_in_append_position_are_ambiguous() {
    let arena = Bump::new();
    let b = Builder::new(&arena);
    let op = lower(&b.template(&[
        b.append(b.path("greeting"), &[], b.no_hash()),
        b.append(b.path("t"), &[b.string("welcome")], b.no_hash()),
    ]));
    assert_eq!(
        resolutions(&op),
        vec!["optional-component-or-helper", "component-or-helper"]
    );
}

#[test]
fn trusting_calls_only_resolve_helpers() {
    let arena = Bump::new();
    let b = Builder::new(&arena);
    let op = lower(&b.template(&[b.trusting_append(
        b.path("markdown"),
        &[b.path("this.body")],
        b.no_hash(),
    )]));
    assert_eq!(resolutions(&op), vec!["helper"]);
    assert!(matches!(
        operands(&op, Opcode::InvokeStatic)[0],
        [Operand::Stdlib(StdlibRoutine::TrustingAppend)]
    ));
}

#[test]
fn dynamic_callees_switch_on_content_type() {
    let arena = Bump::new();
    let b = Builder::new(&arena);
    let op = lower(&b.template(&[b.append(
        b.path("this.renderer"),
        &[b.string("x")],
        b.no_hash(),
    )]));
    let ops = op.opcodes();
    assert_eq!(ops[0], Opcode::Enter);
    assert!(ops.contains(&Opcode::DynamicContentType));
    assert_eq!(count(&op, Opcode::JumpEq), 1);
    assert!(ops.contains(&Opcode::ResolveCurriedComponent));
    assert!(ops.contains(&Opcode::DynamicHelper));
    assert_eq!(ops.last(), Some(&Opcode::Exit));
    assert!(resolutions(&op).is_empty());
}

#[test]
fn debugger_pushes_the_symbol_names() {
    let arena = Bump::new();
    let b = Builder::new(&arena);
    let op = lower(&b.template(&[b.append(b.path("debugger"), &[], b.no_hash())]));
    assert!(matches!(
        op.ops()[0],
        HighLevelOp::PushConstant(Constant::StringArray(_))
    ));
    assert!(matches!(
        operands(&op, Opcode::Debugger)[0],
        [Operand::Imm(1)]
    ));
}

#[test]
fn yield_invokes_the_default_block() {
    let arena = Bump::new();
    let b = Builder::new(&arena);
    let op = lower(&b.template(&[b.append(b.path("yield"), &[b.path("this.item")], b.no_hash())]));
    let ops = op.opcodes();
    assert_eq!(ops[0], Opcode::PushFrame);
    assert!(ops.contains(&Opcode::PushArgs));
    assert!(ops.contains(&Opcode::InvokeYield));
    assert_eq!(ops.last(), Some(&Opcode::PopFrame));
}

// ============================================================================
// Elements
// ============================================================================

#[test]
fn simple_elements() {
    let arena = Bump::new();
    let b = Builder::new(&arena);
    let op = lower(&b.template(&[b
        .element("div")
        .attr("class", b.attr_text("card"))
        .child(b.text("body"))
        .build()]));
    assert_eq!(
        op.opcodes(),
        vec![
            Opcode::OpenElement,
            Opcode::StaticAttr,
            Opcode::FlushElement,
            Opcode::Text,
            Opcode::CloseElement,
        ]
    );
}

#[test]
fn dynamic_attributes_evaluate_their_value() {
    let arena = Bump::new();
    let b = Builder::new(&arena);
    let op = lower(&b.template(&[b
        .element("a")
        .attr("href", b.attr_mustache(b.path("this.url"), &[], b.no_hash()))
        .build()]));
    assert!(matches!(
        operands(&op, Opcode::DynamicAttr)[0],
        [Operand::Str(name), Operand::Imm(0)] if name == "href"
    ));
}

#[test]
fn modifiers_resolve_as_modifiers() {
    let arena = Bump::new();
    let b = Builder::new(&arena);
    let op = lower(&b.template(&[b
        .element("button")
        .modifier(b.modifier(b.path("on"), &[b.string("click")], b.no_hash()))
        .build()]));
    assert_eq!(resolutions(&op), vec!["modifier"]);
}

// ============================================================================
// Blocks
// ============================================================================

#[test]
fn if_on_a_property_is_one_guarded_region() {
    let arena = Bump::new();
    let b = Builder::new(&arena);
    let op = lower(&b.template(&[b.block(
        b.path("if"),
        &[b.path("this.isActive")],
        b.no_hash(),
        b.program(&[], &[b.text("Yes")]),
        Some(b.program(&[], &[b.text("No")])),
    )]));
    assert_eq!(count(&op, Opcode::Enter), 1);
    assert_eq!(count(&op, Opcode::JumpUnless), 1);
    assert!(resolutions(&op).is_empty());
    assert_eq!(nested_texts(&op), vec!["Yes", "No"]);
}

#[test]
fn unless_swaps_the_branches() {
    let arena = Bump::new();
    let b = Builder::new(&arena);
    let op = lower(&b.template(&[b.block(
        b.path("unless"),
        &[b.path("this.isActive")],
        b.no_hash(),
        b.program(&[], &[b.text("Yes")]),
        Some(b.program(&[], &[b.text("No")])),
    )]));
    assert_eq!(nested_texts(&op), vec!["No", "Yes"]);
}

#[test]
fn each_iterates_with_a_keyed_list() {
    let arena = Bump::new();
    let b = Builder::new(&arena);
    let op = lower(&b.template(&[b.block(
        b.path("each"),
        &[b.path("this.items")],
        b.hash(&[("key", b.string("id"))]),
        b.program(&["item"], &[b.append(b.path("item"), &[], b.no_hash())]),
        None,
    )]));
    let ops = op.opcodes();
    for expected in [Opcode::EnterList, Opcode::Iterate, Opcode::ExitList] {
        assert!(ops.contains(&expected), "missing {expected}");
    }
    assert_eq!(count(&op, Opcode::Enter), 2);
    assert!(matches!(
        operands(&op, Opcode::Primitive)[0],
        [Operand::Primitive(PrimitiveValue::String(key))] if key == "id"
    ));
}

#[test]
fn let_binds_block_params_from_the_stack() {
    let arena = Bump::new();
    let b = Builder::new(&arena);
    let op = lower(&b.template(&[b.block(
        b.path("let"),
        &[b.path("this.a"), b.path("this.b")],
        b.no_hash(),
        b.program(&["x", "y"], &[b.append(b.path("x"), &[], b.no_hash())]),
        None,
    )]));
    let dups: Vec<_> = operands(&op, Opcode::Dup)
        .into_iter()
        .map(|operands| match operands {
            [_, Operand::Imm(offset)] => *offset,
            other => panic!("unexpected operands {other:?}"),
        })
        .collect();
    assert_eq!(dups, vec![2, 1]);
    assert_eq!(count(&op, Opcode::SetVariable), 2);
}

#[test]
fn in_element_cursors_are_unique() {
    let arena = Bump::new();
    let b = Builder::new(&arena);
    let portal = || {
        b.block(
            b.path("in-element"),
            &[b.path("this.destination")],
            b.no_hash(),
            b.program(&[], &[b.text("x")]),
            None,
        )
    };
    let op = lower(&b.template(&[portal(), portal()]));
    let guids: Vec<_> = operands(&op, Opcode::Primitive)
        .into_iter()
        .filter_map(|operands| match operands {
            [Operand::Primitive(PrimitiveValue::String(guid))] => Some(guid.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(guids, vec!["%cursor:0%".to_string(), "%cursor:1%".to_string()]);
    assert_eq!(count(&op, Opcode::PushRemoteElement), 2);
}

#[test]
fn dynamic_vars_bind_their_names() {
    let arena = Bump::new();
    let b = Builder::new(&arena);
    let op = lower(&b.template(&[b.block(
        b.path("-with-dynamic-vars"),
        &[],
        b.hash(&[("theme", b.path("this.theme"))]),
        b.program(&[], &[b.text("x")]),
        None,
    )]));
    assert!(matches!(
        operands(&op, Opcode::BindDynamicScope)[0],
        [Operand::Strings(names)] if names == &["theme".to_string()]
    ));
}

#[test]
fn loose_block_callees_resolve_components() {
    let arena = Bump::new();
    let b = Builder::new(&arena);
    let op = lower(&b.template(&[b.block(
        b.path("my-card"),
        &[],
        b.no_hash(),
        b.program(&[], &[b.text("x")]),
        None,
    )]));
    assert_eq!(resolutions(&op), vec!["component"]);
}

#[test]
fn component_keyword_with_a_value_resolves_at_runtime() {
    let arena = Bump::new();
    let b = Builder::new(&arena);
    let op = lower(&b.template(&[b.block(
        b.path("component"),
        &[b.path("this.definition")],
        b.no_hash(),
        b.program(&[], &[b.text("x")]),
        None,
    )]));
    let ops = op.opcodes();
    assert!(ops.contains(&Opcode::ResolveDynamicComponent));
    assert!(!ops.contains(&Opcode::ResolveCurriedComponent));
}

#[test]
fn component_keyword_with_a_literal_links_eagerly() {
    let mut registry = Registry::new();
    registry.register_component("user-card", ComponentCapabilities::DYNAMIC_LAYOUT, None);
    let arena = Bump::new();
    let b = Builder::new(&arena);

    let op = lower_with(
        &b.template(&[b.append(b.path("component"), &[b.string("user-card")], b.no_hash())]),
        &registry,
    )
    .unwrap();
    assert!(resolutions(&op).is_empty());
    assert_eq!(op.opcodes()[0], Opcode::PushComponentDefinition);
    assert!(op.opcodes().contains(&Opcode::GetComponentLayout));

    let err = lower_with(
        &b.template(&[b.append(b.path("component"), &[b.string("missing")], b.no_hash())]),
        &registry,
    )
    .unwrap_err();
    assert!(err.is_link());
}

// ============================================================================
// Expressions
// ============================================================================

#[test]
fn inline_if_defaults_the_falsy_branch() {
    let arena = Bump::new();
    let b = Builder::new(&arena);
    let op = lower(&b.template(&[b
        .element("div")
        .attr(
            "class",
            b.attr_mustache(b.path("if"), &[b.path("this.on"), b.string("on")], b.no_hash()),
        )
        .build()]));
    assert!(op.opcodes().contains(&Opcode::IfInline));
    assert!(matches!(
        operands(&op, Opcode::Primitive)[0],
        [Operand::Primitive(PrimitiveValue::Undefined)]
    ));
}

#[test]
fn curried_components_capture_their_arguments() {
    let arena = Bump::new();
    let b = Builder::new(&arena);
    let op = lower(&b.template(&[b.block(
        b.path("let"),
        &[b.sexpr(
            b.path("component"),
            &[b.path("this.definition")],
            b.hash(&[("size", b.string("large"))]),
        )],
        b.no_hash(),
        b.program(&["c"], &[]),
        None,
    )]));
    let ops = op.opcodes();
    assert!(ops.contains(&Opcode::CaptureArgs));
    assert!(matches!(
        operands(&op, Opcode::Curry)[0],
        [Operand::Imm(0), Operand::IsStrict]
    ));
}

// ============================================================================
// Malformed trees
// ============================================================================

/// Normalize a single block statement and hand back its node for editing.
fn invoke_block(template: &v1::Template<'_>) -> (weave_syntax::v2::Template, TemplateMeta) {
    let normalized = normalize(template, &NormalizeOptions::new()).unwrap();
    let meta = TemplateMeta::new(&normalized, &CompileOptions::new());
    assert!(matches!(normalized.body.first(), Some(ContentNode::InvokeBlock(_))));
    (normalized, meta)
}

fn edit_block(
    template: &mut weave_syntax::v2::Template,
    edit: impl FnOnce(&mut weave_syntax::v2::InvokeBlock),
) {
    let Some(ContentNode::InvokeBlock(node)) = template.body.first_mut() else {
        panic!("expected a block, got {:?}", template.body);
    };
    edit(node);
}

#[test]
fn block_keywords_without_their_argument_are_rejected() {
    let arena = Bump::new();
    let b = Builder::new(&arena);
    let registry = Registry::new();

    for keyword in ["if", "unless", "with", "each", "in-element"] {
        let (mut template, meta) = invoke_block(&b.template(&[b.block(
            b.path(keyword),
            &[b.path("this.value")],
            b.no_hash(),
            b.program(&[], &[b.text("body")]),
            None,
        )]));
        edit_block(&mut template, |node| node.args.positional.clear());

        let err = compile_statements(&registry, &meta, &template.body).unwrap_err();
        assert!(err.is_syntax(), "`{keyword}`: {err}");
        assert!(
            err.to_string()
                .contains(&format!("`{keyword}` requires a single argument")),
            "unexpected error: {err}"
        );
    }
}

#[test]
fn block_keywords_without_a_body_are_rejected() {
    let arena = Bump::new();
    let b = Builder::new(&arena);
    let registry = Registry::new();

    for keyword in ["if", "let"] {
        let (mut template, meta) = invoke_block(&b.template(&[b.block(
            b.path(keyword),
            &[b.path("this.value")],
            b.no_hash(),
            b.program(&[], &[b.text("body")]),
            None,
        )]));
        edit_block(&mut template, |node| node.blocks.blocks.clear());

        let err = compile_statements(&registry, &meta, &template.body).unwrap_err();
        assert!(
            err.to_string().contains(&format!("`{keyword}` requires a block")),
            "unexpected error: {err}"
        );
    }
}

#[test]
fn component_blocks_need_a_definition() {
    let arena = Bump::new();
    let b = Builder::new(&arena);
    let mut registry = Registry::new();
    registry.register_component("user-card", ComponentCapabilities::empty(), None);

    let (mut template, meta) = invoke_block(&b.template(&[b.block(
        b.path("component"),
        &[b.string("user-card")],
        b.no_hash(),
        b.program(&[], &[b.text("body")]),
        None,
    )]));
    edit_block(&mut template, |node| node.args.positional.clear());

    let err = compile_statements(&registry, &meta, &template.body).unwrap_err();
    assert!(err.is_syntax());
    assert!(err.to_string().contains("`component` requires a component definition"));
}

#[test]
fn keyword_calls_with_the_wrong_arity_are_rejected() {
    let arena = Bump::new();
    let b = Builder::new(&arena);
    let registry = Registry::new();

    let normalized = normalize(
        &b.template(&[b.append(
            b.path("-get-dynamic-var"),
            &[b.string("locale")],
            b.no_hash(),
        )]),
        &NormalizeOptions::new(),
    )
    .unwrap();
    let mut body = normalized.body.clone();
    let Some(ContentNode::AppendContent(append)) = body.first_mut() else {
        panic!("expected an append, got {body:?}");
    };
    let ExpressionNode::Call(call) = &mut append.value else {
        panic!("expected a call, got {:?}", append.value);
    };
    call.args.positional.clear();

    let meta = TemplateMeta::new(&normalized, &CompileOptions::new());
    let op = compile_statements(&registry, &meta, &body).unwrap();
    assert!(!op.opcodes().contains(&Opcode::GetDynamicVar));
    let rejected: Vec<_> = op
        .ops()
        .iter()
        .filter_map(|hl| match hl {
            HighLevelOp::Reject(error) => Some(error.message.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(rejected, ["`-get-dynamic-var` requires a single argument"]);
}
