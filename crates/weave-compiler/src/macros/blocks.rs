//! Block macros.

use std::rc::Rc;

use weave_core::{CompileError, LinkError, LookupKind, Span, SyntaxError};
use weave_syntax::v2::{Args, Block, ExpressionNode, InvokeBlock};

use crate::compile::{InvocationBlocks, Result, StatementCompiler};
use crate::encoding::PrimitiveValue;
use crate::opcode::{Opcode, Register};
use crate::ops::Operand;

/// `{{#if cond}}...{{else}}...{{/if}}`
pub(super) fn if_block(cx: &mut StatementCompiler<'_>, node: &InvokeBlock) -> Result<()> {
    let condition = single_argument(node, "if")?;
    let default = default_block(node, "if")?;
    cx.op.replayable_if(
        |op| {
            op.expr(condition);
            op.op(Opcode::ToBoolean);
            1
        },
        |op| op.invoke_static_block(default),
        |op| op.invoke_branch(node.blocks.get("else")),
    );
    Ok(())
}

/// `{{#unless cond}}`, `if` with the branches swapped.
pub(super) fn unless_block(cx: &mut StatementCompiler<'_>, node: &InvokeBlock) -> Result<()> {
    let condition = single_argument(node, "unless")?;
    let default = default_block(node, "unless")?;
    cx.op.replayable_if(
        |op| {
            op.expr(condition);
            op.op(Opcode::ToBoolean);
            1
        },
        |op| op.invoke_branch(node.blocks.get("else")),
        |op| op.invoke_static_block(default),
    );
    Ok(())
}

/// `{{#with value as |v|}}`: the tested value stays on the stack for the
/// block parameter.
pub(super) fn with_block(cx: &mut StatementCompiler<'_>, node: &InvokeBlock) -> Result<()> {
    let value = single_argument(node, "with")?;
    let default = default_block(node, "with")?;
    cx.op.replayable_if(
        |op| {
            op.expr(value);
            op.op_with(Opcode::Dup, [Operand::register(Register::Sp), Operand::Imm(0)]);
            op.op(Opcode::ToBoolean);
            2
        },
        |op| op.invoke_static_block_with_stack(default, 1),
        |op| op.invoke_branch(node.blocks.get("else")),
    );
    Ok(())
}

/// `{{#each list key="id" as |item index|}}`
pub(super) fn each_block(cx: &mut StatementCompiler<'_>, node: &InvokeBlock) -> Result<()> {
    let list = single_argument(node, "each")?;
    let default = default_block(node, "each")?;
    cx.op.replayable(
        |op| {
            match node.args.get("key") {
                Some(key) => op.expr(key),
                None => op.primitive_reference(PrimitiveValue::Null),
            }
            op.expr(list);
            2
        },
        |op| {
            op.op_with(
                Opcode::EnterList,
                [Operand::label("BODY"), Operand::label("ELSE")],
            );
            op.op(Opcode::PushFrame);
            op.op_with(Opcode::Dup, [Operand::register(Register::Fp), Operand::Imm(1)]);
            op.op_with(Opcode::ReturnTo, [Operand::label("ITER")]);
            op.label("ITER");
            op.op_with(Opcode::Iterate, [Operand::label("BREAK")]);
            op.label("BODY");
            op.op_with(Opcode::Enter, [Operand::Imm(2)]);
            op.invoke_static_block_with_stack(default, 2);
            op.op(Opcode::Exit);
            op.op_with(Opcode::Pop, [Operand::Imm(2)]);
            op.op(Opcode::Return);
            op.label("BREAK");
            op.op(Opcode::PopFrame);
            op.op(Opcode::ExitList);
            op.op_with(Opcode::Jump, [Operand::label("FINALLY")]);
            op.label("ELSE");
            op.invoke_branch(node.blocks.get("else"));
        },
    );
    Ok(())
}

/// `{{#let a b as |x y|}}`
pub(super) fn let_block(cx: &mut StatementCompiler<'_>, node: &InvokeBlock) -> Result<()> {
    let default = default_block(node, "let")?;
    let count = cx.op.positional(&node.args.positional);
    cx.op.invoke_static_block_with_stack(default, count as u32);
    Ok(())
}

/// `{{#in-element destination insertBefore=null}}`
pub(super) fn in_element(cx: &mut StatementCompiler<'_>, node: &InvokeBlock) -> Result<()> {
    let destination = single_argument(node, "in-element")?;
    let default = default_block(node, "in-element")?;
    let guid = cx.meta.next_guid();
    cx.op.replayable_if(
        |op| {
            op.primitive_reference(PrimitiveValue::String(guid));
            match node.args.get("insertBefore") {
                Some(insert_before) => op.expr(insert_before),
                None => op.primitive_reference(PrimitiveValue::Undefined),
            }
            op.expr(destination);
            op.op_with(Opcode::Dup, [Operand::register(Register::Sp), Operand::Imm(0)]);
            4
        },
        |op| {
            op.op(Opcode::PushRemoteElement);
            op.invoke_static_block(default);
            op.op(Opcode::PopRemoteElement);
        },
        |_| {},
    );
    Ok(())
}

/// `{{#-with-dynamic-vars name=value}}`
pub(super) fn with_dynamic_vars(cx: &mut StatementCompiler<'_>, node: &InvokeBlock) -> Result<()> {
    let default = default_block(node, "-with-dynamic-vars")?;
    for arg in &node.args.named {
        cx.op.expr(&arg.value);
    }
    cx.op.dynamic_scope(node.args.names(), |op| {
        op.invoke_static_block(default);
    });
    Ok(())
}

/// `{{#component definition ...}}`
pub(super) fn component_block(cx: &mut StatementCompiler<'_>, node: &InvokeBlock) -> Result<()> {
    let (definition, args) = split_definition(&node.args, node.span)?;
    invoke_definition(cx, definition, &args, &InvocationBlocks::new(&node.blocks))
}

/// The only positional argument of `keyword`.
fn single_argument<'a>(node: &'a InvokeBlock, keyword: &str) -> Result<&'a ExpressionNode> {
    match node.args.positional.as_slice() {
        [argument] => Ok(argument),
        _ => Err(SyntaxError::keyword_arity(keyword, node.span, "a single argument").into()),
    }
}

fn default_block<'a>(node: &'a InvokeBlock, keyword: &str) -> Result<&'a Rc<Block>> {
    node.blocks
        .get("default")
        .ok_or_else(|| CompileError::from(SyntaxError::keyword_arity(keyword, node.span, "a block")))
}

/// The definition argument and the arguments forwarded to it.
pub(super) fn split_definition(args: &Args, span: Span) -> Result<(&ExpressionNode, Args)> {
    let Some((definition, rest)) = args.positional.split_first() else {
        return Err(SyntaxError::keyword_arity("component", span, "a component definition").into());
    };
    Ok((
        definition,
        Args {
            positional: rest.to_vec(),
            named: args.named.clone(),
            span: args.span,
        },
    ))
}

/// Invoke a component definition given as a value.
///
/// A string literal names the component directly and is resolved right
/// away; a missing component is an error for the whole template.
pub(super) fn invoke_definition(
    cx: &mut StatementCompiler<'_>,
    definition: &ExpressionNode,
    args: &Args,
    blocks: &InvocationBlocks,
) -> Result<()> {
    if let Some(name) = definition.as_string_literal() {
        let component = cx
            .resolver
            .lookup_component(name, cx.meta.owner)
            .ok_or_else(|| LinkError::new(name, LookupKind::Component, definition.span()))?;
        cx.op.invoke_resolved(&component, args, blocks);
        return Ok(());
    }

    cx.op
        .invoke_dynamic_component(definition, args, blocks, false, false);
    Ok(())
}
