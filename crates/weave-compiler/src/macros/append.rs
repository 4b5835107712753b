//! Append macros.

use weave_syntax::v2::{AppendContent, ExpressionNode};

use crate::compile::{InvocationBlocks, Result, StatementCompiler};

use super::blocks::{invoke_definition, split_definition};

/// `{{component definition ...}}`, a block-less component invocation.
pub(super) fn component_append(cx: &mut StatementCompiler<'_>, node: &AppendContent) -> Result<()> {
    let ExpressionNode::Call(call) = &node.value else {
        unreachable!("append macros are only dispatched for calls");
    };
    let (definition, args) = split_definition(&call.args, node.span)?;
    invoke_definition(cx, definition, &args, &InvocationBlocks::default())
}
