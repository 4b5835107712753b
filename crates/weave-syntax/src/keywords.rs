//! Reserved construct names.
//!
//! A bare, unbound head whose name appears in the list for its position is a
//! keyword rather than a free variable. Each position has its own list, so
//! `{{#each}}` is a keyword while `{{each}}` is an ordinary append.

/// Built-in constructs the normalizer recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Yield,
    Debugger,
    HasBlock,
    HasBlockParams,
    If,
    Unless,
    Each,
    With,
    Let,
    InElement,
    WithDynamicVars,
    GetDynamicVar,
    Log,
    Component,
    Helper,
    Modifier,
}

/// Where a keyword may appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordPosition {
    /// `{{keyword ...}}`
    Append,
    /// `{{#keyword ...}}...{{/keyword}}`
    Block,
    /// `(keyword ...)` and attribute values.
    Call,
}

const APPEND: &[Keyword] = &[
    Keyword::Yield,
    Keyword::Debugger,
    Keyword::HasBlock,
    Keyword::HasBlockParams,
    Keyword::If,
    Keyword::Unless,
    Keyword::GetDynamicVar,
    Keyword::Log,
    Keyword::Component,
    Keyword::Helper,
    Keyword::Modifier,
];

const BLOCK: &[Keyword] = &[
    Keyword::If,
    Keyword::Unless,
    Keyword::Each,
    Keyword::With,
    Keyword::Let,
    Keyword::InElement,
    Keyword::WithDynamicVars,
    Keyword::Component,
];

const CALL: &[Keyword] = &[
    Keyword::HasBlock,
    Keyword::HasBlockParams,
    Keyword::If,
    Keyword::Unless,
    Keyword::GetDynamicVar,
    Keyword::Log,
    Keyword::Component,
    Keyword::Helper,
    Keyword::Modifier,
];

impl Keyword {
    pub fn name(&self) -> &'static str {
        match self {
            Keyword::Yield => "yield",
            Keyword::Debugger => "debugger",
            Keyword::HasBlock => "has-block",
            Keyword::HasBlockParams => "has-block-params",
            Keyword::If => "if",
            Keyword::Unless => "unless",
            Keyword::Each => "each",
            Keyword::With => "with",
            Keyword::Let => "let",
            Keyword::InElement => "in-element",
            Keyword::WithDynamicVars => "-with-dynamic-vars",
            Keyword::GetDynamicVar => "-get-dynamic-var",
            Keyword::Log => "log",
            Keyword::Component => "component",
            Keyword::Helper => "helper",
            Keyword::Modifier => "modifier",
        }
    }

    /// Look up `name` among the keywords legal in `position`.
    pub fn lookup(position: KeywordPosition, name: &str) -> Option<Keyword> {
        let table = match position {
            KeywordPosition::Append => APPEND,
            KeywordPosition::Block => BLOCK,
            KeywordPosition::Call => CALL,
        };
        table.iter().copied().find(|keyword| keyword.name() == name)
    }
}
