use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Token {
    /// Identifiers, including the restricted words of module declarations
    /// (`module`, `requires`, `exports`, ...).
    Ident(String),
    Number(String),
    Str(String),
    Char(String),

    Import,
    Static,
    Package,
    Return,
    /// `if`, `while`, `for` and the other keywords that head a statement with
    /// a body.
    Control(String),

    Op(String),
    Assign,
    Arrow, // ->
    Star,
    Dot,
    Comma,
    SemiColon,

    ParenBegin,
    ParenEnd,
    ArrayBegin,
    ArrayEnd,
    BlockBegin,
    BlockEnd,

    Comment(String),
    /// A character no token starts with.
    Unknown(char),
}

impl Token {
    pub fn is_ident(&self, word: &str) -> bool {
        matches!(self, Token::Ident(s) if s == word)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::Ident(x) | Token::Number(x) | Token::Control(x) | Token::Op(x) => {
                write!(f, "{x}")
            }
            Token::Str(x) => write!(f, "\"{x}\""),
            Token::Char(x) => write!(f, "'{x}'"),
            Token::Import => write!(f, "import"),
            Token::Static => write!(f, "static"),
            Token::Package => write!(f, "package"),
            Token::Return => write!(f, "return"),
            Token::Assign => write!(f, "="),
            Token::Arrow => write!(f, "->"),
            Token::Star => write!(f, "*"),
            Token::Dot => write!(f, "."),
            Token::Comma => write!(f, ","),
            Token::SemiColon => write!(f, ";"),
            Token::ParenBegin => write!(f, "("),
            Token::ParenEnd => write!(f, ")"),
            Token::ArrayBegin => write!(f, "["),
            Token::ArrayEnd => write!(f, "]"),
            Token::BlockBegin => write!(f, "{{"),
            Token::BlockEnd => write!(f, "}}"),
            Token::Comment(_) => write!(f, "comment"),
            Token::Unknown(c) => write!(f, "{c}"),
        }
    }
}
