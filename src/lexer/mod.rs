use logos::Logos;
use thiserror::Error;

/// Tokens for the job file format.
/// Whitespace and line breaks are insignificant; keywords delimit statements.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r";[^\n]*")]
pub enum Token {
    // Literals
    #[regex(r"-?[0-9]+(\.[0-9]+)?", |lex| lex.slice().parse::<f64>().ok(), priority = 10)]
    Number(f64),

    #[regex(r#""[^"]*""#, |lex| lex.slice()[1..lex.slice().len() - 1].to_string())]
    String(String),

    /// Identifiers: feature names, modes, material and work center ids
    #[regex(r"[A-Za-z0-9_][A-Za-z0-9_.\-]*", |lex| lex.slice().to_string())]
    Word(String),

    // Keywords - Part
    #[token("part")]
    Part,

    #[token("material")]
    Material,

    #[token("category")]
    Category,

    #[token("quantity")]
    Quantity,

    // Keywords - Stock
    #[token("stock")]
    Stock,

    #[token("bar")]
    Bar,

    #[token("tube")]
    Tube,

    #[token("billet")]
    #[token("plate")]
    Billet,

    #[token("bore")]
    Bore,

    #[token("height")]
    Height,

    // Keywords - Operations
    #[token("op")]
    Op,

    #[token("on")]
    On,

    #[token("mode")]
    Mode,

    #[token("setup")]
    Setup,

    #[token("time")]
    Time,

    #[token("coop")]
    Coop,

    #[token("unit")]
    Unit,

    #[token("min")]
    Min,

    // Keywords - Geometry
    #[token("from")]
    From,

    #[token("to")]
    To,

    #[token("dia")]
    #[token("diameter")]
    Diameter,

    #[token("length")]
    Length,

    #[token("depth")]
    Depth,

    #[token("width")]
    Width,

    #[token("size")]
    Size,

    #[token("corner")]
    Corner,

    #[token("pitch")]
    Pitch,

    #[token("count")]
    Count,

    // Keywords - Cutting values
    #[token("speed")]
    Speed,

    #[token("feed")]
    Feed,

    #[token("doc")]
    Doc,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Number(n) => write!(f, "number {}", n),
            Token::String(s) => write!(f, "\"{}\"", s),
            Token::Word(w) => write!(f, "'{}'", w),
            other => write!(f, "'{}'", format!("{:?}", other).to_lowercase()),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("unrecognized input at {span:?}")]
pub struct LexError {
    pub span: logos::Span,
}

/// Lex the input string into tokens
pub fn lex(input: &str) -> Result<Vec<(Token, logos::Span)>, LexError> {
    Token::lexer(input)
        .spanned()
        .map(|(result, span)| match result {
            Ok(token) => Ok((token, span)),
            Err(()) => Err(LexError { span }),
        })
        .collect()
}
