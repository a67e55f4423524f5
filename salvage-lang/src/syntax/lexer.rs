use std::path::Path;

use chumsky::input::StrInput;
use chumsky::prelude::*;

use super::error::InvalidInput;
use super::token::Token;
use crate::utils::metadata::Span;

type LexerError<'src> = chumsky::extra::Err<Rich<'src, char, SimpleSpan>>;

fn comment_parser<'src, I>() -> impl Parser<'src, I, Token, LexerError<'src>> + Clone
where
    I: StrInput<'src, Token = char, Span = SimpleSpan, Slice = &'src str>,
{
    let endline = text::newline().or(end());
    let single_line = just("//")
        .ignore_then(any().and_is(endline.not()).repeated().to_slice())
        .map(|c: &'src str| Token::Comment(c.to_string()));

    let multi_line = just("/*")
        .ignore_then(any().and_is(just("*/").not()).repeated().to_slice())
        .then_ignore(just("*/"))
        .map(|c: &'src str| Token::Comment(c.to_string()));

    single_line.or(multi_line)
}

fn quoted<'src, I>(quote: char) -> impl Parser<'src, I, &'src str, LexerError<'src>> + Clone
where
    I: StrInput<'src, Token = char, Span = SimpleSpan, Slice = &'src str>,
{
    let escape = just('\\').then(any()).ignored();
    let plain = any()
        .and_is(one_of([quote, '\\', '\n']).not())
        .ignored();
    escape
        .or(plain)
        .repeated()
        .to_slice()
        .delimited_by(just(quote), just(quote))
}

pub fn tokenizer<'src, I>() -> impl Parser<'src, I, Token, LexerError<'src>> + Clone
where
    I: StrInput<'src, Token = char, Span = SimpleSpan, Slice = &'src str>,
{
    let number = text::int::<I, LexerError<'src>>(10)
        .then(just('.').then(text::digits::<I, LexerError<'src>>(10)).or_not())
        .then(one_of("lLfFdD").or_not())
        .to_slice()
        .map(|s: &'src str| Token::Number(s.to_string()));

    let str_ = quoted('"').map(|s: &'src str| Token::Str(s.to_string()));
    let char_ = quoted('\'').map(|s: &'src str| Token::Char(s.to_string()));

    // `x->-x`: the arrow never merges with the operator after it
    let arrow = just("->").to(Token::Arrow);

    let op = one_of("+-*/!=&|%<>^~?:@")
        .repeated()
        .at_least(1)
        .to_slice()
        .map(|s: &'src str| match s {
            "=" => Token::Assign,
            "*" => Token::Star,
            _ => Token::Op(s.to_string()),
        });

    let separator = one_of(",.;").map(|c| match c {
        ',' => Token::Comma,
        '.' => Token::Dot,
        _ => Token::SemiColon,
    });

    let ident = text::ident()
        .to_slice()
        .map(|ident: &'src str| match ident {
            "import" => Token::Import,
            "static" => Token::Static,
            "package" => Token::Package,
            "return" => Token::Return,
            "if" | "else" | "while" | "for" | "do" | "try" | "catch" | "finally" | "switch"
            | "synchronized" => Token::Control(ident.to_string()),
            _ => Token::Ident(ident.to_string()),
        });

    let parens = one_of("(){}[]").map(|c| match c {
        '(' => Token::ParenBegin,
        ')' => Token::ParenEnd,
        '{' => Token::BlockBegin,
        '}' => Token::BlockEnd,
        '[' => Token::ArrayBegin,
        _ => Token::ArrayEnd,
    });

    let unknown = any().map(Token::Unknown);

    choice((
        comment_parser(),
        number,
        str_,
        char_,
        ident,
        arrow,
        op,
        separator,
        parens,
        unknown,
    ))
}

pub fn lexer<'src, I>() -> impl Parser<'src, I, Vec<(Token, SimpleSpan)>, LexerError<'src>> + Clone
where
    I: StrInput<'src, Token = char, Span = SimpleSpan, Slice = &'src str>,
{
    tokenizer()
        .map_with(|t, e| (t, e.span()))
        .padded()
        .repeated()
        .collect::<Vec<_>>()
}

/// Splits `src` into tokens with byte spans. Comments are dropped. Characters
/// that start no token come back as [`Token::Unknown`] rather than as errors,
/// so the only errors are failures of the lexer itself.
pub fn tokenize(src: &str, path: &Path) -> (Vec<(Token, Span)>, Vec<InvalidInput>) {
    let (tokens, errs) = lexer().parse(src).into_output_errors();
    let errors = errs
        .into_iter()
        .map(|e| InvalidInput::new(Some(e.to_string()), e.span().into_range(), path))
        .collect::<Vec<_>>();
    let tokens = tokens
        .unwrap_or_default()
        .into_iter()
        .filter(|(t, _)| !matches!(t, Token::Comment(_)))
        .map(|(t, span)| (t, span.into_range()))
        .collect::<Vec<_>>();
    log::trace!("{} token(s), {} lexer error(s)", tokens.len(), errors.len());
    (tokens, errors)
}
