//! The DSL tokeniser. The default reader recognises keywords, punctuation, and identifiers; the
//! grammar parser swaps in the contextual readers ([read_string], [read_scope],
//! [read_construct_body]) where a statement expects them, then falls back to [next_item].

use std::io::Read;

use crate::{
    reader::DslReader, GrammarBuildError, GrammarBuildResult, GrammarErrorKind, Span,
};

/// A single lexical item of the grammar DSL.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DslItem {
    Prefix,
    Suffix,
    Tok,
    Skip,
    OpenBrace,
    CloseBrace,
    Equals,
    Bar,
    Question,
    Star,
    Plus,
    OpenParen,
    CloseParen,
    Semi,
    Ident(String),
}

// Reserved items, longest first: a keyword must win against the identifier rule before the
// identifier scanner ever runs.
const RESERVED: &[(&str, DslItem)] = &[
    ("prefix", DslItem::Prefix),
    ("suffix", DslItem::Suffix),
    ("skip", DslItem::Skip),
    ("tok", DslItem::Tok),
    ("{", DslItem::OpenBrace),
    ("}", DslItem::CloseBrace),
    ("=", DslItem::Equals),
    ("|", DslItem::Bar),
    ("?", DslItem::Question),
    ("*", DslItem::Star),
    ("+", DslItem::Plus),
    ("(", DslItem::OpenParen),
    (")", DslItem::CloseParen),
    (";", DslItem::Semi),
];

pub(crate) fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

pub(crate) fn is_ident_continue(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

/// Read the next default-mode item, or `None` at end of input.
pub(crate) fn next_item<R: Read>(
    r: &mut DslReader<R>,
) -> GrammarBuildResult<Option<(DslItem, Span)>> {
    r.skip_ws()?;
    let start = r.offset();
    for (text, item) in RESERVED {
        if r.peek(text.len())? == text.as_bytes() {
            r.discard(text.len());
            return Ok(Some((item.clone(), Span::new(start, r.offset()))));
        }
    }
    match r.peek_byte()? {
        None => Ok(None),
        Some(c) if is_ident_start(c) => {
            let (name, span) = read_ident(r)?;
            Ok(Some((DslItem::Ident(name), span)))
        }
        Some(_) => Err(GrammarBuildError::new(
            GrammarErrorKind::UnknownSyntax,
            Span::new(start, start + 1),
        )),
    }
}

/// Read an identifier. Fails with `IllegalName` if the next byte cannot start one.
pub(crate) fn read_ident<R: Read>(r: &mut DslReader<R>) -> GrammarBuildResult<(String, Span)> {
    r.skip_ws()?;
    let start = r.offset();
    match r.peek_byte()? {
        Some(c) if is_ident_start(c) => (),
        _ => {
            return Err(GrammarBuildError::new(
                GrammarErrorKind::IllegalName,
                Span::at(start),
            ))
        }
    }
    let mut name = Vec::new();
    while let Some(c) = r.read_byte()? {
        if is_ident_continue(c) {
            name.push(c);
        } else {
            r.unread();
            break;
        }
    }
    let span = Span::new(start, r.offset());
    Ok((String::from_utf8(name).unwrap(), span))
}

/// Read a quoted string literal. The surrounding quotes are not part of the result; a `\`
/// consumes the next byte verbatim into the lexeme.
pub(crate) fn read_string<R: Read>(r: &mut DslReader<R>) -> GrammarBuildResult<(String, Span)> {
    r.skip_ws()?;
    let start = r.offset();
    let quote = match r.peek_byte()? {
        Some(c @ (b'"' | b'\'')) => {
            r.discard(1);
            c
        }
        _ => {
            return Err(GrammarBuildError::new(
                GrammarErrorKind::InvalidString,
                Span::at(start),
            ))
        }
    };
    let mut out = Vec::new();
    loop {
        match r.read_byte()? {
            None => {
                return Err(GrammarBuildError::new(
                    GrammarErrorKind::UnterminatedString,
                    Span::new(start, r.offset()),
                ))
            }
            Some(b'\\') => match r.read_byte()? {
                Some(c) => out.push(c),
                None => {
                    return Err(GrammarBuildError::new(
                        GrammarErrorKind::UnterminatedString,
                        Span::new(start, r.offset()),
                    ))
                }
            },
            Some(c) if c == quote => {
                let span = Span::new(start, r.offset());
                return Ok((String::from_utf8_lossy(&out).into_owned(), span));
            }
            Some(c) => out.push(c),
        }
    }
}

/// Read a run of bytes balanced by `opener`/`closer`. The returned text includes the delimiters.
pub(crate) fn read_scope<R: Read>(
    r: &mut DslReader<R>,
    opener: u8,
    closer: u8,
) -> GrammarBuildResult<(String, Span)> {
    r.skip_ws()?;
    let start = r.offset();
    match r.peek_byte()? {
        Some(c) if c == opener => r.discard(1),
        _ => {
            return Err(GrammarBuildError::new(
                GrammarErrorKind::ExpectedScope(opener as char),
                Span::at(start),
            ))
        }
    }
    let mut out = vec![opener];
    let mut depth = 1usize;
    while depth != 0 {
        match r.read_byte()? {
            None => {
                return Err(GrammarBuildError::new(
                    GrammarErrorKind::UnbalancedScope(opener as char),
                    Span::new(start, r.offset()),
                ))
            }
            Some(c) => {
                if c == opener {
                    depth += 1;
                } else if c == closer {
                    depth -= 1;
                }
                out.push(c);
            }
        }
    }
    let span = Span::new(start, r.offset());
    Ok((String::from_utf8_lossy(&out).into_owned(), span))
}

/// Read a construct body: raw bytes up to an unescaped `;`, which is consumed but not included.
/// A `\` consumes the next byte verbatim, so bodies can contain literal semicolons.
pub(crate) fn read_construct_body<R: Read>(
    r: &mut DslReader<R>,
) -> GrammarBuildResult<(String, Span)> {
    r.skip_ws()?;
    let start = r.offset();
    let mut out = Vec::new();
    loop {
        match r.read_byte()? {
            None => {
                return Err(GrammarBuildError::new(
                    GrammarErrorKind::PrematureEnd,
                    Span::new(start, r.offset()),
                ))
            }
            Some(b'\\') => match r.read_byte()? {
                Some(c) => out.push(c),
                None => {
                    return Err(GrammarBuildError::new(
                        GrammarErrorKind::PrematureEnd,
                        Span::new(start, r.offset()),
                    ))
                }
            },
            Some(b';') => {
                let span = Span::new(start, r.offset() - 1);
                return Ok((String::from_utf8_lossy(&out).into_owned(), span));
            }
            Some(c) => out.push(c),
        }
    }
}
