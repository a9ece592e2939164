//! `chisel-grammar` is the front end of the chisel parser generator. It reads a grammar
//! description in chisel's DSL and turns it into a [Grammar]: token declarations, skip-token
//! declarations, raw prefix/suffix code blocks, and construct rules whose right-hand sides have
//! been parsed into regex-like ASTs with all identifier references resolved.
//!
//! A note on terminology:
//!
//!   * A *token* is a terminal. It comes in three flavours: simple (a name with no generated
//!     matcher), literal (matches a byte string exactly), and functional (user-supplied match
//!     code).
//!   * A *construct* is a named production rule; its body is a [Regex].
//!   * A *skip token* is matched and discarded between regex attempts in the generated parser.
//!
//! The usual entry point is [Grammar::from_read] (or [Grammar::from_str] for in-memory
//! sources), which runs the whole front end: tokenise, parse declarations, then resolve every
//! construct body.

#![forbid(unsafe_code)]
#![deny(unreachable_pub)]

use std::{error::Error, fmt, io};

mod ast;
mod lex;
mod parser;
mod reader;
mod regex;

pub use crate::{
    ast::{Construct, Grammar, GrammarAST, TokenDecl},
    lex::DslItem,
    parser::GrammarParser,
    reader::DslReader,
    regex::Regex,
};

pub type GrammarBuildResult<T> = Result<T, GrammarBuildError>;

/// The byte range of the grammar input that a lexical item or an error refers to. The DSL is
/// byte-oriented, so no line/column bookkeeping is kept: drivers report `start` directly.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Span {
    start: usize,
    end: usize,
}

impl Span {
    /// The span covering `start..end`.
    pub(crate) fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Span { start, end }
    }

    /// A zero-width span pointing between bytes, for errors raised before anything was consumed
    /// (end of input, an expected opener that never appeared).
    pub(crate) fn at(off: usize) -> Self {
        Span {
            start: off,
            end: off,
        }
    }

    /// Byte offset the span starts at.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Byte offset one past the last byte of the span.
    pub fn end(&self) -> usize {
        self.end
    }
}

/// The pipeline phase an error was raised in. Used by drivers to prefix diagnostics.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Phase {
    Io,
    Lex,
    Grammar,
    Resolve,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Phase::Io => "I/O",
            Phase::Lex => "lexical",
            Phase::Grammar => "grammar",
            Phase::Resolve => "resolve",
        };
        write!(f, "{}", s)
    }
}

/// Any error from the grammar front end returns an instance of this struct.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct GrammarBuildError {
    pub(crate) kind: GrammarErrorKind,
    pub(crate) span: Span,
}

impl Error for GrammarBuildError {}

impl fmt::Display for GrammarBuildError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl GrammarBuildError {
    pub(crate) fn new(kind: GrammarErrorKind, span: Span) -> Self {
        GrammarBuildError { kind, span }
    }

    /// The span of the offending input.
    pub fn span(&self) -> Span {
        self.span
    }

    pub fn kind(&self) -> &GrammarErrorKind {
        &self.kind
    }

    /// Which pipeline phase raised this error.
    pub fn phase(&self) -> Phase {
        match self.kind {
            GrammarErrorKind::Io(_) => Phase::Io,
            GrammarErrorKind::UnknownSyntax
            | GrammarErrorKind::InvalidString
            | GrammarErrorKind::UnterminatedString
            | GrammarErrorKind::UnbalancedScope(_)
            | GrammarErrorKind::PrematureEnd => Phase::Lex,
            GrammarErrorKind::UnknownDeclaration
            | GrammarErrorKind::IncompleteDeclaration
            | GrammarErrorKind::MissingEquals
            | GrammarErrorKind::ExpectedScope(_)
            | GrammarErrorKind::IllegalInteger
            | GrammarErrorKind::IllegalName
            | GrammarErrorKind::IllegalTokenDecl
            | GrammarErrorKind::DuplicateToken(_)
            | GrammarErrorKind::DuplicateConstruct(_)
            | GrammarErrorKind::EmptyTerm
            | GrammarErrorKind::MismatchedParen
            | GrammarErrorKind::UnexpectedChar(_) => Phase::Grammar,
            GrammarErrorKind::UndefinedReference(_) => Phase::Resolve,
        }
    }
}

/// The various different possible grammar front end errors.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum GrammarErrorKind {
    Io(io::ErrorKind),
    UnknownSyntax,
    InvalidString,
    UnterminatedString,
    UnbalancedScope(char),
    PrematureEnd,
    UnknownDeclaration,
    IncompleteDeclaration,
    MissingEquals,
    ExpectedScope(char),
    IllegalInteger,
    IllegalName,
    IllegalTokenDecl,
    DuplicateToken(String),
    DuplicateConstruct(String),
    EmptyTerm,
    MismatchedParen,
    UnexpectedChar(char),
    UndefinedReference(String),
}

impl fmt::Display for GrammarErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            GrammarErrorKind::Io(e) => return write!(f, "{}", e),
            GrammarErrorKind::UnknownSyntax => "No syntax item found",
            GrammarErrorKind::InvalidString => "Invalid string literal",
            GrammarErrorKind::UnterminatedString => "Unterminated string literal",
            GrammarErrorKind::UnbalancedScope(c) => {
                return write!(f, "Unbalanced scope opened by '{}'", c)
            }
            GrammarErrorKind::PrematureEnd => "Input ends prematurely",
            GrammarErrorKind::UnknownDeclaration => "Unknown declaration",
            GrammarErrorKind::IncompleteDeclaration => "Declaration ends prematurely",
            GrammarErrorKind::MissingEquals => "Missing '='",
            GrammarErrorKind::ExpectedScope(c) => return write!(f, "Expected '{}'", c),
            GrammarErrorKind::IllegalInteger => "Illegal integer",
            GrammarErrorKind::IllegalName => "Illegal name",
            GrammarErrorKind::IllegalTokenDecl => "Malformed token declaration",
            GrammarErrorKind::DuplicateToken(n) => {
                return write!(f, "Token '{}' declared more than once", n)
            }
            GrammarErrorKind::DuplicateConstruct(n) => {
                return write!(f, "Construct '{}' declared more than once", n)
            }
            GrammarErrorKind::EmptyTerm => "Expected at least one factor in term",
            GrammarErrorKind::MismatchedParen => "Expected closing ')'",
            GrammarErrorKind::UnexpectedChar(c) => {
                return write!(f, "Unexpected character '{}'", c)
            }
            GrammarErrorKind::UndefinedReference(n) => {
                return write!(f, "No token or construct of name '{}'", n)
            }
        };
        write!(f, "{}", s)
    }
}
