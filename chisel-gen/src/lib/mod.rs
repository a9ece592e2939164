//! `chisel-gen` lowers a resolved [chisel_grammar::Grammar] into a single self-contained C++
//! header: a token section (matcher definitions plus the skip composite), a lexer section (the
//! precedence-ordered try-cascade), and a parser section (one entry point per construct plus the
//! family of generated regex routines implementing PEG commit/rewind semantics).
//!
//! [render] is a pure function from grammar to output text; [GenBuilder] adds the file I/O
//! around it. Generated output is deterministic: two runs over the same input produce
//! byte-identical files.

#![forbid(unsafe_code)]
#![deny(unreachable_pub)]

use std::{error::Error, fmt, io, path::{Path, PathBuf}};

use chisel_grammar::{DslReader, Grammar, GrammarBuildError, GrammarParser};

mod emit;
mod lower;
mod tokens;

pub use crate::emit::render;

pub type GenResult<T> = Result<T, GenError>;

/// Any error from the generator returns an instance of this enum: either the front end rejected
/// the grammar, or the output could not be written.
#[derive(Debug)]
pub enum GenError {
    Grammar(GrammarBuildError),
    Io(io::Error),
}

impl Error for GenError {}

impl fmt::Display for GenError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GenError::Grammar(e) => write!(f, "{} error at byte {}: {}", e.phase(), e.span().start(), e),
            GenError::Io(e) => write!(f, "{}", e),
        }
    }
}

impl From<GrammarBuildError> for GenError {
    fn from(e: GrammarBuildError) -> Self {
        GenError::Grammar(e)
    }
}

impl From<io::Error> for GenError {
    fn from(e: io::Error) -> Self {
        GenError::Io(e)
    }
}

/// A `GenBuilder` allows one to specify the criteria for generating parser source from a grammar
/// file.
pub struct GenBuilder {
    output_path: PathBuf,
}

impl GenBuilder {
    /// Create a new `GenBuilder` with the default output path `chisel.hpp`.
    pub fn new() -> Self {
        GenBuilder {
            output_path: PathBuf::from("chisel.hpp"),
        }
    }

    /// Set the output path.
    pub fn output_path<P: AsRef<Path>>(mut self, p: P) -> Self {
        self.output_path = p.as_ref().to_path_buf();
        self
    }

    /// Read and resolve the grammar file `inp`, then write the generated parser source to the
    /// output path. The output is written to a temporary file in the destination directory and
    /// renamed into place only once every section has rendered, so a failed run never leaves a
    /// partial file behind.
    pub fn process_file<P: AsRef<Path>>(&self, inp: P) -> GenResult<()> {
        let file = std::fs::File::open(inp)?;
        let ast = GrammarParser::new(DslReader::new(file)).parse()?;
        let grammar = ast.resolve()?;
        emit::write_file(&grammar, &self.output_path)
    }

    /// In-memory variant of [GenBuilder::process_file]: generate from `src`, returning the
    /// output text instead of writing a file.
    pub fn process_str(&self, src: &str) -> GenResult<String> {
        let grammar = Grammar::from_str(src)?;
        Ok(render(&grammar))
    }
}

impl Default for GenBuilder {
    fn default() -> Self {
        GenBuilder::new()
    }
}
