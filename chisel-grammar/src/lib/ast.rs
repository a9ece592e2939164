use std::collections::HashSet;
use std::io::Read;

use indexmap::IndexMap;

use crate::{
    parser::GrammarParser,
    reader::DslReader,
    regex::{Regex, RegexParser},
    GrammarBuildError, GrammarBuildResult, GrammarErrorKind, Span,
};

/// A token declaration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TokenDecl {
    /// A name that participates in the grammar namespace but has no generated matcher: it refers
    /// to an externally defined terminal.
    Simple { name: String },
    /// Matches `literal` exactly.
    Literal {
        name: String,
        literal: String,
        precedence: u32,
    },
    /// Embeds user-supplied code as the match routine. `params` and `body` keep their
    /// delimiters.
    Functional {
        name: String,
        params: String,
        body: String,
        precedence: u32,
    },
}

impl TokenDecl {
    pub fn name(&self) -> &str {
        match self {
            TokenDecl::Simple { name }
            | TokenDecl::Literal { name, .. }
            | TokenDecl::Functional { name, .. } => name,
        }
    }

    /// Simple tokens have no precedence of their own and sort as 0.
    pub fn precedence(&self) -> u32 {
        match self {
            TokenDecl::Simple { .. } => 0,
            TokenDecl::Literal { precedence, .. } | TokenDecl::Functional { precedence, .. } => {
                *precedence
            }
        }
    }

    pub fn is_simple(&self) -> bool {
        matches!(self, TokenDecl::Simple { .. })
    }
}

/// The grammar as collected in a single pass over the DSL input. Construct bodies are still raw
/// text; [GrammarAST::resolve] turns them into [Regex] ASTs.
#[derive(Debug, Default)]
pub struct GrammarAST {
    pub prefixes: Vec<String>,
    pub suffixes: Vec<String>,
    // IndexMaps so that declaration order is retained alongside name lookup.
    pub tokens: IndexMap<String, TokenDecl>,
    pub skip_tokens: IndexMap<String, TokenDecl>,
    pub constructs: IndexMap<String, (String, Span)>,
}

impl GrammarAST {
    pub fn new() -> Self {
        GrammarAST::default()
    }

    /// Token names are unique across all three variants and across the skip/non-skip lists.
    pub(crate) fn add_token(
        &mut self,
        decl: TokenDecl,
        span: Span,
        skip: bool,
    ) -> GrammarBuildResult<()> {
        let name = decl.name().to_string();
        if self.tokens.contains_key(&name) || self.skip_tokens.contains_key(&name) {
            return Err(GrammarBuildError::new(
                GrammarErrorKind::DuplicateToken(name),
                span,
            ));
        }
        if skip {
            self.skip_tokens.insert(name, decl);
        } else {
            self.tokens.insert(name, decl);
        }
        Ok(())
    }

    pub(crate) fn add_construct(
        &mut self,
        name: String,
        body: String,
        span: Span,
    ) -> GrammarBuildResult<()> {
        if self.constructs.contains_key(&name) {
            return Err(GrammarBuildError::new(
                GrammarErrorKind::DuplicateConstruct(name),
                span,
            ));
        }
        self.constructs.insert(name, (body, span));
        Ok(())
    }

    /// Look up a non-skip token. Skip tokens are deliberately not visible here: their generated
    /// matchers return no value and cannot stand as units in a construct body.
    pub fn get_token(&self, name: &str) -> Option<&TokenDecl> {
        self.tokens.get(name)
    }

    pub fn get_construct(&self, name: &str) -> Option<&(String, Span)> {
        self.constructs.get(name)
    }

    /// Resolve every construct body into a [Regex], in declaration order. Forward references are
    /// legal because all declarations have already been collected; cycles are broken by
    /// placeholder [Regex::Nested] nodes.
    pub fn resolve(self) -> GrammarBuildResult<Grammar> {
        let mut constructs = Vec::with_capacity(self.constructs.len());
        for (name, (body, span)) in &self.constructs {
            let mut stack = HashSet::new();
            let rx = RegexParser::parse(&self, body, span.start(), &mut stack)?;
            constructs.push(Construct {
                name: name.clone(),
                body: rx,
            });
        }
        Ok(Grammar {
            prefixes: self.prefixes,
            suffixes: self.suffixes,
            tokens: self.tokens.into_values().collect(),
            skip_tokens: self.skip_tokens.into_values().collect(),
            constructs,
        })
    }
}

/// A named production rule with a resolved body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Construct {
    pub name: String,
    pub body: Regex,
}

/// A fully resolved grammar, ready for lowering. Nothing in here is mutated once emission
/// begins.
#[derive(Debug)]
pub struct Grammar {
    pub prefixes: Vec<String>,
    pub suffixes: Vec<String>,
    pub tokens: Vec<TokenDecl>,
    pub skip_tokens: Vec<TokenDecl>,
    pub constructs: Vec<Construct>,
}

impl Grammar {
    /// Run the whole front end over `reader`.
    pub fn from_read<R: Read>(reader: R) -> GrammarBuildResult<Grammar> {
        GrammarParser::new(DslReader::new(reader)).parse()?.resolve()
    }

    /// Run the whole front end over an in-memory source.
    pub fn from_str(src: &str) -> GrammarBuildResult<Grammar> {
        Grammar::from_read(src.as_bytes())
    }

    pub fn get_construct(&self, name: &str) -> Option<&Construct> {
        self.constructs.iter().find(|c| c.name == name)
    }
}
