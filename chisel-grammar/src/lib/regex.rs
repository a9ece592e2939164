//! The expression parser and reference resolver. A construct body is a regex-like expression
//! over token and construct names:
//!
//! ```text
//! expression := term ('|' term)*
//! term       := factor+
//! factor     := atom ('*' | '+' | '?')?
//! atom       := '(' expression ')' | IDENT
//! ```
//!
//! Atoms are resolved against the collected declarations as they are parsed: tokens win over
//! constructs, and construct references are expanded recursively with a path set that breaks
//! cycles by inserting placeholder [Regex::Nested] nodes.

use std::collections::HashSet;
use std::fmt;

use lazy_static::lazy_static;

use crate::{
    ast::{GrammarAST, TokenDecl},
    GrammarBuildError, GrammarBuildResult, GrammarErrorKind, Span,
};

/// The tree form of a construct's right-hand side.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Regex {
    /// A terminal: one token match.
    Unit { token: TokenDecl },
    /// A reference to another construct. `body` is `None` when this node is a back-reference
    /// inserted to break a cycle.
    Nested {
        name: String,
        body: Option<Box<Regex>>,
    },
    /// Concatenation. At least two children; flat (a Chain never directly contains a Chain).
    Chain { children: Vec<Regex> },
    /// Prioritised alternation. At least two children, tried in source order; flat like Chain.
    Or { children: Vec<Regex> },
    /// `*` (`require_one` false) or `+` (`require_one` true). Greedy.
    Multiplier { require_one: bool, inner: Box<Regex> },
    /// `?`.
    Optional { inner: Box<Regex> },
    /// An explicit `( … )` group. Semantically transparent: lowering and matching delegate to
    /// `inner`; the node only preserves the grouping in the tree shape.
    Captured { inner: Box<Regex> },
}

impl Regex {
    fn needs_group(&self) -> bool {
        matches!(self, Regex::Chain { .. } | Regex::Or { .. })
    }
}

/// Prints the DSL form of the expression. Parsing the result again (against the same
/// declarations) rebuilds an equal tree.
impl fmt::Display for Regex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Regex::Unit { token } => write!(f, "{}", token.name()),
            Regex::Nested { name, .. } => write!(f, "{}", name),
            Regex::Chain { children } => {
                for (i, c) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    if c.needs_group() {
                        write!(f, "({})", c)?;
                    } else {
                        write!(f, "{}", c)?;
                    }
                }
                Ok(())
            }
            Regex::Or { children } => {
                for (i, c) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{}", c)?;
                }
                Ok(())
            }
            Regex::Multiplier { require_one, inner } => {
                let op = if *require_one { '+' } else { '*' };
                if inner.needs_group() {
                    write!(f, "({}){}", inner, op)
                } else {
                    write!(f, "{}{}", inner, op)
                }
            }
            Regex::Optional { inner } => {
                if inner.needs_group() {
                    write!(f, "({})?", inner)
                } else {
                    write!(f, "{}?", inner)
                }
            }
            Regex::Captured { inner } => write!(f, "({})", inner),
        }
    }
}

lazy_static! {
    static ref RE_NAME: regex::Regex = regex::Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*").unwrap();
}

/// Parses one construct body. `base` is the offset of the body within the overall input so that
/// error spans point into the user's file, not into the stored body text.
pub(crate) struct RegexParser<'a> {
    src: &'a str,
    base: usize,
    ast: &'a GrammarAST,
    stack: &'a mut HashSet<String>,
}

impl<'a> RegexParser<'a> {
    pub(crate) fn parse(
        ast: &GrammarAST,
        src: &str,
        base: usize,
        stack: &mut HashSet<String>,
    ) -> GrammarBuildResult<Regex> {
        let mut p = RegexParser {
            src,
            base,
            ast,
            stack,
        };
        let (i, rx) = p.parse_expression(0)?;
        let i = p.parse_ws(i);
        if i != p.src.len() {
            // A leftover byte here can only be a ')' with no matching opener.
            return Err(p.mk_error(GrammarErrorKind::MismatchedParen, i));
        }
        Ok(rx)
    }

    fn mk_error(&self, kind: GrammarErrorKind, off: usize) -> GrammarBuildError {
        GrammarBuildError::new(kind, Span::at(self.base + off))
    }

    fn parse_ws(&self, mut i: usize) -> usize {
        while i < self.src.len() && self.src.as_bytes()[i].is_ascii_whitespace() {
            i += 1;
        }
        i
    }

    fn lookahead_is(&self, s: &'static str, i: usize) -> Option<usize> {
        if self.src[i..].starts_with(s) {
            Some(i + s.len())
        } else {
            None
        }
    }

    fn parse_expression(&mut self, i: usize) -> GrammarBuildResult<(usize, Regex)> {
        let (mut i, first) = self.parse_term(i)?;
        let mut alternatives = vec![first];
        loop {
            i = self.parse_ws(i);
            match self.lookahead_is("|", i) {
                Some(j) => {
                    let (k, alt) = self.parse_term(j)?;
                    alternatives.push(alt);
                    i = k;
                }
                None => break,
            }
        }
        if alternatives.len() == 1 {
            Ok((i, alternatives.pop().unwrap()))
        } else {
            Ok((
                i,
                Regex::Or {
                    children: alternatives,
                },
            ))
        }
    }

    fn parse_term(&mut self, mut i: usize) -> GrammarBuildResult<(usize, Regex)> {
        let mut factors = Vec::new();
        loop {
            i = self.parse_ws(i);
            if i == self.src.len() {
                break;
            }
            match self.src.as_bytes()[i] {
                b')' | b'|' | b';' => break,
                _ => {
                    let (j, factor) = self.parse_factor(i)?;
                    factors.push(factor);
                    i = j;
                }
            }
        }
        if factors.is_empty() {
            return Err(self.mk_error(GrammarErrorKind::EmptyTerm, i));
        }
        if factors.len() == 1 {
            Ok((i, factors.pop().unwrap()))
        } else {
            Ok((i, Regex::Chain { children: factors }))
        }
    }

    fn parse_factor(&mut self, i: usize) -> GrammarBuildResult<(usize, Regex)> {
        let (i, atom) = self.parse_atom(i)?;
        let j = self.parse_ws(i);
        if j < self.src.len() {
            match self.src.as_bytes()[j] {
                b'*' => {
                    return Ok((
                        j + 1,
                        Regex::Multiplier {
                            require_one: false,
                            inner: Box::new(atom),
                        },
                    ))
                }
                b'+' => {
                    return Ok((
                        j + 1,
                        Regex::Multiplier {
                            require_one: true,
                            inner: Box::new(atom),
                        },
                    ))
                }
                b'?' => {
                    return Ok((
                        j + 1,
                        Regex::Optional {
                            inner: Box::new(atom),
                        },
                    ))
                }
                _ => (),
            }
        }
        Ok((i, atom))
    }

    fn parse_atom(&mut self, i: usize) -> GrammarBuildResult<(usize, Regex)> {
        let i = self.parse_ws(i);
        if i == self.src.len() {
            return Err(self.mk_error(GrammarErrorKind::EmptyTerm, i));
        }
        if let Some(j) = self.lookahead_is("(", i) {
            let (j, inner) = self.parse_expression(j)?;
            let j = self.parse_ws(j);
            return match self.lookahead_is(")", j) {
                Some(k) => Ok((
                    k,
                    Regex::Captured {
                        inner: Box::new(inner),
                    },
                )),
                None => Err(self.mk_error(GrammarErrorKind::MismatchedParen, j)),
            };
        }
        match RE_NAME.find(&self.src[i..]) {
            Some(m) => {
                debug_assert_eq!(m.start(), 0);
                let name = &self.src[i..i + m.end()];
                let rx = self.resolve_name(name, i)?;
                Ok((i + m.end(), rx))
            }
            None => Err(self.mk_error(
                GrammarErrorKind::UnexpectedChar(self.src[i..].chars().next().unwrap()),
                i,
            )),
        }
    }

    /// Identifier lookup: tokens first, then constructs. A construct already on the expansion
    /// stack becomes a placeholder back-reference instead of expanding again.
    fn resolve_name(&mut self, name: &str, off: usize) -> GrammarBuildResult<Regex> {
        if let Some(token) = self.ast.get_token(name) {
            return Ok(Regex::Unit {
                token: token.clone(),
            });
        }
        if let Some((body, bspan)) = self.ast.get_construct(name) {
            if self.stack.contains(name) {
                return Ok(Regex::Nested {
                    name: name.to_string(),
                    body: None,
                });
            }
            self.stack.insert(name.to_string());
            let resolved = RegexParser::parse(self.ast, body, bspan.start(), self.stack);
            self.stack.remove(name);
            return Ok(Regex::Nested {
                name: name.to_string(),
                body: Some(Box::new(resolved?)),
            });
        }
        Err(self.mk_error(GrammarErrorKind::UndefinedReference(name.to_string()), off))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn ast_with(tokens: &[&str], constructs: &[(&str, &str)]) -> GrammarAST {
        let mut ast = GrammarAST::new();
        for (i, t) in tokens.iter().enumerate() {
            ast.add_token(
                TokenDecl::Literal {
                    name: t.to_string(),
                    literal: t.to_lowercase(),
                    precedence: 0,
                },
                Span::new(i, i),
                false,
            )
            .unwrap();
        }
        for (i, (n, b)) in constructs.iter().enumerate() {
            ast.add_construct(n.to_string(), b.to_string(), Span::new(i, i))
                .unwrap();
        }
        ast
    }

    fn parse(ast: &GrammarAST, src: &str) -> GrammarBuildResult<Regex> {
        let mut stack = HashSet::new();
        RegexParser::parse(ast, src, 0, &mut stack)
    }

    fn unit(name: &str) -> Regex {
        Regex::Unit {
            token: TokenDecl::Literal {
                name: name.to_string(),
                literal: name.to_lowercase(),
                precedence: 0,
            },
        }
    }

    #[test]
    fn test_single_atom_collapses() {
        let ast = ast_with(&["A"], &[]);
        assert_eq!(parse(&ast, "A").unwrap(), unit("A"));
    }

    #[test]
    fn test_chain_and_or_flat() {
        let ast = ast_with(&["A", "B", "C"], &[]);
        assert_eq!(
            parse(&ast, "A B C").unwrap(),
            Regex::Chain {
                children: vec![unit("A"), unit("B"), unit("C")]
            }
        );
        assert_eq!(
            parse(&ast, "A | B | C").unwrap(),
            Regex::Or {
                children: vec![unit("A"), unit("B"), unit("C")]
            }
        );
    }

    #[test]
    fn test_precedence_of_operators() {
        // Postfix binds tighter than concatenation, which binds tighter than alternation.
        let ast = ast_with(&["A", "B", "C"], &[]);
        assert_eq!(
            parse(&ast, "A B* | C").unwrap(),
            Regex::Or {
                children: vec![
                    Regex::Chain {
                        children: vec![
                            unit("A"),
                            Regex::Multiplier {
                                require_one: false,
                                inner: Box::new(unit("B"))
                            }
                        ]
                    },
                    unit("C"),
                ]
            }
        );
    }

    #[test]
    fn test_group_is_captured() {
        let ast = ast_with(&["A", "B"], &[]);
        assert_eq!(
            parse(&ast, "(A | B)+").unwrap(),
            Regex::Multiplier {
                require_one: true,
                inner: Box::new(Regex::Captured {
                    inner: Box::new(Regex::Or {
                        children: vec![unit("A"), unit("B")]
                    })
                })
            }
        );
    }

    #[test]
    fn test_quantifier_idempotence() {
        // No special rule: `(D?)?` and `(D*)*` are ordinary nestings.
        let ast = ast_with(&["D"], &[]);
        assert_eq!(
            parse(&ast, "(D?)?").unwrap(),
            Regex::Optional {
                inner: Box::new(Regex::Captured {
                    inner: Box::new(Regex::Optional {
                        inner: Box::new(unit("D"))
                    })
                })
            }
        );
        assert!(matches!(
            parse(&ast, "(D*)*").unwrap(),
            Regex::Multiplier {
                require_one: false,
                ..
            }
        ));
    }

    #[test]
    fn test_empty_term() {
        let ast = ast_with(&["A"], &[]);
        let e = parse(&ast, "A | ").unwrap_err();
        assert_eq!(e.kind(), &GrammarErrorKind::EmptyTerm);
        let e = parse(&ast, "()").unwrap_err();
        assert_eq!(e.kind(), &GrammarErrorKind::EmptyTerm);
    }

    #[test]
    fn test_mismatched_paren() {
        let ast = ast_with(&["A"], &[]);
        let e = parse(&ast, "(A").unwrap_err();
        assert_eq!(e.kind(), &GrammarErrorKind::MismatchedParen);
        let e = parse(&ast, "A)").unwrap_err();
        assert_eq!(e.kind(), &GrammarErrorKind::MismatchedParen);
    }

    #[test]
    fn test_undefined_reference() {
        let ast = ast_with(&["A"], &[]);
        let e = parse(&ast, "A Nope").unwrap_err();
        assert_eq!(
            e.kind(),
            &GrammarErrorKind::UndefinedReference("Nope".to_string())
        );
    }

    #[test]
    fn test_token_wins_over_construct() {
        let mut ast = ast_with(&["X"], &[("X", "X")]);
        ast.add_construct("r".to_string(), "X".to_string(), Span::new(9, 9))
            .unwrap();
        assert_eq!(parse(&ast, "X").unwrap(), unit("X"));
    }

    #[test]
    fn test_nested_expansion() {
        let ast = ast_with(&["A"], &[("inner", "A A")]);
        let rx = parse(&ast, "inner").unwrap();
        match rx {
            Regex::Nested { name, body } => {
                assert_eq!(name, "inner");
                assert_eq!(
                    *body.unwrap(),
                    Regex::Chain {
                        children: vec![unit("A"), unit("A")]
                    }
                );
            }
            _ => panic!("expected Nested"),
        }
    }

    #[test]
    fn test_cycle_breaks_with_placeholder() {
        let ast = ast_with(&["B"], &[("A", "B | A")]);
        let rx = parse(&ast, "B | A").unwrap();
        // The A reference expands once; the A inside that expansion is a placeholder.
        fn find_placeholder(rx: &Regex, name: &str) -> bool {
            match rx {
                Regex::Nested { name: n, body: None } => n == name,
                Regex::Nested {
                    body: Some(inner), ..
                } => find_placeholder(inner, name),
                Regex::Chain { children } | Regex::Or { children } => {
                    children.iter().any(|c| find_placeholder(c, name))
                }
                Regex::Multiplier { inner, .. }
                | Regex::Optional { inner }
                | Regex::Captured { inner } => find_placeholder(inner, name),
                Regex::Unit { .. } => false,
            }
        }
        assert!(find_placeholder(&rx, "A"));
    }

    #[test]
    fn test_mutual_recursion() {
        let ast = ast_with(&["T"], &[("a", "T b | T"), ("b", "T a | T")]);
        // Both directions of the cycle must terminate.
        parse(&ast, "T b | T").unwrap();
        parse(&ast, "T a | T").unwrap();
    }

    #[test]
    fn test_display_round_trip() {
        let ast = ast_with(&["A", "B", "C"], &[("sub", "A B")]);
        for src in &[
            "A",
            "A B C",
            "A | B | C",
            "A B* | C+ sub?",
            "(A | B) C",
            "((A))",
            "(A B)+ (B | C)?",
            "sub | A",
        ] {
            let rx = parse(&ast, src).unwrap();
            let printed = rx.to_string();
            let reparsed = parse(&ast, &printed).unwrap();
            assert_eq!(rx, reparsed, "round-trip failed for {:?} -> {:?}", src, printed);
        }
    }
}
