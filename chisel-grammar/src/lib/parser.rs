//! The top-level statement parser. Loops over DSL items and dispatches on the leading item:
//! `prefix`/`suffix` blocks, `tok`/`skip` declarations, and `Name = <body> ;` construct rules.
//! Contextual readers from [crate::lex] are swapped in wherever a statement expects a scope, a
//! string, or a raw construct body; the default item reader is restored afterwards.

use std::io::Read;

use crate::{
    ast::{GrammarAST, TokenDecl},
    lex::{self, DslItem},
    reader::DslReader,
    GrammarBuildError, GrammarBuildResult, GrammarErrorKind, Span,
};

pub struct GrammarParser<R: Read> {
    reader: DslReader<R>,
}

/// The outer `{ … }` / `( … )` of a scope, stripped.
fn scope_inner(s: &str) -> String {
    s[1..s.len() - 1].to_string()
}

impl<R: Read> GrammarParser<R> {
    pub fn new(reader: DslReader<R>) -> Self {
        GrammarParser { reader }
    }

    /// Parse the whole input into a [GrammarAST]. Statement separators (`;`) between
    /// declarations are consumed silently.
    pub fn parse(mut self) -> GrammarBuildResult<GrammarAST> {
        let mut ast = GrammarAST::new();
        while let Some((item, span)) = lex::next_item(&mut self.reader)? {
            match item {
                DslItem::Semi => (),
                DslItem::Prefix => {
                    let (text, _) = lex::read_scope(&mut self.reader, b'{', b'}')?;
                    ast.prefixes.push(scope_inner(&text));
                }
                DslItem::Suffix => {
                    let (text, _) = lex::read_scope(&mut self.reader, b'{', b'}')?;
                    ast.suffixes.push(scope_inner(&text));
                }
                DslItem::Tok => self.parse_token_decls(&mut ast, false)?,
                DslItem::Skip => self.parse_token_decls(&mut ast, true)?,
                DslItem::Ident(name) => {
                    match lex::next_item(&mut self.reader)? {
                        Some((DslItem::Equals, _)) => (),
                        Some((_, espan)) => {
                            return Err(GrammarBuildError::new(
                                GrammarErrorKind::MissingEquals,
                                espan,
                            ))
                        }
                        None => {
                            return Err(GrammarBuildError::new(
                                GrammarErrorKind::IncompleteDeclaration,
                                Span::at(self.reader.offset()),
                            ))
                        }
                    }
                    let (body, bspan) = lex::read_construct_body(&mut self.reader)?;
                    ast.add_construct(name, body, Span::new(span.start(), bspan.end()))?;
                }
                _ => {
                    return Err(GrammarBuildError::new(
                        GrammarErrorKind::UnknownDeclaration,
                        span,
                    ))
                }
            }
        }
        Ok(ast)
    }

    /// Parse the payload of a `tok`/`skip` directive: a single declaration, or a parenthesised
    /// group terminated by `)` (which is consumed; a trailing `;` is the outer loop's business).
    fn parse_token_decls(&mut self, ast: &mut GrammarAST, skip: bool) -> GrammarBuildResult<()> {
        self.reader.skip_ws()?;
        match self.reader.peek_byte()? {
            Some(b'(') => {
                self.reader.discard(1);
                loop {
                    self.reader.skip_ws()?;
                    match self.reader.peek_byte()? {
                        Some(b')') => {
                            self.reader.discard(1);
                            break;
                        }
                        Some(b';') => {
                            self.reader.discard(1);
                        }
                        Some(_) => {
                            let (decl, span) = self.parse_token_decl()?;
                            ast.add_token(decl, span, skip)?;
                        }
                        None => {
                            return Err(GrammarBuildError::new(
                                GrammarErrorKind::IncompleteDeclaration,
                                Span::at(self.reader.offset()),
                            ))
                        }
                    }
                }
                Ok(())
            }
            Some(_) => {
                let (decl, span) = self.parse_token_decl()?;
                ast.add_token(decl, span, skip)
            }
            None => Err(GrammarBuildError::new(
                GrammarErrorKind::IncompleteDeclaration,
                Span::at(self.reader.offset()),
            )),
        }
    }

    /// A single declaration: `precedence? name (= value)?`. No `=` means a Simple token; a
    /// string value means a Literal; a `( … ) { … }` value means a Functional.
    fn parse_token_decl(&mut self) -> GrammarBuildResult<(TokenDecl, Span)> {
        self.reader.skip_ws()?;
        let start = self.reader.offset();
        let precedence = self.parse_precedence()?;
        let (name, _) = lex::read_ident(&mut self.reader)?;
        self.reader.skip_ws()?;
        match self.reader.peek_byte()? {
            Some(b'=') => {
                self.reader.discard(1);
                self.reader.skip_ws()?;
                match self.reader.peek_byte()? {
                    Some(b'"' | b'\'') => {
                        let (literal, lspan) = lex::read_string(&mut self.reader)?;
                        Ok((
                            TokenDecl::Literal {
                                name,
                                literal,
                                precedence,
                            },
                            Span::new(start, lspan.end()),
                        ))
                    }
                    Some(b'(') => {
                        let (params, _) = lex::read_scope(&mut self.reader, b'(', b')')?;
                        let (body, bspan) = lex::read_scope(&mut self.reader, b'{', b'}')?;
                        Ok((
                            TokenDecl::Functional {
                                name,
                                params,
                                body,
                                precedence,
                            },
                            Span::new(start, bspan.end()),
                        ))
                    }
                    _ => Err(GrammarBuildError::new(
                        GrammarErrorKind::IllegalTokenDecl,
                        Span::at(self.reader.offset()),
                    )),
                }
            }
            _ => Ok((
                TokenDecl::Simple { name },
                Span::new(start, self.reader.offset()),
            )),
        }
    }

    /// An optional leading decimal literal; defaults to 0.
    fn parse_precedence(&mut self) -> GrammarBuildResult<u32> {
        let start = self.reader.offset();
        let mut digits = Vec::new();
        while let Some(c) = self.reader.peek_byte()? {
            if c.is_ascii_digit() {
                self.reader.discard(1);
                digits.push(c);
            } else {
                break;
            }
        }
        if digits.is_empty() {
            return Ok(0);
        }
        String::from_utf8(digits).unwrap().parse::<u32>().map_err(|_| {
            GrammarBuildError::new(
                GrammarErrorKind::IllegalInteger,
                Span::new(start, self.reader.offset()),
            )
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse(src: &str) -> GrammarBuildResult<GrammarAST> {
        GrammarParser::new(DslReader::new(src.as_bytes())).parse()
    }

    #[test]
    fn test_prefix_suffix() {
        let ast = parse("prefix { #include <x> } suffix { /*end*/ }").unwrap();
        assert_eq!(ast.prefixes, vec![" #include <x> ".to_string()]);
        assert_eq!(ast.suffixes, vec![" /*end*/ ".to_string()]);
    }

    #[test]
    fn test_simple_token() {
        let ast = parse("tok EXTERNAL;").unwrap();
        assert_eq!(
            ast.tokens.get("EXTERNAL"),
            Some(&TokenDecl::Simple {
                name: "EXTERNAL".to_string()
            })
        );
    }

    #[test]
    fn test_literal_token() {
        let ast = parse("tok HELLO = \"hi\";").unwrap();
        assert_eq!(
            ast.tokens.get("HELLO"),
            Some(&TokenDecl::Literal {
                name: "HELLO".to_string(),
                literal: "hi".to_string(),
                precedence: 0,
            })
        );
    }

    #[test]
    fn test_literal_token_with_precedence() {
        let ast = parse("tok 3 KW = 'if';").unwrap();
        assert_eq!(
            ast.tokens.get("KW"),
            Some(&TokenDecl::Literal {
                name: "KW".to_string(),
                literal: "if".to_string(),
                precedence: 3,
            })
        );
    }

    #[test]
    fn test_functional_token() {
        let ast = parse("tok NUM = (std::istream &reader) { return lex_num(reader); };").unwrap();
        assert_eq!(
            ast.tokens.get("NUM"),
            Some(&TokenDecl::Functional {
                name: "NUM".to_string(),
                params: "(std::istream &reader)".to_string(),
                body: "{ return lex_num(reader); }".to_string(),
                precedence: 0,
            })
        );
    }

    #[test]
    fn test_token_group() {
        let ast = parse("tok (A = \"a\" 2 B = \"b\" EXT)").unwrap();
        assert_eq!(
            ast.tokens.keys().collect::<Vec<_>>(),
            vec!["A", "B", "EXT"]
        );
        assert_eq!(ast.tokens.get("B").unwrap().precedence(), 2);
        assert!(ast.tokens.get("EXT").unwrap().is_simple());
    }

    #[test]
    fn test_token_group_with_semis_and_trailing_semi() {
        let ast = parse("tok (A = \"a\"; B = \"b\";);").unwrap();
        assert_eq!(ast.tokens.len(), 2);
    }

    #[test]
    fn test_skip_tokens_kept_apart() {
        let ast = parse("skip WS = \" \"; tok A = \"a\";").unwrap();
        assert_eq!(ast.skip_tokens.len(), 1);
        assert_eq!(ast.tokens.len(), 1);
        assert!(ast.get_token("WS").is_none());
    }

    #[test]
    fn test_construct_body_stored_raw() {
        let ast = parse("tok A = \"a\"; r = A (A | A)* ;").unwrap();
        let (body, _) = ast.get_construct("r").unwrap();
        assert_eq!(body, "A (A | A)* ");
    }

    #[test]
    fn test_construct_missing_equals() {
        let e = parse("r A;").unwrap_err();
        assert_eq!(e.kind(), &GrammarErrorKind::MissingEquals);
    }

    #[test]
    fn test_unknown_declaration() {
        let e = parse("= A;").unwrap_err();
        assert_eq!(e.kind(), &GrammarErrorKind::UnknownDeclaration);
    }

    #[test]
    fn test_bad_token_value() {
        let e = parse("tok A = 5;").unwrap_err();
        assert_eq!(e.kind(), &GrammarErrorKind::IllegalTokenDecl);
    }

    #[test]
    fn test_duplicate_token() {
        let e = parse("tok A = \"a\"; skip A = \"b\";").unwrap_err();
        assert_eq!(e.kind(), &GrammarErrorKind::DuplicateToken("A".to_string()));
    }

    #[test]
    fn test_truncated_declarations_are_grammar_errors() {
        // A declaration cut off by end of input is a structural mistake, not a lexical one.
        for src in &["tok", "skip ", "tok (A = \"a\"", "r"] {
            let e = parse(src).unwrap_err();
            assert_eq!(
                e.kind(),
                &GrammarErrorKind::IncompleteDeclaration,
                "wrong kind for {:?}",
                src
            );
            assert_eq!(e.phase(), crate::Phase::Grammar, "wrong phase for {:?}", src);
        }
    }

    #[test]
    fn test_unterminated_construct_body_is_lexical() {
        let e = parse("r = A").unwrap_err();
        assert_eq!(e.kind(), &GrammarErrorKind::PrematureEnd);
        assert_eq!(e.phase(), crate::Phase::Lex);
    }

    #[test]
    fn test_stray_semis_between_statements() {
        let ast = parse(";; tok A = \"a\" ;; r = A; ;").unwrap();
        assert_eq!(ast.tokens.len(), 1);
        assert_eq!(ast.constructs.len(), 1);
    }

    #[test]
    fn test_end_to_end_resolution() {
        let grm = crate::Grammar::from_str(
            "tok (P = \"(\" Q = \")\") e = P e Q | P Q;",
        )
        .unwrap();
        assert_eq!(grm.constructs.len(), 1);
        assert_eq!(grm.tokens.len(), 2);
        assert_eq!(grm.constructs[0].name, "e");
    }
}
