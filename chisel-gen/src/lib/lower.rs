//! The code lowerer. Walks every construct (in declaration order) and every regex node
//! (depth-first, parent before children) assigning per-variant numeric IDs, and renders the
//! lexer try-cascade and the parser section's routines.
//!
//! Every generated routine follows the same discipline: invoke the skip composite, checkpoint
//! the stream position where the construct could fail part-way, and rewind to the checkpoint on
//! failure (or to the last successful checkpoint at the end of a greedy loop).

use chisel_grammar::{Grammar, Regex, TokenDecl};

use crate::tokens;

/// The lexer section fragment: the body of `Lexer::lex`. Tokens are tried in ascending
/// precedence; the sort is stable, so equal precedences keep declaration order. Simple tokens
/// have no matcher and are filtered out of the cascade.
pub(crate) fn lexer_section(grammar: &Grammar) -> String {
    let mut toks: Vec<&TokenDecl> = grammar.tokens.iter().collect();
    toks.sort_by_key(|t| t.precedence());

    let mut out = String::new();
    out.push_str("Token token;\n");
    for t in toks {
        if let Some(c) = tokens::call(t, "*this->reader") {
            out.push_str(&format!("token = {};\n", c));
            out.push_str("if (token) return token;\n");
        }
    }
    out.push_str("return Token::failed;\n");
    out
}

pub(crate) struct ParserSection {
    pub(crate) types: String,
    pub(crate) construct_prototypes: String,
    pub(crate) construct_definitions: String,
    pub(crate) regex_prototypes: String,
    pub(crate) regex_definitions: String,
}

/// Renders the parser section. One `Lowerer` per generation run: the counters are instance
/// state, so identical inputs always yield identical IDs.
pub(crate) struct Lowerer {
    unit: usize,
    nested: usize,
    chain: usize,
    or: usize,
    multiplier: usize,
    optional: usize,
}

impl Lowerer {
    pub(crate) fn new() -> Self {
        Lowerer {
            unit: 0,
            nested: 0,
            chain: 0,
            or: 0,
            multiplier: 0,
            optional: 0,
        }
    }

    pub(crate) fn parser_section(&mut self, grammar: &Grammar) -> ParserSection {
        let mut sec = ParserSection {
            types: String::new(),
            construct_prototypes: String::new(),
            construct_definitions: String::new(),
            regex_prototypes: String::new(),
            regex_definitions: String::new(),
        };
        for c in &grammar.constructs {
            sec.types.push_str(&c.name);
            sec.types.push_str(",\n");
            sec.construct_prototypes
                .push_str(&format!("static Node construct_{}(std::istream &);\n", c.name));

            let call = self
                .lower(&c.body, &mut sec.regex_prototypes, &mut sec.regex_definitions)
                .map(|f| format!("{}(reader, node.get_node()->get_children())", f))
                .unwrap_or_else(|| "true".to_string());
            sec.construct_definitions.push_str(&format!(
                "Parser::Node Parser::construct_{name}(std::istream &reader) {{\n\
                 \tNode node(new ParseNode(ParseNode::Type::{name}));\n\
                 \tif (!{call}) {{\n\
                 \t\treturn Node::failed;\n\
                 \t}}\n\
                 \treturn node;\n\
                 }}\n\n",
                name = c.name,
                call = call
            ));
        }
        sec
    }

    /// Lower one regex node: assign its ID, then append its prototype and definition (children
    /// first) to the section buffers. Returns the generated routine's name, or `None` for nodes
    /// that render nothing — units over Simple tokens, which reserve an ID but contribute no
    /// term to the enclosing expression.
    fn lower(&mut self, rx: &Regex, protos: &mut String, defs: &mut String) -> Option<String> {
        match rx {
            Regex::Captured { inner } => self.lower(inner, protos, defs),
            Regex::Unit { token } => {
                self.unit += 1;
                let c = tokens::call(token, "reader")?;
                let id = self.unit;
                let fname = format!("parse_unit_{}", id);
                push_proto(protos, &fname);
                defs.push_str(&format!(
                    "bool Parser::{fname}(std::istream &reader, std::vector<Parser::Node> &nodes) {{\n\
                     \tToken::skip(reader);\n\
                     \tauto token = {c};\n\
                     \tif (token) nodes.emplace_back(std::move(token));\n\
                     \treturn token;\n\
                     }}\n\n"
                ));
                Some(fname)
            }
            Regex::Nested { name, .. } => {
                self.nested += 1;
                let fname = format!("parse_nested_{}", self.nested);
                push_proto(protos, &fname);
                defs.push_str(&format!(
                    "bool Parser::{fname}(std::istream &reader, std::vector<Parser::Node> &nodes) {{\n\
                     \tToken::skip(reader);\n\
                     \tauto construct = construct_{name}(reader);\n\
                     \tif (construct) nodes.emplace_back(construct);\n\
                     \treturn construct;\n\
                     }}\n\n"
                ));
                Some(fname)
            }
            Regex::Chain { children } => {
                self.chain += 1;
                let fname = format!("parse_chain_{}", self.chain);
                let calls = children
                    .iter()
                    .filter_map(|c| self.lower(c, protos, defs))
                    .map(|f| format!("({}(reader, nodes))", f))
                    .collect::<Vec<_>>();
                let expr = if calls.is_empty() {
                    "true".to_string()
                } else {
                    calls.join(" && ")
                };
                push_proto(protos, &fname);
                defs.push_str(&format!(
                    "bool Parser::{fname}(std::istream &reader, std::vector<Parser::Node> &nodes) {{\n\
                     \tToken::skip(reader);\n\
                     \tauto start = reader.tellg();\n\
                     \tbool result = {expr};\n\
                     \tif (!result) {{\n\
                     \t\treader.clear();\n\
                     \t\treader.seekg(start, std::ios::beg);\n\
                     \t}}\n\
                     \treturn result;\n\
                     }}\n\n"
                ));
                Some(fname)
            }
            Regex::Or { children } => {
                self.or += 1;
                let fname = format!("parse_or_{}", self.or);
                let calls = children
                    .iter()
                    .filter_map(|c| self.lower(c, protos, defs))
                    .map(|f| format!("({}(reader, nodes))", f))
                    .collect::<Vec<_>>();
                let expr = if calls.is_empty() {
                    "false".to_string()
                } else {
                    calls.join(" || ")
                };
                push_proto(protos, &fname);
                defs.push_str(&format!(
                    "bool Parser::{fname}(std::istream &reader, std::vector<Parser::Node> &nodes) {{\n\
                     \tToken::skip(reader);\n\
                     \tauto start = reader.tellg();\n\
                     \tbool result = {expr};\n\
                     \tif (!result) {{\n\
                     \t\treader.clear();\n\
                     \t\treader.seekg(start, std::ios::beg);\n\
                     \t}}\n\
                     \treturn result;\n\
                     }}\n\n"
                ));
                Some(fname)
            }
            Regex::Multiplier { require_one, inner } => {
                self.multiplier += 1;
                let fname = format!("parse_multiplier_{}", self.multiplier);
                let call = self
                    .lower(inner, protos, defs)
                    .map(|f| format!("{}(reader, nodes)", f))
                    .unwrap_or_else(|| "true".to_string());
                push_proto(protos, &fname);
                if *require_one {
                    defs.push_str(&format!(
                        "bool Parser::{fname}(std::istream &reader, std::vector<Parser::Node> &nodes) {{\n\
                         \tToken::skip(reader);\n\
                         \tauto start = reader.tellg();\n\
                         \tauto first = {call};\n\
                         \tif (!first) {{\n\
                         \t\treader.clear();\n\
                         \t\treader.seekg(start, std::ios::beg);\n\
                         \t\treturn false;\n\
                         \t}}\n\
                         \tfor (auto result = first; result; result = {call}) {{\n\
                         \t\tstart = reader.tellg();\n\
                         \t}}\n\
                         \treader.clear();\n\
                         \treader.seekg(start, std::ios::beg);\n\
                         \treturn true;\n\
                         }}\n\n"
                    ));
                } else {
                    defs.push_str(&format!(
                        "bool Parser::{fname}(std::istream &reader, std::vector<Parser::Node> &nodes) {{\n\
                         \tToken::skip(reader);\n\
                         \tauto start = reader.tellg();\n\
                         \tfor (auto result = {call}; result; result = {call}) {{\n\
                         \t\tstart = reader.tellg();\n\
                         \t}}\n\
                         \treader.clear();\n\
                         \treader.seekg(start, std::ios::beg);\n\
                         \treturn true;\n\
                         }}\n\n"
                    ));
                }
                Some(fname)
            }
            Regex::Optional { inner } => {
                self.optional += 1;
                let fname = format!("parse_optional_{}", self.optional);
                let call = self
                    .lower(inner, protos, defs)
                    .map(|f| format!("{}(reader, nodes)", f))
                    .unwrap_or_else(|| "true".to_string());
                push_proto(protos, &fname);
                defs.push_str(&format!(
                    "bool Parser::{fname}(std::istream &reader, std::vector<Parser::Node> &nodes) {{\n\
                     \tToken::skip(reader);\n\
                     \tauto start = reader.tellg();\n\
                     \tif (!{call}) {{\n\
                     \t\treader.clear();\n\
                     \t\treader.seekg(start, std::ios::beg);\n\
                     \t}}\n\
                     \treturn true;\n\
                     }}\n\n"
                ));
                Some(fname)
            }
        }
    }
}

fn push_proto(protos: &mut String, fname: &str) {
    protos.push_str(&format!(
        "static bool {}(std::istream &, std::vector<Parser::Node> &);\n",
        fname
    ));
}

#[cfg(test)]
mod test {
    use super::*;
    use chisel_grammar::Grammar;

    fn section(src: &str) -> ParserSection {
        let grm = Grammar::from_str(src).unwrap();
        Lowerer::new().parser_section(&grm)
    }

    #[test]
    fn test_unit_routine() {
        let sec = section("tok A = \"a\"; r = A;");
        assert!(sec.types.contains("r,\n"));
        assert!(sec
            .construct_prototypes
            .contains("static Node construct_r(std::istream &);"));
        assert!(sec.regex_definitions.contains("bool Parser::parse_unit_1"));
        assert!(sec.regex_definitions.contains("Token::token_A(reader)"));
        assert!(sec
            .construct_definitions
            .contains("if (!parse_unit_1(reader, node.get_node()->get_children()))"));
    }

    #[test]
    fn test_or_routine_tries_in_source_order_and_rewinds() {
        let sec = section("tok A = \"a\"; tok B = \"b\"; r = A | B | A;");
        assert!(sec.regex_definitions.contains(
            "bool result = (parse_unit_1(reader, nodes)) || (parse_unit_2(reader, nodes)) || (parse_unit_3(reader, nodes))"
        ));
        assert!(sec.regex_definitions.contains("reader.seekg(start, std::ios::beg);"));
    }

    #[test]
    fn test_chain_short_circuits() {
        let sec = section("tok A = \"a\"; tok B = \"b\"; r = A B;");
        assert!(sec.regex_definitions.contains(
            "bool result = (parse_unit_1(reader, nodes)) && (parse_unit_2(reader, nodes))"
        ));
    }

    #[test]
    fn test_simple_units_elided_but_counted() {
        let sec = section("tok A = \"a\"; tok EXT; r = EXT A;");
        // The Simple unit reserves unit ID 1; the emitted chain only calls the literal's
        // routine, which therefore gets ID 2.
        assert!(!sec.regex_definitions.contains("parse_unit_1"));
        assert!(sec
            .regex_definitions
            .contains("bool result = (parse_unit_2(reader, nodes));"));
    }

    #[test]
    fn test_multiplier_variants() {
        let sec = section("tok D = \"x\"; r = D+ D*;");
        assert!(sec.regex_definitions.contains("auto first = parse_unit_1(reader, nodes);"));
        assert!(sec
            .regex_definitions
            .contains("for (auto result = parse_unit_2(reader, nodes); result; result = parse_unit_2(reader, nodes))"));
    }

    #[test]
    fn test_nested_routine_calls_construct() {
        let sec = section("tok P = \"(\"; tok Q = \")\"; e = P e Q | P Q;");
        assert!(sec.regex_definitions.contains("auto construct = construct_e(reader);"));
        // `e` itself is emitted exactly once.
        assert_eq!(sec.construct_definitions.matches("Parser::construct_e(").count(), 1);
    }

    #[test]
    fn test_lexer_cascade_sorted_by_precedence_stably() {
        let grm = Grammar::from_str(
            "tok (2 B = \"b\" 1 A = \"a\" 1 C = \"c\" EXT) r = A;",
        )
        .unwrap();
        let lex = lexer_section(&grm);
        let at = |n: &str| lex.find(&format!("Token::token_{}(*this->reader)", n)).unwrap();
        assert!(at("A") < at("C"), "equal precedences keep declaration order");
        assert!(at("C") < at("B"));
        assert!(!lex.contains("token_EXT"));
        assert!(lex.ends_with("return Token::failed;\n"));
    }
}
