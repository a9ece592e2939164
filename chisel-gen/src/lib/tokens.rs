//! The token section: a type tag for every declared token, plus a prototype and a definition
//! for every token that owns a matcher (Literal and Functional), and the synthesised `skip`
//! composite that the generated regex routines invoke before every try.

use chisel_grammar::TokenDecl;

/// C-quote `s` for splicing into generated source. Octal escapes are used for non-printable
/// bytes: `\x` escapes would swallow any hex digit that follows them.
pub(crate) fn c_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for b in s.bytes() {
        match b {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            0x20..=0x7e => out.push(b as char),
            _ => out.push_str(&format!("\\{:03o}", b)),
        }
    }
    out.push('"');
    out
}

/// The matcher prototype, or `None` for Simple tokens. Skip matchers consume silently and
/// return no value.
pub(crate) fn prototype(t: &TokenDecl, skip: bool) -> Option<String> {
    if t.is_simple() {
        return None;
    }
    let ret = if skip { "void" } else { "Token" };
    Some(format!("static {} token_{}(std::istream &);", ret, t.name()))
}

/// A call of the matcher with `args`, or `None` for Simple tokens.
pub(crate) fn call(t: &TokenDecl, args: &str) -> Option<String> {
    if t.is_simple() {
        return None;
    }
    Some(format!("Token::token_{}({})", t.name(), args))
}

pub(crate) fn definition(t: &TokenDecl, skip: bool) -> Option<String> {
    match t {
        TokenDecl::Simple { .. } => None,
        TokenDecl::Literal { name, literal, .. } => {
            let len = literal.len();
            let lit = c_quote(literal);
            if skip {
                Some(format!(
                    "void Token::token_{name}(std::istream &reader) {{\n\
                     \tchar buf[{len}];\n\
                     \treader.read(buf, {len});\n\
                     \tauto n = reader.gcount();\n\
                     \tif (n != {len}) {{\n\
                     \t\treader.clear();\n\
                     \t\treader.seekg(-n, std::ios::cur);\n\
                     \t\treturn;\n\
                     \t}}\n\
                     \tif (strncmp(buf, {lit}, {len}) == 0) return;\n\
                     \treader.clear();\n\
                     \treader.seekg(-{len}, std::ios::cur);\n\
                     }}\n"
                ))
            } else {
                Some(format!(
                    "Token Token::token_{name}(std::istream &reader) {{\n\
                     \tchar buf[{len}];\n\
                     \treader.read(buf, {len});\n\
                     \tauto n = reader.gcount();\n\
                     \tif (n != {len}) {{\n\
                     \t\treader.clear();\n\
                     \t\treader.seekg(-n, std::ios::cur);\n\
                     \t\treturn Token::failed;\n\
                     \t}}\n\
                     \tif (strncmp(buf, {lit}, {len}) == 0)\n\
                     \t\treturn Token(Token::Type::{name}, nullptr);\n\
                     \treader.clear();\n\
                     \treader.seekg(-{len}, std::ios::cur);\n\
                     \treturn Token::failed;\n\
                     }}\n"
                ))
            }
        }
        TokenDecl::Functional {
            name, params, body, ..
        } => {
            let ret = if skip { "void" } else { "Token" };
            Some(format!("{} Token::token_{} {} {}\n", ret, name, params, body))
        }
    }
}

pub(crate) struct TokenSection {
    pub(crate) types: String,
    pub(crate) prototypes: String,
    pub(crate) definitions: String,
}

/// Build the three substitution fragments of the token section. Type tags cover every token,
/// Simple ones included, so that external code can name terminals the lexer never produces.
pub(crate) fn build(tokens: &[TokenDecl], skip_tokens: &[TokenDecl]) -> TokenSection {
    let mut types = String::new();
    let mut prototypes = String::new();
    let mut definitions = String::new();

    for t in tokens {
        types.push_str(t.name());
        types.push_str(",\n");
        if let Some(p) = prototype(t, false) {
            prototypes.push_str(&p);
            prototypes.push('\n');
        }
        if let Some(d) = definition(t, false) {
            definitions.push_str(&d);
            definitions.push('\n');
        }
    }
    for t in skip_tokens {
        types.push_str(t.name());
        types.push_str(",\n");
        if let Some(p) = prototype(t, true) {
            prototypes.push_str(&p);
            prototypes.push('\n');
        }
        if let Some(d) = definition(t, true) {
            definitions.push_str(&d);
            definitions.push('\n');
        }
    }

    prototypes.push_str("static void skip(std::istream &reader);\n");
    definitions.push_str("void Token::skip(std::istream &reader) {\n");
    for t in skip_tokens {
        if let Some(c) = call(t, "reader") {
            definitions.push_str("\t");
            definitions.push_str(&c);
            definitions.push_str(";\n");
        }
    }
    definitions.push_str("}\n");

    TokenSection {
        types,
        prototypes,
        definitions,
    }
}
