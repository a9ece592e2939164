//! The emission driver. Composes the output file from a fixed include line, the user's prefix
//! blocks, the three template expansions, and the user's suffix blocks.
//!
//! Templates carry their substitution points as `/*{{marker}}*/`; each substituted fragment is
//! wrapped `*/ … /*` so the fence that keeps a marker inert in the template turns into a pair of
//! empty comments around live code in the output.

use std::io::Write;
use std::path::Path;

use chisel_grammar::Grammar;
use tempfile::NamedTempFile;

use crate::{
    lower::{lexer_section, Lowerer},
    tokens, GenResult,
};

const TOKEN_TEMPLATE: &str = include_str!("templates/token.hpp");
const LEXER_TEMPLATE: &str = include_str!("templates/lexer.hpp");
const PARSER_TEMPLATE: &str = include_str!("templates/parser.hpp");

fn substitute(template: &str, subs: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (marker, text) in subs {
        out = out.replace(
            &format!("{{{{{}}}}}", marker),
            &format!("*/\n{}/*", text),
        );
    }
    out
}

fn push_block(out: &mut String, block: &str) {
    out.push_str(block);
    if !block.ends_with('\n') {
        out.push('\n');
    }
}

/// Render the complete output file for `grammar`. This is a pure function of the grammar; all
/// file I/O lives in [crate::GenBuilder].
pub fn render(grammar: &Grammar) -> String {
    let mut out = String::new();
    out.push_str("#include <istream>\n");
    for p in &grammar.prefixes {
        push_block(&mut out, p);
    }

    let tsec = tokens::build(&grammar.tokens, &grammar.skip_tokens);
    out.push_str(&substitute(
        TOKEN_TEMPLATE,
        &[
            ("token_types", &tsec.types),
            ("token_prototypes", &tsec.prototypes),
            ("token_definitions", &tsec.definitions),
        ],
    ));

    out.push_str(&substitute(
        LEXER_TEMPLATE,
        &[("lex_definition", &lexer_section(grammar))],
    ));

    let psec = Lowerer::new().parser_section(grammar);
    out.push_str(&substitute(
        PARSER_TEMPLATE,
        &[
            ("construct_types", &psec.types),
            ("construct_prototypes", &psec.construct_prototypes),
            ("construct_definitions", &psec.construct_definitions),
            ("regex_prototypes", &psec.regex_prototypes),
            ("regex_definitions", &psec.regex_definitions),
        ],
    ));

    for s in &grammar.suffixes {
        push_block(&mut out, s);
    }
    out
}

/// Write the rendered output for `grammar` to `path` via a temporary file in the same
/// directory, renamed into place on success.
pub(crate) fn write_file(grammar: &Grammar, path: &Path) -> GenResult<()> {
    let out = render(grammar);
    let dir = match path.parent() {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(out.as_bytes())?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
