//! The raw splitter (spec §4.1): a pest-derived grammar (`grammar.pest`)
//! turns source text into [`RawToken`] words, matching the separator set
//! `original_source/src/raw_split.cpp` uses with the redesigned `<<`/`>>`
//! split-out (spec §9) and the escape handling spec §4.1 adds on top.

use pest::Parser;

use super::grammar::{RawGrammar, Rule};
use super::RawToken;
use crate::errors::AssemblyError;

/// Translates the backslash escapes inside a matched `string_lit` span
/// (quotes included) into their real characters, leaving the surrounding
/// quotes in place.
fn translate_string_escapes(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(next) = chars.next() else {
            break;
        };
        let translated = match next {
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            'b' => '\u{8}',
            '0' => '\0',
            '\\' | '\'' | '"' => next,
            other => {
                eprintln!("warning: unknown escape \\{other} passed through verbatim");
                other
            }
        };
        out.push(translated);
    }
    out
}

/// Splits `source` into raw words (spec §4.1).
pub fn split(source: &str) -> Result<Vec<RawToken>, AssemblyError> {
    let program = RawGrammar::parse(Rule::program, source)
        .map_err(|e| AssemblyError::Lex {
            line: 0,
            text: source.to_string(),
            reason: e.to_string(),
        })?
        .next()
        .expect("the program rule always produces exactly one top-level pair");

    let mut tokens = Vec::new();
    for pair in program.into_inner() {
        if pair.as_rule() == Rule::EOI {
            continue;
        }
        let line = pair.as_span().start_pos().line_col().0 as u32;
        let inner = pair
            .into_inner()
            .next()
            .expect("a token pair always wraps exactly one alternative");
        let text = match inner.as_rule() {
            Rule::string_lit => translate_string_escapes(inner.as_str()),
            _ => inner.as_str().to_string(),
        };
        tokens.push(RawToken { text, line });
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(src: &str) -> Vec<String> {
        split(src).unwrap().into_iter().map(|t| t.text).collect()
    }

    #[test]
    fn splits_on_whitespace_and_commas() {
        assert_eq!(words("li a0, 0x10"), vec!["li", "a0", "0x10"]);
    }

    #[test]
    fn strips_line_comments() {
        assert_eq!(words("nop ; a comment\nnop"), vec!["nop", "nop"]);
    }

    #[test]
    fn retains_quotes_on_strings() {
        assert_eq!(words("\"hi\""), vec!["\"hi\""]);
    }

    #[test]
    fn translates_escapes_inside_strings() {
        assert_eq!(words("\"a\\nb\""), vec!["\"a\nb\""]);
    }

    #[test]
    fn splits_operators_into_single_char_words() {
        assert_eq!(words("1+2-3"), vec!["1", "+", "2", "-", "3"]);
    }

    #[test]
    fn splits_shift_operators_into_two_char_words() {
        assert_eq!(words("1<<2>>3"), vec!["1", "<<", "2", ">>", "3"]);
    }

    #[test]
    fn tracks_line_numbers() {
        let toks = split("a\nb\nc").unwrap();
        assert_eq!(toks.iter().map(|t| t.line).collect::<Vec<_>>(), vec![
            1, 2, 3
        ]);
    }

    #[test]
    fn flushes_trailing_word_at_eof() {
        assert_eq!(words("nop"), vec!["nop"]);
    }
}
