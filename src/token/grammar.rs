//! Derives the raw-splitting grammar from `grammar.pest`, the same way
//! `parser.rs` derives `CicadaParser` from a `.pest` file for its
//! tokenize/parse stage.

use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "token/grammar.pest"]
pub struct RawGrammar;
