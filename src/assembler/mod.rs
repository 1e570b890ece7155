//! The driver (spec §4.4): walks the classified token stream and dispatches
//! to the section builder, symbol table, and scheduler. Ported in spirit
//! from `original_source/src/assembler.{hpp,cpp}`, restructured as a single
//! sequential cursor over an owned `Vec<Token>` instead of a hand-rolled
//! parser-combinator chain.

pub mod directives;
pub mod encoder;
pub mod finisher;
pub mod pseudo_ops;
pub mod scheduler;
pub mod section;
pub mod symbol_table;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::address::{Address, DEFAULT_BASE_ADDRESS};
use crate::errors::AssemblyError;
use crate::file_reader::FileReader;
use crate::instruction::Instruction32;
use crate::token::{classify::classify, raw_split::split, Token, TokenType};

use section::{OutputKind, SectionId, SectionTable};
use symbol_table::SymbolTable;

/// Assembly-wide configuration (spec §6): the knobs the CLI/caller supplies
/// that spec §1 treats as external.
#[derive(Debug, Clone)]
pub struct AssembleOptions {
    pub base_address: Address,
    pub page_separation: bool,
    pub entry_symbol: String,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self {
            base_address: DEFAULT_BASE_ADDRESS,
            page_separation: true,
            entry_symbol: "_start".to_string(),
        }
    }
}

/// Output of a completed, finished assembly: sections with final base
/// addresses, the symbol table, and the set of global names, ready to hand
/// to the object writer.
pub struct AssembledImage {
    pub sections: SectionTable,
    pub symbols: SymbolTable,
    pub globals: HashSet<String>,
    pub options: AssembleOptions,
}

pub struct Driver {
    tokens: Vec<Token>,
    index: usize,
    include_path: PathBuf,
    pub sections: SectionTable,
    current_section: SectionId,
    pub symbols: SymbolTable,
    pub scheduler: scheduler::Scheduler,
    pub globals: HashSet<String>,
    pub options: AssembleOptions,
    file_reader: Box<dyn FileReader>,
}

impl Driver {
    pub fn for_tokens(tokens: Vec<Token>, options: AssembleOptions, file_reader: Box<dyn FileReader>) -> Self {
        let sections = SectionTable::new();
        let current_section = sections.by_name(".text").expect(".text always exists");
        Self {
            tokens,
            index: 0,
            include_path: PathBuf::new(),
            sections,
            current_section,
            symbols: SymbolTable::new(),
            scheduler: scheduler::Scheduler::new(),
            globals: HashSet::new(),
            options,
            file_reader,
        }
    }

    // --- token cursor ---

    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    pub fn peek_is(&self, ty: TokenType) -> bool {
        self.peek().is_some_and(|t| t.ty == ty)
    }

    pub fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.index).cloned();
        if tok.is_some() {
            self.index += 1;
        }
        tok
    }

    pub fn expect(&mut self, ty: TokenType) -> Result<Token, AssemblyError> {
        match self.peek() {
            Some(t) if t.ty == ty => Ok(self.next().unwrap()),
            Some(t) => Err(AssemblyError::Parse {
                line: t.line,
                text: t.value.clone(),
                expected: ty_name(ty),
            }),
            None => Err(AssemblyError::UnexpectedEof),
        }
    }

    pub fn done(&self) -> bool {
        self.index >= self.tokens.len()
    }

    pub fn current_line(&self) -> u32 {
        self.peek()
            .or_else(|| self.tokens.last())
            .map(|t| t.line)
            .unwrap_or(0)
    }

    // --- section/symbol access ---

    pub fn current_section(&self) -> SectionId {
        self.current_section
    }

    pub fn current_offset(&self) -> u64 {
        self.sections.get(self.current_section).current_offset()
    }

    pub fn set_section(&mut self, name: &str) {
        self.current_section = self.sections.get_or_create(name);
    }

    pub fn emit(&mut self, kind: OutputKind, bytes: &[u8]) {
        self.sections.get_mut(self.current_section).add_output(kind, bytes);
    }

    pub fn emit_instructions(&mut self, words: &[Instruction32]) {
        for word in words {
            self.emit(OutputKind::Code, &word.to_le_bytes());
        }
    }

    pub fn align(&mut self, alignment: u64) {
        self.sections.get_mut(self.current_section).align(alignment);
    }

    pub fn queue_label(&mut self, name: impl Into<String>) {
        self.sections.get_mut(self.current_section).queue_label(name);
    }

    /// Flushes the current section's label queue into the symbol table at
    /// the current offset (spec §4.4's "flush label queue").
    pub fn flush_labels(&mut self) -> Result<(), AssemblyError> {
        let offset = self.current_offset();
        let section = self.current_section;
        let names = self.sections.get_mut(section).take_queued_labels();
        for name in names {
            self.symbols
                .define(&name, section, offset)
                .map_err(|reason| AssemblyError::Structural { reason })?;
        }
        Ok(())
    }

    pub fn mark_global(&mut self, name: &str) {
        self.globals.insert(name.to_string());
        self.symbols.mark_global(name);
    }

    pub fn schedule(&mut self, name: impl Into<String>, line: u32, f: scheduler::FixupFn) {
        self.scheduler.schedule(name, line, f);
    }

    // --- top-level dispatch (spec §4.4) ---

    fn dispatch_one(&mut self) -> Result<(), AssemblyError> {
        let tok = self.next().ok_or(AssemblyError::UnexpectedEof)?;
        match tok.ty {
            TokenType::Directive => directives::dispatch(self, &tok)?,
            TokenType::Label => self.queue_label(tok.value.clone()),
            TokenType::Opcode => {
                self.align(4);
                self.flush_labels()?;
                let handler = tok.opcode().expect("Opcode token always carries a handler");
                let words = handler(self)?;
                self.emit_instructions(&words);
            }
            TokenType::PseudoOp => {
                let handler = tok.pseudo_op().expect("PseudoOp token always carries a handler");
                handler(self)?;
            }
            _ => {
                return Err(AssemblyError::Parse {
                    line: tok.line,
                    text: tok.value.clone(),
                    expected: "a directive, label, opcode, or pseudo-op",
                });
            }
        }
        Ok(())
    }

    pub fn run(&mut self) -> Result<(), AssemblyError> {
        while !self.done() {
            self.dispatch_one()?;
        }
        Ok(())
    }

    /// Re-enters the driver on an included file's token stream, per spec
    /// §4.4: the current token list, index, and include-relative path are
    /// saved, the included tokens processed, then restored.
    pub fn include_file(&mut self, rel_path: &str) -> Result<(), AssemblyError> {
        let resolved = self.include_path.join(rel_path);
        let source = self
            .file_reader
            .read_to_string(&resolved)
            .map_err(|e| AssemblyError::Structural {
                reason: format!("failed to read include \"{}\": {e}", resolved.display()),
            })?;
        let raw = split(&source)?;
        let included_tokens = classify(&raw)?;

        let saved_tokens = std::mem::replace(&mut self.tokens, included_tokens);
        let saved_index = std::mem::replace(&mut self.index, 0);
        let saved_path = std::mem::replace(
            &mut self.include_path,
            resolved.parent().map(Path::to_path_buf).unwrap_or_default(),
        );

        let result = self.run();

        self.tokens = saved_tokens;
        self.index = saved_index;
        self.include_path = saved_path;
        result
    }

    pub fn read_binary(&self, rel_path: &str) -> Result<Vec<u8>, AssemblyError> {
        let resolved = self.include_path.join(rel_path);
        self.file_reader
            .read_binary(&resolved)
            .map_err(|e| AssemblyError::Structural {
                reason: format!("failed to read binary include \"{}\": {e}", resolved.display()),
            })
    }
}

fn ty_name(ty: TokenType) -> &'static str {
    match ty {
        TokenType::Directive => "a directive",
        TokenType::Label => "a label",
        TokenType::String => "a string",
        TokenType::Symbol => "a symbol",
        TokenType::Opcode => "an opcode",
        TokenType::PseudoOp => "a pseudo-op",
        TokenType::Register => "a register",
        TokenType::Constant => "a constant",
        TokenType::Operator => "an operator",
        TokenType::Unspecified => "a token",
    }
}

/// Top-level entry point: tokenizes `source`, drives the full pipeline, and
/// runs the finisher, producing a fully-resolved image ready for the object
/// writer.
pub fn assemble_source(
    source: &str,
    base_path: &Path,
    options: AssembleOptions,
    file_reader: Box<dyn FileReader>,
) -> Result<AssembledImage, AssemblyError> {
    let raw = split(source)?;
    let tokens = classify(&raw)?;
    let mut driver = Driver::for_tokens(tokens, options, file_reader);
    driver.include_path = base_path.to_path_buf();
    driver.run()?;
    finisher::finish(&mut driver)?;

    Ok(AssembledImage {
        sections: driver.sections,
        symbols: driver.symbols,
        globals: driver.globals,
        options: driver.options,
    })
}
