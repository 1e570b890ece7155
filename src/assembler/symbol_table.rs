//! The symbol table (spec §4.4/§4.6), ported from the shape of
//! `original_source/src/assembler.hpp`'s symbol map.

use std::collections::HashMap;

use crate::address::Address;
use crate::assembler::section::SectionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    NoType,
    Object,
    Function,
}

#[derive(Debug, Clone)]
pub struct SymbolEntry {
    pub section: SectionId,
    pub offset: u64,
    pub kind: SymbolKind,
    pub size: u64,
    pub global: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    entries: HashMap<String, SymbolEntry>,
}

#[derive(Debug, Clone, Copy)]
pub struct ResolvedSymbol {
    pub section: SectionId,
    pub offset: u64,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines `name` at `(section, offset)`. Spec invariant 6: redefining an
    /// existing symbol is a structural error, not a silent overwrite.
    pub fn define(
        &mut self,
        name: impl Into<String>,
        section: SectionId,
        offset: u64,
    ) -> Result<(), String> {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return Err(format!("symbol \"{name}\" already defined"));
        }
        self.entries.insert(
            name,
            SymbolEntry {
                section,
                offset,
                kind: SymbolKind::NoType,
                size: 0,
                global: false,
            },
        );
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&SymbolEntry> {
        self.entries.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut SymbolEntry> {
        self.entries.get_mut(name)
    }

    pub fn mark_global(&mut self, name: &str) -> bool {
        match self.entries.get_mut(name) {
            Some(e) => {
                e.global = true;
                true
            }
            None => false,
        }
    }

    pub fn set_kind(&mut self, name: &str, kind: SymbolKind) -> bool {
        match self.entries.get_mut(name) {
            Some(e) => {
                e.kind = kind;
                true
            }
            None => false,
        }
    }

    pub fn set_size(&mut self, name: &str, size: u64) -> bool {
        match self.entries.get_mut(name) {
            Some(e) => {
                e.size = size;
                true
            }
            None => false,
        }
    }

    pub fn resolve(&self, name: &str) -> Option<ResolvedSymbol> {
        self.entries.get(name).map(|e| ResolvedSymbol {
            section: e.section,
            offset: e.offset,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SymbolEntry)> {
        self.entries.iter()
    }

    /// Absolute address of a resolved symbol once sections have their base
    /// addresses assigned (spec §4.6 step 3).
    pub fn address_of(
        &self,
        name: &str,
        sections: &crate::assembler::section::SectionTable,
    ) -> Option<Address> {
        let e = self.entries.get(name)?;
        Some(sections.get(e.section).address_at(e.offset))
    }
}
