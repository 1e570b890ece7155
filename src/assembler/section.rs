//! The section builder (spec §4.6), ported from
//! `original_source/src/section.{hpp,cpp}` and generalized to an
//! insertion-ordered table of named sections.

use crate::address::{align_up, Address};
use crate::errors::AssemblyError;

pub type SectionId = u32;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SectionAttrs {
    pub code: bool,
    pub data: bool,
    pub resv: bool,
    pub readonly: bool,
    pub execonly: bool,
}

#[derive(Debug, Clone)]
pub struct Section {
    name: String,
    index: SectionId,
    pub bytes: Vec<u8>,
    base_addr: Option<Address>,
    label_queue: Vec<String>,
    pub attrs: SectionAttrs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Code,
    Data,
}

impl Section {
    fn new(name: impl Into<String>, index: SectionId) -> Self {
        Self {
            name: name.into(),
            index,
            bytes: Vec::new(),
            base_addr: None,
            label_queue: Vec::new(),
            attrs: SectionAttrs::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn index(&self) -> SectionId {
        self.index
    }
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
    pub fn has_base_address(&self) -> bool {
        self.base_addr.is_some()
    }
    pub fn base_address(&self) -> Address {
        self.base_addr.unwrap_or(0)
    }
    pub fn set_base_address(&mut self, addr: Address) {
        self.base_addr = Some(addr);
    }
    pub fn address_at(&self, offset: u64) -> Address {
        self.base_address() + offset as Address
    }
    pub fn current_offset(&self) -> u64 {
        self.size()
    }

    pub fn add_output(&mut self, kind: OutputKind, data: &[u8]) {
        self.bytes.extend_from_slice(data);
        match kind {
            OutputKind::Code => self.attrs.code = true,
            OutputKind::Data => self.attrs.data = true,
        }
    }

    pub fn allocate(&mut self, len: u64) {
        self.bytes.resize(self.bytes.len() + len as usize, 0);
        self.attrs.resv = true;
    }

    pub fn align(&mut self, alignment: u64) {
        if alignment <= 1 {
            return;
        }
        let new_len = align_up(self.bytes.len() as Address, alignment as Address) as usize;
        self.bytes.resize(new_len, 0);
    }

    pub fn queue_label(&mut self, name: impl Into<String>) {
        self.label_queue.push(name.into());
    }

    /// Flushes queued labels at the section's current offset, returning the
    /// names to be inserted into the symbol table by the caller (the driver
    /// owns the symbol table, not the section).
    pub fn take_queued_labels(&mut self) -> Vec<String> {
        std::mem::take(&mut self.label_queue)
    }

    /// Patches the 4-byte little-endian word at `offset` using `f`, used by
    /// scheduled fix-ups to rewrite an already-emitted instruction in place
    /// (spec invariant 1: the buffer is append-only except for such
    /// patches).
    pub fn patch_word(&mut self, offset: u64, f: impl FnOnce(u32) -> u32) -> Result<(), AssemblyError> {
        let offset = offset as usize;
        let name = self.name.clone();
        let len = self.bytes.len();
        let slice = self.bytes.get_mut(offset..offset + 4).ok_or_else(|| {
            AssemblyError::Structural {
                reason: format!(
                    "fix-up offset {offset} out of bounds for section \"{}\" (len {})",
                    name,
                    len
                ),
            }
        })?;
        let word = u32::from_le_bytes(slice.try_into().unwrap());
        let patched = f(word);
        slice.copy_from_slice(&patched.to_le_bytes());
        Ok(())
    }
}

/// Insertion-ordered collection of sections. `.text` always exists and is
/// created first (spec invariant 4).
#[derive(Debug, Clone)]
pub struct SectionTable {
    sections: Vec<Section>,
    by_name: std::collections::HashMap<String, SectionId>,
}

impl SectionTable {
    pub fn new() -> Self {
        let mut table = Self {
            sections: Vec::new(),
            by_name: std::collections::HashMap::new(),
        };
        table.get_or_create(".text");
        table
    }

    pub fn get_or_create(&mut self, name: &str) -> SectionId {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        let id = self.sections.len() as SectionId;
        self.sections.push(Section::new(name, id));
        self.by_name.insert(name.to_string(), id);
        id
    }

    pub fn get(&self, id: SectionId) -> &Section {
        &self.sections[id as usize]
    }
    pub fn get_mut(&mut self, id: SectionId) -> &mut Section {
        &mut self.sections[id as usize]
    }
    pub fn by_name(&self, name: &str) -> Option<SectionId> {
        self.by_name.get(name).copied()
    }

    /// Sections in insertion order (spec invariant 4).
    pub fn iter(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter()
    }
    pub fn len(&self) -> usize {
        self.sections.len()
    }
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Assigns base addresses across sections in insertion order, respecting
    /// the page-separation policy (spec §4.6 step 2). Idempotent: sections
    /// that already have an explicit base (via `.org`) keep it.
    pub fn assign_base_addresses(&mut self, start: Address, page_separation: bool) {
        let mut cursor = start;
        let mut prev_attrs: Option<SectionAttrs> = None;
        for section in self.sections.iter_mut() {
            if section.has_base_address() {
                cursor = section.base_address();
            } else {
                if let Some(prev) = prev_attrs {
                    let exec_to_data = prev.code && !section.attrs.code;
                    let ro_to_rw = prev.readonly && !section.attrs.readonly;
                    if page_separation && (exec_to_data || ro_to_rw) {
                        cursor = align_up(cursor, crate::address::PAGE_SIZE);
                    }
                }
                section.set_base_address(cursor);
            }
            cursor = align_up(section.base_address() + section.size() as Address, 16);
            prev_attrs = Some(section.attrs);
        }
    }
}

impl Default for SectionTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_section_exists_by_default() {
        let table = SectionTable::new();
        assert_eq!(table.by_name(".text"), Some(0));
    }

    #[test]
    fn sections_keep_insertion_order() {
        let mut table = SectionTable::new();
        table.get_or_create(".data");
        table.get_or_create(".bss");
        let names: Vec<_> = table.iter().map(|s| s.name().to_string()).collect();
        assert_eq!(names, vec![".text", ".data", ".bss"]);
    }

    #[test]
    fn align_pads_with_zero() {
        let mut s = Section::new("x", 0);
        s.add_output(OutputKind::Data, &[1, 2, 3]);
        s.align(4);
        assert_eq!(s.bytes, vec![1, 2, 3, 0]);
    }

    #[test]
    fn base_addresses_round_up_to_sixteen_bytes() {
        let mut table = SectionTable::new();
        table.get_mut(0).add_output(OutputKind::Code, &[0; 7]);
        let data = table.get_or_create(".data");
        table.get_mut(data).add_output(OutputKind::Data, &[0; 1]);
        table.assign_base_addresses(0x1000, false);
        assert_eq!(table.get(0).base_address(), 0x1000);
        assert_eq!(table.get(data).base_address(), 0x1010);
    }

    #[test]
    fn page_separation_aligns_exec_to_data_transition() {
        let mut table = SectionTable::new();
        table.get_mut(0).add_output(OutputKind::Code, &[0; 7]);
        let data = table.get_or_create(".data");
        table.get_mut(data).add_output(OutputKind::Data, b"x\0");
        table.assign_base_addresses(0x1000, true);
        assert_eq!(table.get(data).base_address() % crate::address::PAGE_SIZE, 0);
        assert!(table.get(data).base_address() >= 0x2000);
    }

    #[test]
    fn explicit_base_address_is_kept() {
        let mut table = SectionTable::new();
        table.get_mut(0).set_base_address(0x5000);
        table.assign_base_addresses(0x1000, false);
        assert_eq!(table.get(0).base_address(), 0x5000);
    }

    #[test]
    fn base_resolution_is_idempotent() {
        let mut table = SectionTable::new();
        table.get_mut(0).add_output(OutputKind::Code, &[0; 5]);
        table.assign_base_addresses(0x1000, true);
        let first = table.get(0).base_address();
        table.assign_base_addresses(0x1000, true);
        assert_eq!(table.get(0).base_address(), first);
    }
}
