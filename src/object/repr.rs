//! Plain-old-data header layouts for the two object-file variants, grounded
//! on `agausmann-alpha/codegen/src/elf64.rs`'s `FileHeader`/`SectionHeader`
//! struct shapes. The 64-bit variant keeps the real ELF64 field order
//! (naturally padding-free); the 128-bit variant reorders address-sized
//! fields to the front of each struct — and adds an explicit trailing pad
//! field where needed — so that widening every address field to `u128`
//! still produces a `Pod`-safe, gap-free layout.

use bytemuck::{Pod, Zeroable};

pub const EI_NIDENT: usize = 16;

// ---------------------------------------------------------------- 64-bit --

#[derive(Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct FileHeader64 {
    pub e_ident: [u8; EI_NIDENT],
    pub e_type: u16,
    pub e_machine: u16,
    pub e_version: u32,
    pub e_entry: u64,
    pub e_phoff: u64,
    pub e_shoff: u64,
    pub e_flags: u32,
    pub e_ehsize: u16,
    pub e_phentsize: u16,
    pub e_phnum: u16,
    pub e_shentsize: u16,
    pub e_shnum: u16,
    pub e_shstrndx: u16,
}

#[derive(Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct SectionHeader64 {
    pub sh_name: u32,
    pub sh_type: u32,
    pub sh_flags: u64,
    pub sh_addr: u64,
    pub sh_offset: u64,
    pub sh_size: u64,
    pub sh_link: u32,
    pub sh_info: u32,
    pub sh_addralign: u64,
    pub sh_entsize: u64,
}

#[derive(Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct ProgramHeader64 {
    pub p_type: u32,
    pub p_flags: u32,
    pub p_offset: u64,
    pub p_vaddr: u64,
    pub p_paddr: u64,
    pub p_filesz: u64,
    pub p_memsz: u64,
    pub p_align: u64,
}

#[derive(Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct SymbolEntry64 {
    pub st_name: u32,
    pub st_info: u8,
    pub st_other: u8,
    pub st_shndx: u16,
    pub st_value: u64,
    pub st_size: u64,
}

// --------------------------------------------------------------- 128-bit --

#[derive(Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct FileHeader128 {
    pub e_ident: [u8; EI_NIDENT],
    pub e_entry: u128,
    pub e_phoff: u128,
    pub e_shoff: u128,
    pub e_type: u16,
    pub e_machine: u16,
    pub e_version: u32,
    pub e_flags: u32,
    pub e_ehsize: u16,
    pub e_phentsize: u16,
    pub e_phnum: u16,
    pub e_shentsize: u16,
    pub e_shnum: u16,
    pub e_shstrndx: u16,
    _pad: u64,
}

#[derive(Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct SectionHeader128 {
    pub sh_flags: u128,
    pub sh_addr: u128,
    pub sh_offset: u128,
    pub sh_size: u128,
    pub sh_addralign: u128,
    pub sh_entsize: u128,
    pub sh_name: u32,
    pub sh_type: u32,
    pub sh_link: u32,
    pub sh_info: u32,
}

#[derive(Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct ProgramHeader128 {
    pub p_offset: u128,
    pub p_vaddr: u128,
    pub p_paddr: u128,
    pub p_filesz: u128,
    pub p_memsz: u128,
    pub p_align: u128,
    pub p_type: u32,
    pub p_flags: u32,
    _pad: u64,
}

#[derive(Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct SymbolEntry128 {
    pub st_value: u128,
    pub st_size: u128,
    pub st_name: u32,
    pub st_info: u8,
    pub st_other: u8,
    pub st_shndx: u16,
    _pad: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_sizes_are_padding_free() {
        assert_eq!(std::mem::size_of::<FileHeader64>(), 64);
        assert_eq!(std::mem::size_of::<SectionHeader64>(), 64);
        assert_eq!(std::mem::size_of::<ProgramHeader64>(), 56);
        assert_eq!(std::mem::size_of::<SymbolEntry64>(), 24);

        assert_eq!(std::mem::size_of::<FileHeader128>(), 96);
        assert_eq!(std::mem::size_of::<SectionHeader128>(), 112);
        assert_eq!(std::mem::size_of::<ProgramHeader128>(), 112);
        assert_eq!(std::mem::size_of::<SymbolEntry128>(), 48);
    }
}
