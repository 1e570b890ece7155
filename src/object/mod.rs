//! The ELF-shaped object writer (spec §4.8). Struct layout grounded on
//! `agausmann-alpha/codegen/src/elf64.rs`'s `bytemuck`-based header structs;
//! section/string/symbol table construction ported from
//! `original_source/src/elfwriter.cpp`.

pub mod repr;
pub mod writer;

pub use writer::{write_elf, AddressWidth};

pub const SHT_STRTAB: u32 = 3;
pub const SHT_SYMTAB: u32 = 2;
pub const PT_LOAD: u32 = 1;
pub const PF_X: u32 = 1;
pub const PF_W: u32 = 2;
pub const PF_R: u32 = 4;
pub const STB_LOCAL: u8 = 0;
pub const STB_GLOBAL: u8 = 1;
pub const STT_NOTYPE: u8 = 0;
pub const STT_OBJECT: u8 = 1;
pub const STT_FUNC: u8 = 2;
pub const SHN_UNDEF: u32 = 0;
#[allow(dead_code)]
pub const SHN_ABS: u32 = 0xFFF1;

pub const MAGIC: [u8; 4] = [0x7F, b'E', b'L', b'F'];
pub const ELFDATA2LSB: u8 = 1;
pub const EV_CURRENT: u8 = 1;
pub const ELFOSABI_STANDALONE: u8 = 255;
pub const ET_EXEC: u16 = 2;
pub const EM_RISCV: u16 = 243;
