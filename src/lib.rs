/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

pub mod address;
pub mod assembler;
pub mod errors;
pub mod file_reader;
pub mod instruction;
pub mod object;
pub mod token;

use std::path::Path;

use anyhow::{Context, Result};

use assembler::{assemble_source, AssembleOptions, AssembledImage};
use file_reader::FileReader;
use object::{write_elf, AddressWidth};

/// Runs the full pipeline (tokenize, drive, finish) over `source`, producing
/// a resolved image ready to hand to the object writer or to dump as a raw
/// `.text` payload.
pub fn assemble(
    source: &str,
    base_path: &Path,
    options: AssembleOptions,
    file_reader: Box<dyn FileReader>,
) -> Result<AssembledImage> {
    assemble_source(source, base_path, options, file_reader).context("assembly failed")
}

/// Builds the 64-bit-address ELF-shaped object for an assembled image.
pub fn build_object_64(image: &AssembledImage) -> Vec<u8> {
    write_elf(image, AddressWidth::Bits64)
}

/// Builds the 128-bit-address ELF-shaped object for an assembled image.
pub fn build_object_128(image: &AssembledImage) -> Vec<u8> {
    write_elf(image, AddressWidth::Bits128)
}

/// The raw concatenated bytes of every section, in insertion order — the
/// flat binary dump spec §6 asks for alongside the two object variants.
pub fn raw_binary(image: &AssembledImage) -> Vec<u8> {
    let mut out = Vec::new();
    for section in image.sections.iter() {
        out.extend_from_slice(&section.bytes);
    }
    out
}
