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

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as clap_parser;

use rvasm::assembler::AssembleOptions;
use rvasm::file_reader::AsmFileReader;
use rvasm::{assemble, build_object_64, build_object_128, raw_binary};

#[derive(clap_parser)]
#[clap(version = "0.1.0", author = "Connor Nolan")]
struct Opts {
    /// Source files, assembled as one unit in the order given.
    #[clap(required = true)]
    infiles: Vec<PathBuf>,

    /// Output path; `<outfile>`, `<outfile>64`, `<outfile>128`, and
    /// `<outfile>.bin` are all written.
    outfile: PathBuf,

    #[clap(long, default_value_t = 0x100000)]
    base_address: u128,

    #[clap(long)]
    no_page_separation: bool,

    #[clap(long, default_value = "_start")]
    entry: String,

    /// Narrate each label binding as it lands in the symbol table.
    #[clap(long)]
    verbose_labels: bool,

    /// Print a CODE/DATA/RESV summary and program-header flags per section.
    #[clap(long)]
    verbose_sections: bool,
}

fn main() -> Result<()> {
    let opts: Opts = Opts::parse();

    let mut source = String::new();
    for path in &opts.infiles {
        let chunk = fs::read_to_string(path)
            .with_context(|| format!("failed to read input file: {}", path.display()))?;
        source.push_str(&chunk);
        source.push('\n');
    }

    let base_path = opts.infiles[0].parent().unwrap_or_else(|| std::path::Path::new("."));
    let options = AssembleOptions {
        base_address: opts.base_address,
        page_separation: !opts.no_page_separation,
        entry_symbol: opts.entry,
    };

    let image = assemble(&source, base_path, options, Box::new(AsmFileReader))?;

    if opts.verbose_labels {
        for (name, entry) in image.symbols.iter() {
            println!(
                "label {name} bound at section {} offset {:#x}",
                entry.section, entry.offset
            );
        }
    }

    if opts.verbose_sections {
        for section in image.sections.iter() {
            println!(
                "Section {} has: {}{}{}",
                section.name(),
                if section.attrs.code { "CODE " } else { "" },
                if section.attrs.data { "DATA " } else { "" },
                if section.attrs.resv { "RESV " } else { "" },
            );
            if section.attrs.code && section.attrs.data {
                eprintln!("WARNING: there is data in executable section {}", section.name());
            }
        }
    }

    let outfile = &opts.outfile;
    fs::write(outfile, build_object_64(&image))
        .with_context(|| format!("failed to write {}", outfile.display()))?;

    let mut out64 = outfile.clone().into_os_string();
    out64.push("64");
    fs::write(&out64, build_object_64(&image))
        .with_context(|| format!("failed to write {}", PathBuf::from(&out64).display()))?;

    let mut out128 = outfile.clone().into_os_string();
    out128.push("128");
    fs::write(&out128, build_object_128(&image))
        .with_context(|| format!("failed to write {}", PathBuf::from(&out128).display()))?;

    let mut outbin = outfile.clone().into_os_string();
    outbin.push(".bin");
    fs::write(&outbin, raw_binary(&image))
        .with_context(|| format!("failed to write {}", PathBuf::from(&outbin).display()))?;

    println!("Successfully assembled to {}", outfile.display());

    Ok(())
}
