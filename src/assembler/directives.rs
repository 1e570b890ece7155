//! Directive dispatch (spec §4.7), ported from `original_source/src/directive.cpp`.

use crate::errors::AssemblyError;
use crate::token::{Token, TokenType};

use super::symbol_table::SymbolKind;
use super::Driver;

/// Dispatches a single directive token, consuming whatever additional tokens
/// its grammar requires.
pub fn dispatch(driver: &mut Driver, tok: &Token) -> Result<(), AssemblyError> {
    match tok.value.as_str() {
        ".align" => align(driver, tok),
        ".global" => global(driver, tok),
        ".type" => type_(driver, tok),
        ".size" => size(driver, tok),
        ".string" => string(driver, tok, true),
        ".ascii" => string(driver, tok, false),
        ".strlen" => strlen(driver, tok),
        ".section" => section(driver, tok),
        ".org" => org(driver, tok),
        ".execonly" => {
            driver.sections.get_mut(driver.current_section()).attrs.execonly = true;
            Ok(())
        }
        ".readonly" => {
            driver.sections.get_mut(driver.current_section()).attrs.readonly = true;
            Ok(())
        }
        ".endfunc" => endfunc(driver, tok),
        ".finish_labels" => driver.flush_labels(),
        ".include" => include(driver, tok),
        name => Err(AssemblyError::UnknownDirective {
            line: tok.line,
            name: name.to_string(),
        }),
    }
}

fn constant_arg(driver: &mut Driver, tok: &Token) -> Result<u128, AssemblyError> {
    crate::token::constant_fold::fold_constant(driver).map_err(|e| match e {
        AssemblyError::Parse { expected, .. } => AssemblyError::Parse {
            line: tok.line,
            text: tok.value.clone(),
            expected,
        },
        other => other,
    })
}

fn symbol_arg(driver: &mut Driver, tok: &Token) -> Result<String, AssemblyError> {
    let name = driver.expect(TokenType::Symbol)?;
    let _ = tok;
    Ok(name.value)
}

fn align(driver: &mut Driver, tok: &Token) -> Result<(), AssemblyError> {
    let n = constant_arg(driver, tok)?;
    driver.align(n as u64);
    Ok(())
}

fn global(driver: &mut Driver, tok: &Token) -> Result<(), AssemblyError> {
    let name = symbol_arg(driver, tok)?;
    driver.mark_global(&name);
    Ok(())
}

fn type_(driver: &mut Driver, tok: &Token) -> Result<(), AssemblyError> {
    let name = symbol_arg(driver, tok)?;
    let kind_tok = driver.expect(TokenType::Symbol)?;
    let kind = match kind_tok.value.as_str() {
        "object" => SymbolKind::Object,
        "func" | "function" => SymbolKind::Function,
        other => {
            return Err(AssemblyError::Parse {
                line: kind_tok.line,
                text: other.to_string(),
                expected: "object, func, or function",
            })
        }
    };
    driver.symbols.set_kind(&name, kind);
    Ok(())
}

/// `.size sym`: reserves 4 bytes and schedules a closure writing the byte
/// distance between this point and `sym`'s address. Frozen per
/// `original_source/src/directive.cpp`: when `sym` precedes the `.size` slot
/// (the common case — closing a data blob or function body), the length is
/// measured from `sym` up to the slot's own position, `slot.addr - sym.addr`;
/// when `sym` is a forward reference, the length is measured from just past
/// the 4-byte slot to `sym`, `sym.addr - 4 - slot.addr`.
fn size(driver: &mut Driver, tok: &Token) -> Result<(), AssemblyError> {
    let name = symbol_arg(driver, tok)?;
    let section = driver.current_section();
    let offset = driver.current_offset();
    driver.emit(super::section::OutputKind::Data, &0u32.to_le_bytes());
    driver.schedule(
        name.clone(),
        tok.line,
        Box::new(move |sections, resolved| {
            let slot_addr = sections.get(section).address_at(offset);
            let sym_addr = sections.get(resolved.section).address_at(resolved.offset);
            let len = if sym_addr < slot_addr {
                slot_addr - sym_addr
            } else {
                sym_addr - 4 - slot_addr
            } as u32;
            sections.get_mut(section).patch_word(offset, |_| len)
        }),
    );
    Ok(())
}

fn string(driver: &mut Driver, _tok: &Token, nul_terminated: bool) -> Result<(), AssemblyError> {
    let s = driver.expect(TokenType::String)?;
    driver.flush_labels()?;
    let mut bytes = s.value.into_bytes();
    if nul_terminated {
        bytes.push(0);
    }
    driver.emit(super::section::OutputKind::Data, &bytes);
    Ok(())
}

fn strlen(driver: &mut Driver, _tok: &Token) -> Result<(), AssemblyError> {
    let s = driver.expect(TokenType::String)?;
    driver.emit(
        super::section::OutputKind::Data,
        &(s.value.len() as u32).to_le_bytes(),
    );
    Ok(())
}

fn section(driver: &mut Driver, tok: &Token) -> Result<(), AssemblyError> {
    let name_tok = driver.expect(TokenType::Directive).map_err(|_| AssemblyError::Parse {
        line: tok.line,
        text: tok.value.clone(),
        expected: "a .section-style name",
    })?;
    driver.flush_labels()?;
    driver.set_section(&name_tok.value);
    Ok(())
}

fn org(driver: &mut Driver, tok: &Token) -> Result<(), AssemblyError> {
    let addr = constant_arg(driver, tok)?;
    let section_id = driver.current_section();
    if driver.sections.get(section_id).size() != 0 {
        return Err(AssemblyError::Structural {
            reason: format!(
                "\".org\" on line {} applies to a non-empty section",
                tok.line
            ),
        });
    }
    driver.sections.get_mut(section_id).set_base_address(addr);
    Ok(())
}

fn endfunc(driver: &mut Driver, tok: &Token) -> Result<(), AssemblyError> {
    let name = symbol_arg(driver, tok)?;
    let resolved = driver
        .symbols
        .resolve(&name)
        .ok_or_else(|| AssemblyError::UnresolvedSymbol { name: name.clone() })?;
    let section = driver.current_section();
    let here = driver.current_offset();
    let size = if resolved.section == section {
        here.saturating_sub(resolved.offset) as u32
    } else {
        0
    };
    driver.symbols.set_size(&name, size as u64);
    driver.symbols.set_kind(&name, SymbolKind::Function);
    Ok(())
}

fn include(driver: &mut Driver, _tok: &Token) -> Result<(), AssemblyError> {
    let path_tok = driver.expect(TokenType::String)?;
    driver.include_file(&path_tok.value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::AssembleOptions;
    use crate::file_reader::MockFileReader;

    fn run(src: &str) -> Driver {
        let raw = crate::token::raw_split::split(src).unwrap();
        let tokens = crate::token::classify::classify(&raw).unwrap();
        let mut d = Driver::for_tokens(tokens, AssembleOptions::default(), Box::new(MockFileReader::default()));
        d.run().unwrap();
        d
    }

    #[test]
    fn align_pads_current_section() {
        let d = run(".string \"hi\"\n.align 4");
        // "hi" + NUL terminator is 3 bytes; aligning to 4 pads one more zero.
        assert_eq!(d.sections.get(d.current_section()).bytes, vec![b'h', b'i', 0, 0]);
    }

    #[test]
    fn global_marks_symbol() {
        let d = run("foo:\n.global foo\n.finish_labels");
        assert!(d.globals.contains("foo"));
    }

    #[test]
    fn string_emits_bytes_with_nul() {
        let d = run(".string \"hi\"");
        assert_eq!(d.sections.get(d.current_section()).bytes, vec![b'h', b'i', 0]);
    }

    #[test]
    fn ascii_emits_bytes_without_nul() {
        let d = run(".ascii \"hi\"");
        assert_eq!(d.sections.get(d.current_section()).bytes, vec![b'h', b'i']);
    }

    #[test]
    fn org_on_nonempty_section_fails() {
        let raw = crate::token::raw_split::split(".string \"x\"\n.org 0x1000").unwrap();
        let tokens = crate::token::classify::classify(&raw).unwrap();
        let mut d = Driver::for_tokens(tokens, AssembleOptions::default(), Box::new(MockFileReader::default()));
        assert!(d.run().is_err());
    }

    #[test]
    fn section_switches_current_section() {
        let d = run(".section .data\n.string \"x\"");
        assert_eq!(d.sections.get(d.current_section()).name(), ".data");
    }
}
