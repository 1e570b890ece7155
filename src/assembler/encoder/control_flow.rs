//! Branches, jumps, and label-relative addressing (spec §4.5). Ported from
//! `original_source/src/opcodes.cpp`'s branch/jump/`la`/`farcall` handlers.

use crate::errors::AssemblyError;
use crate::instruction::{
    Instruction32, RV32I_AUIPC, RV32I_BRANCH, RV32I_JAL, RV32I_JALR, RV32I_LUI,
};

use super::{hi20, low12, read_label, read_reg};
use crate::assembler::Driver;

fn branch(driver: &mut Driver, funct3: u32) -> Result<Vec<Instruction32>, AssemblyError> {
    let rs1 = read_reg(driver)?;
    let rs2 = read_reg(driver)?;
    let label = read_label(driver)?;
    let line = driver.current_line();
    let section = driver.current_section();
    let offset = driver.current_offset();

    driver.schedule(
        label,
        line,
        Box::new(move |sections, resolved| {
            let here = sections.get(section).address_at(offset);
            let target = sections.get(resolved.section).address_at(resolved.offset);
            let diff = target.wrapping_sub(here) as i128 as i32;
            sections
                .get_mut(section)
                .patch_word(offset, |word| {
                    let mut i = Instruction32(word);
                    i.set_btype_imm(diff);
                    i.0
                })
        }),
    );

    Ok(vec![Instruction32::btype(RV32I_BRANCH, funct3, rs1, rs2, 0)])
}

pub fn beq(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    branch(d, 0)
}
pub fn bne(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    branch(d, 1)
}
pub fn blt(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    branch(d, 4)
}
pub fn bge(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    branch(d, 5)
}
pub fn bltu(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    branch(d, 6)
}
pub fn bgeu(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    branch(d, 7)
}

fn jump(driver: &mut Driver, link: u32) -> Result<Vec<Instruction32>, AssemblyError> {
    let label = read_label(driver)?;
    let line = driver.current_line();
    let section = driver.current_section();
    let offset = driver.current_offset();

    driver.schedule(
        label.clone(),
        line,
        Box::new(move |sections, resolved| {
            let here = sections.get(section).address_at(offset);
            let target = sections.get(resolved.section).address_at(resolved.offset);
            let diff = target.wrapping_sub(here) as i128;
            if !(-(1i128 << 20)..(1i128 << 20)).contains(&diff) {
                return Err(AssemblyError::RangeError {
                    line,
                    text: label.clone(),
                    reason: "jump target out of signed 21-bit range".to_string(),
                });
            }
            sections.get_mut(section).patch_word(offset, |word| {
                let mut i = Instruction32(word);
                i.set_jtype_imm(diff as i32);
                i.0
            })
        }),
    );

    Ok(vec![Instruction32::jtype(RV32I_JAL, link, 0)])
}

pub fn jmp(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    jump(d, 0)
}
pub fn call(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    jump(d, 1)
}
pub fn jal(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    let rd = if driver_has_register(d) { read_reg(d)? } else { 1 };
    let label = read_label(d)?;
    let line = d.current_line();
    let section = d.current_section();
    let offset = d.current_offset();
    d.schedule(
        label.clone(),
        line,
        Box::new(move |sections, resolved| {
            let here = sections.get(section).address_at(offset);
            let target = sections.get(resolved.section).address_at(resolved.offset);
            let diff = target.wrapping_sub(here) as i128;
            if !(-(1i128 << 20)..(1i128 << 20)).contains(&diff) {
                return Err(AssemblyError::RangeError {
                    line,
                    text: label.clone(),
                    reason: "jump target out of signed 21-bit range".to_string(),
                });
            }
            sections.get_mut(section).patch_word(offset, |word| {
                let mut i = Instruction32(word);
                i.set_jtype_imm(diff as i32);
                i.0
            })
        }),
    );
    Ok(vec![Instruction32::jtype(RV32I_JAL, rd, 0)])
}

fn driver_has_register(d: &Driver) -> bool {
    d.peek_is(crate::token::TokenType::Register)
}

/// `JALR rs1[, rd]`: indirect jump, no scheduling (spec §4.5).
pub fn jalr(driver: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    let rs1 = read_reg(driver)?;
    let rd = if driver_has_register(driver) {
        read_reg(driver)?
    } else {
        1
    };
    Ok(vec![Instruction32::itype(RV32I_JALR, rd, 0, rs1, 0)])
}

/// `RET` lowers to `JALR x0, ra, 0`.
pub fn ret(_driver: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    Ok(vec![Instruction32::itype(RV32I_JALR, 0, 0, 1, 0)])
}

/// `LA rd, label` (spec §4.5): emits a two-word `AUIPC/ADDI` (or absolute
/// `LUI/ADDI`) pair, scheduled once the target address is known.
pub fn la(driver: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    let rd = read_reg(driver)?;
    let label = read_label(driver)?;
    let line = driver.current_line();
    let section = driver.current_section();
    let offset = driver.current_offset();

    driver.schedule(
        label,
        line,
        Box::new(move |sections, resolved| {
            let here = sections.get(section).address_at(offset);
            let target = sections.get(resolved.section).address_at(resolved.offset);
            let diff = target.wrapping_sub(here) as i128;
            if (i32::MIN as i128..=i32::MAX as i128).contains(&diff) {
                let diff = diff as i64;
                let hi = hi20(diff) as i32;
                let lo = low12(diff) as i32;
                sections.get_mut(section).patch_word(offset, |word| {
                    let mut i = Instruction32(word);
                    i.set_opcode(RV32I_AUIPC);
                    i.set_utype_imm(hi);
                    i.0
                })?;
                sections.get_mut(section).patch_word(offset + 4, |word| {
                    let mut i = Instruction32(word);
                    i.set_itype_imm(lo);
                    i.0
                })
            } else {
                let abs = target as i128 as i64;
                let hi = hi20(abs) as i32;
                let lo = low12(abs) as i32;
                sections.get_mut(section).patch_word(offset, |word| {
                    let mut i = Instruction32(word);
                    i.set_utype_imm(hi);
                    i.0
                })?;
                sections.get_mut(section).patch_word(offset + 4, |word| {
                    let mut i = Instruction32(word);
                    i.set_itype_imm(lo);
                    i.0
                })
            }
        }),
    );

    Ok(vec![
        Instruction32::utype(RV32I_LUI, rd, 0),
        Instruction32::itype(crate::instruction::RV32I_OP_IMM, rd, 0, rd, 0),
    ])
}

/// `FARCALL rtmp, label` (spec §4.5): a two-word `LUI/JALR` pair scheduled to
/// patch the absolute target address split across the upper 20 and lower 12
/// bits.
pub fn farcall(driver: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    let rtmp = read_reg(driver)?;
    let label = read_label(driver)?;
    let line = driver.current_line();
    let section = driver.current_section();
    let offset = driver.current_offset();

    driver.schedule(
        label,
        line,
        Box::new(move |sections, resolved| {
            let target = sections.get(resolved.section).address_at(resolved.offset) as i128 as i64;
            let hi = hi20(target) as i32;
            let lo = low12(target) as i32;
            sections.get_mut(section).patch_word(offset, |word| {
                let mut i = Instruction32(word);
                i.set_utype_imm(hi);
                i.0
            })?;
            sections.get_mut(section).patch_word(offset + 4, |word| {
                let mut i = Instruction32(word);
                i.set_itype_imm(lo);
                i.0
            })
        }),
    );

    Ok(vec![
        Instruction32::utype(RV32I_LUI, rtmp, 0),
        Instruction32::itype(RV32I_JALR, 1, 0, rtmp, 0),
    ])
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
        crate::assembler::finisher::finish(&mut d).unwrap();
        d
    }

    #[test]
    fn forward_branch_resolves_to_byte_distance() {
        let d = run("beq a0, a1, target\nli a0, 0\nli a0, 0\ntarget:\n.finish_labels");
        let bytes = &d.sections.get(d.current_section()).bytes;
        let word = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
        let i = Instruction32(word);
        // B-type immediate for a diff of 8 scatters imm[4:1]=0b0100 into bits[11:8].
        assert_eq!((i.0 >> 8) & 0xF, 0b0100);
    }

    #[test]
    fn ret_is_jalr_x0_ra_0() {
        let words = ret(&mut dummy_driver()).unwrap();
        assert_eq!(words[0].opcode(), RV32I_JALR);
        assert_eq!(words[0].rd(), 0);
        assert_eq!(words[0].rs1(), 1);
    }

    fn dummy_driver() -> Driver {
        Driver::for_tokens(vec![], AssembleOptions::default(), Box::new(MockFileReader::default()))
    }
}
