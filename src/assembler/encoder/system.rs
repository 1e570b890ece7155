//! The system instruction family (spec §4.5): `syscall/ecall/ebreak/wfi/system`.
//! Ported from `original_source/src/opcodes.cpp`.

use crate::errors::AssemblyError;
use crate::instruction::{Instruction32, RV32I_OP_IMM, RV32I_SYSTEM};

use super::read_const;
use crate::assembler::Driver;

/// `SYSCALL imm` lowers to `ADDI a7, x0, imm` followed by `ECALL` (spec §4.5).
pub fn syscall(driver: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    let imm = read_const(driver)?;
    Ok(vec![
        Instruction32::itype(RV32I_OP_IMM, 17, 0, 0, imm as i32),
        Instruction32::itype(RV32I_SYSTEM, 0, 0, 0, 0),
    ])
}

pub fn ecall(_driver: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    Ok(vec![Instruction32::itype(RV32I_SYSTEM, 0, 0, 0, 0)])
}

pub fn ebreak(_driver: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    Ok(vec![Instruction32::itype(RV32I_SYSTEM, 0, 0, 0, 1)])
}

pub fn wfi(_driver: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    Ok(vec![Instruction32::itype(RV32I_SYSTEM, 0, 0, 0, 0x105)])
}

/// `SYSTEM f3, imm`: a raw escape hatch into the SYSTEM opcode.
pub fn system(driver: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    let funct3 = read_const(driver)?;
    let imm = read_const(driver)?;
    Ok(vec![Instruction32::itype(
        RV32I_SYSTEM,
        0,
        funct3 as u32,
        0,
        imm as i32,
    )])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::AssembleOptions;
    use crate::file_reader::MockFileReader;

    fn handle(src: &str, f: super::super::OpcodeHandler) -> Vec<Instruction32> {
        let raw = crate::token::raw_split::split(src).unwrap();
        let tokens = crate::token::classify::classify(&raw).unwrap();
        let mut d = Driver::for_tokens(tokens, AssembleOptions::default(), Box::new(MockFileReader::default()));
        f(&mut d).unwrap()
    }

    #[test]
    fn syscall_lowers_to_addi_a7_then_ecall() {
        let words = handle("5", syscall);
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].rd(), 17);
        assert_eq!(words[0].itype_imm(), 5);
        assert_eq!(words[1].0, Instruction32::itype(RV32I_SYSTEM, 0, 0, 0, 0).0);
    }

    #[test]
    fn ebreak_sets_imm_one() {
        let words = handle("", ebreak);
        assert_eq!(words[0].itype_imm(), 1);
    }

    #[test]
    fn wfi_sets_imm_0x105() {
        let words = handle("", wfi);
        assert_eq!(words[0].itype_imm(), 0x105);
    }
}
