//! Register-register and register-immediate arithmetic/logical instructions,
//! plus the multiplicative family (spec §4.5). Ported from
//! `original_source/src/opcodes.cpp`.

use crate::errors::AssemblyError;
use crate::instruction::{
    Instruction32, MULDIV_FUNCT7, RV32I_OP, RV32I_OP_IMM, RV64I_OP32, RV64I_OP_IMM32, SUB_FUNCT7,
};
use crate::token::TokenType;

use super::{fits_signed_12, read_const, read_reg};
use crate::assembler::Driver;

/// A single opcode mnemonic covers both the register-register and
/// register-immediate forms, distinguished by whether a third register or a
/// constant follows (spec §4.5): "a single-opcode helper takes `funct3` and
/// an opcode-family parameter".
fn binop(
    driver: &mut Driver,
    r_opcode: u32,
    i_opcode: u32,
    funct3: u32,
    funct7: u32,
) -> Result<Vec<Instruction32>, AssemblyError> {
    let rd = read_reg(driver)?;
    let rs1 = read_reg(driver)?;
    if driver.peek_is(TokenType::Register) {
        let rs2 = read_reg(driver)?;
        return Ok(vec![Instruction32::rtype(r_opcode, rd, funct3, rs1, rs2, funct7)]);
    }
    let line = driver.current_line();
    let imm = read_const(driver)?;
    if !fits_signed_12(imm) {
        return Err(AssemblyError::RangeError {
            line,
            text: imm.to_string(),
            reason: "immediate does not fit in a signed 12-bit field".to_string(),
        });
    }
    Ok(vec![Instruction32::itype(i_opcode, rd, funct3, rs1, imm as i32)])
}

pub fn add(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    binop(d, RV32I_OP, RV32I_OP_IMM, 0, 0)
}
pub fn sub(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    // sub has no register-immediate form; the binop helper's I-path is
    // unreachable for it in practice, but sharing it keeps one bounds-check
    // path for the whole family.
    binop(d, RV32I_OP, RV32I_OP_IMM, 0, SUB_FUNCT7)
}
pub fn sll(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    binop(d, RV32I_OP, RV32I_OP_IMM, 1, 0)
}
pub fn slt(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    binop(d, RV32I_OP, RV32I_OP_IMM, 2, 0)
}
pub fn sltu(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    binop(d, RV32I_OP, RV32I_OP_IMM, 3, 0)
}
pub fn xor(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    binop(d, RV32I_OP, RV32I_OP_IMM, 4, 0)
}
pub fn srl(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    binop(d, RV32I_OP, RV32I_OP_IMM, 5, 0)
}
pub fn sra(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    binop(d, RV32I_OP, RV32I_OP_IMM, 5, SUB_FUNCT7)
}
pub fn or(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    binop(d, RV32I_OP, RV32I_OP_IMM, 6, 0)
}
pub fn and(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    binop(d, RV32I_OP, RV32I_OP_IMM, 7, 0)
}

// 32-bit-width variants (`*w`), using the RV64I OP-32/OP-IMM-32 family.
pub fn addw(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    binop(d, RV64I_OP32, RV64I_OP_IMM32, 0, 0)
}
pub fn subw(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    binop(d, RV64I_OP32, RV64I_OP_IMM32, 0, SUB_FUNCT7)
}

// 64-bit-width variants (`*d`), using the 128-bit-extension OP-64/OP-IMM-64
// family (spec §1 treats the 128-bit address space as in-scope; this
// assembler's instruction set extends the width-variant convention one step
// further, the same way RV64I extends RV32I with `*w`).
pub fn addd(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    binop(d, crate::instruction::RV128I_OP64, crate::instruction::RV128I_OP_IMM64, 0, 0)
}
pub fn subd(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    binop(d, crate::instruction::RV128I_OP64, crate::instruction::RV128I_OP_IMM64, 0, SUB_FUNCT7)
}

fn muldiv(driver: &mut Driver, opcode: u32, funct3: u32) -> Result<Vec<Instruction32>, AssemblyError> {
    let rd = read_reg(driver)?;
    let rs1 = read_reg(driver)?;
    let rs2 = read_reg(driver)?;
    Ok(vec![Instruction32::rtype(opcode, rd, funct3, rs1, rs2, MULDIV_FUNCT7)])
}

pub fn mul(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    muldiv(d, RV32I_OP, 0)
}
pub fn div(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    muldiv(d, RV32I_OP, 4)
}
pub fn divu(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    muldiv(d, RV32I_OP, 5)
}
pub fn rem(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    muldiv(d, RV32I_OP, 6)
}
pub fn remu(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    muldiv(d, RV32I_OP, 7)
}

// 32-bit-width variants (`*w`), using the RV64I OP-32 family.
pub fn mulw(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    muldiv(d, RV64I_OP32, 0)
}
pub fn divw(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    muldiv(d, RV64I_OP32, 4)
}
pub fn divuw(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    muldiv(d, RV64I_OP32, 5)
}
pub fn remw(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    muldiv(d, RV64I_OP32, 6)
}
pub fn remuw(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    muldiv(d, RV64I_OP32, 7)
}

// 64-bit-width variants (`*d`), using the 128-bit-extension OP-64 family —
// the same one step further that `addd`/`subd` take above.
pub fn muld(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    muldiv(d, crate::instruction::RV128I_OP64, 0)
}
pub fn divd(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    muldiv(d, crate::instruction::RV128I_OP64, 4)
}
pub fn divud(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    muldiv(d, crate::instruction::RV128I_OP64, 5)
}
pub fn remd(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    muldiv(d, crate::instruction::RV128I_OP64, 6)
}
pub fn remud(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    muldiv(d, crate::instruction::RV128I_OP64, 7)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::AssembleOptions;
    use crate::file_reader::MockFileReader;

    fn handle(src: &str, f: super::super::OpcodeHandler) -> Instruction32 {
        let raw = crate::token::raw_split::split(src).unwrap();
        let tokens = crate::token::classify::classify(&raw).unwrap();
        let mut d = Driver::for_tokens(tokens, AssembleOptions::default(), Box::new(MockFileReader::default()));
        f(&mut d).unwrap().remove(0)
    }

    #[test]
    fn register_register_form_uses_op_opcode() {
        let i = handle("a0 a1 a2", add);
        assert_eq!(i.opcode(), RV32I_OP);
        assert_eq!(i.rd(), 10);
        assert_eq!(i.rs1(), 11);
        assert_eq!(i.rs2(), 12);
    }

    #[test]
    fn register_immediate_form_uses_op_imm_opcode() {
        let i = handle("a0 a1 5", add);
        assert_eq!(i.opcode(), RV32I_OP_IMM);
        assert_eq!(i.itype_imm(), 5);
    }

    #[test]
    fn sub_sets_sub_funct7() {
        let i = handle("a0 a1 a2", sub);
        assert_eq!(i.funct7(), SUB_FUNCT7);
    }

    #[test]
    fn out_of_range_immediate_is_rejected() {
        let raw = crate::token::raw_split::split("a0 a1 100000").unwrap();
        let tokens = crate::token::classify::classify(&raw).unwrap();
        let mut d = Driver::for_tokens(tokens, AssembleOptions::default(), Box::new(MockFileReader::default()));
        assert!(add(&mut d).is_err());
    }

    #[test]
    fn mul_sets_muldiv_funct7() {
        let i = handle("a0 a1 a2", mul);
        assert_eq!(i.funct7(), MULDIV_FUNCT7);
        assert_eq!(i.funct3(), 0);
    }

    #[test]
    fn mulw_uses_op32_opcode() {
        let i = handle("a0 a1 a2", mulw);
        assert_eq!(i.opcode(), RV64I_OP32);
        assert_eq!(i.funct7(), MULDIV_FUNCT7);
    }

    #[test]
    fn remud_uses_op64_opcode() {
        let i = handle("a0 a1 a2", remud);
        assert_eq!(i.opcode(), crate::instruction::RV128I_OP64);
        assert_eq!(i.funct3(), 7);
    }
}
