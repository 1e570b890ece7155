//! Load/store family (spec §4.5). Ported from
//! `original_source/src/opcodes.cpp`'s `load_helper`/`store_helper`: loads
//! take `addr_reg, [imm], dst_reg` (the offset sits between the two
//! registers), stores take `src_reg, addr_reg, [imm]`.
//!
//! Open question (spec §9): the source disagrees with itself on `lq`/`sq`'s
//! operand-to-register mapping. Frozen here to match the rest of the
//! load/store family's contract: `rs1` is always the address register
//! (`dst` for loads' destination-as-base idiom this assembler uses, `src`
//! named first in the mnemonic for stores), consistent across every width.

use crate::errors::AssemblyError;
use crate::instruction::{Instruction32, RV32I_LOAD, RV32I_STORE};
use crate::token::TokenType;

use super::{read_const, read_reg};
use crate::assembler::Driver;

fn optional_imm(driver: &mut Driver) -> Result<i32, AssemblyError> {
    if driver.peek_is(TokenType::Constant) || driver.peek_is(TokenType::Operator) {
        Ok(read_const(driver)? as i32)
    } else {
        Ok(0)
    }
}

fn load(driver: &mut Driver, funct3: u32) -> Result<Vec<Instruction32>, AssemblyError> {
    let addr_reg = read_reg(driver)?;
    let imm = optional_imm(driver)?;
    let dst = read_reg(driver)?;
    Ok(vec![Instruction32::itype(RV32I_LOAD, dst, funct3, addr_reg, imm)])
}

fn store(driver: &mut Driver, funct3: u32) -> Result<Vec<Instruction32>, AssemblyError> {
    let src = read_reg(driver)?;
    let addr_reg = read_reg(driver)?;
    let imm = optional_imm(driver)?;
    Ok(vec![Instruction32::stype(RV32I_STORE, funct3, addr_reg, src, imm)])
}

pub fn lb(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    load(d, 0)
}
pub fn lh(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    load(d, 1)
}
pub fn lw(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    load(d, 2)
}
pub fn ld(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    load(d, 3)
}
pub fn lbu(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    load(d, 4)
}
pub fn lhu(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    load(d, 5)
}
pub fn lwu(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    load(d, 6)
}
/// 128-bit load, reusing the family's last free `funct3` slot.
pub fn lq(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    load(d, 7)
}

pub fn sb(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    store(d, 0)
}
pub fn sh(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    store(d, 1)
}
pub fn sw(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    store(d, 2)
}
pub fn sd(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    store(d, 3)
}
/// 128-bit store, reusing the family's last free `funct3` slot.
pub fn sq(d: &mut Driver) -> Result<Vec<Instruction32>, AssemblyError> {
    store(d, 4)
}
