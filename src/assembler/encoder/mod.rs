//! The opcode table (spec §4.5): a name → handler mapping ported from
//! `original_source/src/opcodes.cpp` and `opcode_list.cpp`. Each handler is a
//! plain function pointer taking the driver and returning the 32-bit words
//! it emits; handlers consume their own operand tokens and may schedule at
//! most one fix-up.

pub mod arithmetic;
pub mod control_flow;
pub mod immediate;
pub mod load_store;
pub mod system;

use crate::errors::AssemblyError;
use crate::instruction::Instruction32;
use crate::token::TokenType;

use super::Driver;

pub type OpcodeHandler = fn(&mut Driver) -> Result<Vec<Instruction32>, AssemblyError>;

pub(crate) fn read_reg(driver: &mut Driver) -> Result<u32, AssemblyError> {
    let tok = driver.expect(TokenType::Register)?;
    Ok(tok.register().expect("Register token always carries a register") as u32)
}

pub(crate) fn read_label(driver: &mut Driver) -> Result<String, AssemblyError> {
    let tok = driver.expect(TokenType::Symbol)?;
    Ok(tok.value)
}

pub(crate) fn read_const(driver: &mut Driver) -> Result<i64, AssemblyError> {
    Ok(crate::token::constant_fold::fold_constant(driver)? as u64 as i64)
}

pub(crate) fn read_const128(driver: &mut Driver) -> Result<u128, AssemblyError> {
    crate::token::constant_fold::fold_constant(driver)
}

/// True if `imm` fits in a signed 12-bit field (spec §4.5's I-type bounds
/// check).
pub(crate) fn fits_signed_12(imm: i64) -> bool {
    (-2048..2048).contains(&imm)
}

pub(crate) fn low12(imm: i64) -> i64 {
    let v = (imm as i32) & 0xFFF;
    ((v << 20) >> 20) as i64
}

/// `(imm + low12(imm)) >> 12` — the sign-correcting carry the LUI/ADDI split
/// needs when the low 12 bits are themselves negative (spec §4.5's LI/LA
/// lowering, ported from `original_source/src/opcodes.cpp`).
pub(crate) fn hi20(imm: i64) -> i64 {
    (imm.wrapping_add(low12(imm))) >> 12
}

pub fn lookup_opcode(name: &str) -> Option<OpcodeHandler> {
    Some(match name {
        "li" => immediate::li,
        "set" => immediate::set,
        "la" => control_flow::la,

        "lb" => load_store::lb,
        "lh" => load_store::lh,
        "lw" => load_store::lw,
        "ld" => load_store::ld,
        "lq" => load_store::lq,
        "lbu" => load_store::lbu,
        "lhu" => load_store::lhu,
        "lwu" => load_store::lwu,
        "sb" => load_store::sb,
        "sh" => load_store::sh,
        "sw" => load_store::sw,
        "sd" => load_store::sd,
        "sq" => load_store::sq,

        "beq" => control_flow::beq,
        "bne" => control_flow::bne,
        "blt" => control_flow::blt,
        "bge" => control_flow::bge,
        "bltu" => control_flow::bltu,
        "bgeu" => control_flow::bgeu,
        "jmp" => control_flow::jmp,
        "call" => control_flow::call,
        "jal" => control_flow::jal,
        "jalr" => control_flow::jalr,
        "ret" => control_flow::ret,
        "farcall" => control_flow::farcall,

        "add" => arithmetic::add,
        "sub" => arithmetic::sub,
        "sll" => arithmetic::sll,
        "slt" => arithmetic::slt,
        "sltu" => arithmetic::sltu,
        "srl" => arithmetic::srl,
        "sra" => arithmetic::sra,
        "and" => arithmetic::and,
        "or" => arithmetic::or,
        "xor" => arithmetic::xor,
        "addw" => arithmetic::addw,
        "subw" => arithmetic::subw,
        "addd" => arithmetic::addd,
        "subd" => arithmetic::subd,

        "mul" => arithmetic::mul,
        "div" => arithmetic::div,
        "divu" => arithmetic::divu,
        "rem" => arithmetic::rem,
        "remu" => arithmetic::remu,
        "mulw" => arithmetic::mulw,
        "divw" => arithmetic::divw,
        "divuw" => arithmetic::divuw,
        "remw" => arithmetic::remw,
        "remuw" => arithmetic::remuw,
        "muld" => arithmetic::muld,
        "divd" => arithmetic::divd,
        "divud" => arithmetic::divud,
        "remd" => arithmetic::remd,
        "remud" => arithmetic::remud,

        "syscall" => system::syscall,
        "ecall" => system::ecall,
        "ebreak" => system::ebreak,
        "wfi" => system::wfi,
        "system" => system::system,

        _ => return None,
    })
}
