//! On-demand constant-expression folding (spec §4.3): invoked by opcode and
//! directive handlers wherever they expect a constant argument. Grammar:
//! `constant ( operator constant )*`, left-associative, no precedence.

use super::{Operator, TokenType};
use crate::assembler::Driver;
use crate::errors::AssemblyError;

fn apply(op: Operator, acc: u128, v: u128) -> u128 {
    match op {
        Operator::Add => acc.wrapping_add(v),
        Operator::Sub => acc.wrapping_sub(v),
        Operator::Mul => acc.wrapping_mul(v),
        Operator::Div => {
            if v == 0 {
                0
            } else {
                acc.wrapping_div(v)
            }
        }
        Operator::Mod => {
            if v == 0 {
                0
            } else {
                acc.wrapping_rem(v)
            }
        }
        Operator::And => acc & v,
        Operator::Or => acc | v,
        Operator::Xor => acc ^ v,
        Operator::Shl => acc.wrapping_shl(v as u32),
        Operator::Shr => acc.wrapping_shr(v as u32),
        Operator::Not => acc,
    }
}

/// Folds a constant expression starting at the driver's current cursor,
/// consuming tokens up to (not including) the first non-constant/non-operator
/// token, and returns the folded `u128` value.
pub fn fold_constant(driver: &mut Driver) -> Result<u128, AssemblyError> {
    let mut acc: u128 = 0;
    let mut pending_op: Option<Operator> = None;
    let mut negate_next = false;
    let mut seen_first = false;

    loop {
        let is_constant = driver.peek_is(TokenType::Constant);
        let is_operator = driver.peek_is(TokenType::Operator);
        if !is_constant && !is_operator {
            break;
        }
        let tok = driver.next().expect("peek confirmed a token is present");

        if is_operator {
            let op = tok.operator().expect("operator token carries an Operator payload");
            if op == Operator::Not {
                negate_next = !negate_next;
                continue;
            }
            if pending_op.is_some() {
                return Err(AssemblyError::Parse {
                    line: tok.line,
                    text: tok.value.clone(),
                    expected: "a constant to complete the pending operator",
                });
            }
            pending_op = Some(op);
            continue;
        }

        let raw = tok.u128().expect("constant token carries a u128 payload");
        let v = if negate_next { !raw } else { raw };
        negate_next = false;

        if !seen_first {
            acc = v;
            seen_first = true;
        } else if let Some(op) = pending_op.take() {
            acc = apply(op, acc, v);
        } else {
            return Err(AssemblyError::Parse {
                line: tok.line,
                text: tok.value.clone(),
                expected: "an operator between two constants",
            });
        }
    }

    if !seen_first {
        return Err(AssemblyError::Parse {
            line: driver.current_line(),
            text: String::new(),
            expected: "a constant expression",
        });
    }
    Ok(acc)
}
