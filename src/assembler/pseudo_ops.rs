//! Pseudo-op emitters (spec §4.7): `db/dh/dw/dd/dq`, `resb/resh/resw/resd/resq`,
//! and `incbin`. Ported from `original_source/src/pseudo_ops.cpp`.

use crate::errors::AssemblyError;
use crate::token::constant_fold::fold_constant;
use crate::token::TokenType;

use super::section::OutputKind;
use super::Driver;

pub type PseudoOpHandler = fn(&mut Driver) -> Result<(), AssemblyError>;

macro_rules! data_emitter {
    ($fn_name:ident, $width:expr) => {
        fn $fn_name(driver: &mut Driver) -> Result<(), AssemblyError> {
            driver.align($width);
            let v = fold_constant(driver)?;
            driver.emit(OutputKind::Data, &v.to_le_bytes()[..$width]);
            Ok(())
        }
    };
}

data_emitter!(db, 1);
data_emitter!(dh, 2);
data_emitter!(dw, 4);
data_emitter!(dd, 8);
data_emitter!(dq, 16);

macro_rules! reserve_emitter {
    ($fn_name:ident, $width:expr) => {
        fn $fn_name(driver: &mut Driver) -> Result<(), AssemblyError> {
            let n = fold_constant(driver)?;
            driver.align($width);
            let section = driver.current_section();
            driver.sections.get_mut(section).allocate(n as u64 * $width as u64);
            Ok(())
        }
    };
}

reserve_emitter!(resb, 1);
reserve_emitter!(resh, 2);
reserve_emitter!(resw, 4);
reserve_emitter!(resd, 8);
reserve_emitter!(resq, 16);

fn incbin(driver: &mut Driver) -> Result<(), AssemblyError> {
    let path_tok = driver.expect(TokenType::String)?;
    let data = driver.read_binary(&path_tok.value)?;
    driver.emit(OutputKind::Data, &data);
    Ok(())
}

pub fn lookup_pseudo_op(name: &str) -> Option<PseudoOpHandler> {
    Some(match name {
        "db" => db,
        "dh" => dh,
        "dw" => dw,
        "dd" => dd,
        "dq" => dq,
        "resb" => resb,
        "resh" => resh,
        "resw" => resw,
        "resd" => resd,
        "resq" => resq,
        "incbin" => incbin,
        _ => return None,
    })
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
    fn db_emits_one_byte_little_endian() {
        let d = run("db 0xAB");
        assert_eq!(d.sections.get(d.current_section()).bytes, vec![0xAB]);
    }

    #[test]
    fn dw_emits_four_bytes_little_endian() {
        let d = run("dw 0x01020304");
        assert_eq!(
            d.sections.get(d.current_section()).bytes,
            vec![0x04, 0x03, 0x02, 0x01]
        );
    }

    #[test]
    fn resb_reserves_zeroed_bytes() {
        let d = run("resb 4");
        assert_eq!(d.sections.get(d.current_section()).bytes, vec![0, 0, 0, 0]);
    }

    #[test]
    fn incbin_emits_raw_file_contents() {
        let raw = crate::token::raw_split::split("incbin \"blob.bin\"").unwrap();
        let tokens = crate::token::classify::classify(&raw).unwrap();
        let mut reader = MockFileReader::default();
        reader.add_binary_file("blob.bin", &[1, 2, 3]);
        let mut d = Driver::for_tokens(tokens, AssembleOptions::default(), Box::new(reader));
        d.run().unwrap();
        assert_eq!(d.sections.get(d.current_section()).bytes, vec![1, 2, 3]);
    }
}
