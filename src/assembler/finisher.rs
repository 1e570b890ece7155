//! The finisher (spec §4.6): flushes trailing labels, assigns section base
//! addresses, and resolves every scheduled fix-up, in that order — fix-up
//! closures observe final base addresses because step 2 completes before
//! step 3 (spec invariant).

use crate::errors::AssemblyError;

use super::Driver;

pub fn finish(driver: &mut Driver) -> Result<(), AssemblyError> {
    // 1. Flush trailing labels in every section, not just the current one.
    for id in 0..driver.sections.len() as u32 {
        let names = driver.sections.get_mut(id).take_queued_labels();
        for name in names {
            let offset = driver.sections.get(id).current_offset();
            driver
                .symbols
                .define(&name, id, offset)
                .map_err(|reason| AssemblyError::Structural { reason })?;
        }
    }

    // 2. Assign base addresses.
    driver
        .sections
        .assign_base_addresses(driver.options.base_address, driver.options.page_separation);

    // 3. Resolve scheduled fix-ups.
    let scheduler = std::mem::take(&mut driver.scheduler);
    scheduler.resolve_all(&mut driver.sections, &driver.symbols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::{AssembleOptions, Driver};
    use crate::file_reader::MockFileReader;

    fn run(src: &str) -> Driver {
        let raw = crate::token::raw_split::split(src).unwrap();
        let tokens = crate::token::classify::classify(&raw).unwrap();
        let mut d = Driver::for_tokens(tokens, AssembleOptions::default(), Box::new(MockFileReader::default()));
        d.run().unwrap();
        finish(&mut d).unwrap();
        d
    }

    #[test]
    fn trailing_label_is_flushed_at_eof() {
        let d = run("db 1\ntrailing:");
        assert!(d.symbols.contains("trailing"));
        assert_eq!(d.symbols.resolve("trailing").unwrap().offset, 1);
    }

    #[test]
    fn base_resolution_is_idempotent_across_two_finishes() {
        let mut d = run("db 1");
        let first = d.sections.get(d.current_section()).base_address();
        driver_finish_again(&mut d);
        assert_eq!(d.sections.get(d.current_section()).base_address(), first);
    }

    fn driver_finish_again(d: &mut Driver) {
        d.sections
            .assign_base_addresses(d.options.base_address, d.options.page_separation);
    }
}
