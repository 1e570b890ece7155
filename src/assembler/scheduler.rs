//! Scheduled fix-ups (spec §4.4/§4.6): a symbol reference that cannot be
//! resolved immediately (forward branch, `la`, `.size` of a not-yet-closed
//! symbol, ...) is recorded as a closure capturing the emission location by
//! value. Once every section has a base address and every symbol a final
//! location, the closures run in schedule order and patch the already
//! emitted bytes in place.

use crate::assembler::section::SectionTable;
use crate::assembler::symbol_table::{ResolvedSymbol, SymbolTable};
use crate::errors::AssemblyError;

pub type FixupFn =
    Box<dyn FnOnce(&mut SectionTable, ResolvedSymbol) -> Result<(), AssemblyError>>;

pub struct ScheduledFixup {
    pub symbol: String,
    pub line: u32,
    apply: FixupFn,
}

#[derive(Default)]
pub struct Scheduler {
    pending: Vec<ScheduledFixup>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, symbol: impl Into<String>, line: u32, apply: FixupFn) {
        self.pending.push(ScheduledFixup {
            symbol: symbol.into(),
            line,
            apply,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Resolves every scheduled fix-up in the order it was scheduled (spec
    /// invariant 7: fix-up application order is deterministic and matches
    /// schedule order).
    pub fn resolve_all(
        self,
        sections: &mut SectionTable,
        symbols: &SymbolTable,
    ) -> Result<(), AssemblyError> {
        for fixup in self.pending {
            let resolved = symbols
                .resolve(&fixup.symbol)
                .ok_or_else(|| AssemblyError::UnresolvedSymbol {
                    name: fixup.symbol.clone(),
                })?;
            (fixup.apply)(sections, resolved)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::section::OutputKind;

    #[test]
    fn resolves_in_schedule_order() {
        let mut sections = SectionTable::new();
        sections.get_mut(0).add_output(OutputKind::Data, &[0u8; 8]);
        let mut symbols = SymbolTable::new();
        symbols.define("a", 0, 0).unwrap();
        symbols.define("b", 0, 4).unwrap();

        let mut scheduler = Scheduler::new();
        let order = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let o1 = order.clone();
        scheduler.schedule("a", 1, Box::new(move |_s, _r| {
            o1.borrow_mut().push("a");
            Ok(())
        }));
        let o2 = order.clone();
        scheduler.schedule("b", 2, Box::new(move |_s, _r| {
            o2.borrow_mut().push("b");
            Ok(())
        }));

        scheduler.resolve_all(&mut sections, &symbols).unwrap();
        assert_eq!(*order.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn unresolved_symbol_is_an_error() {
        let mut sections = SectionTable::new();
        let symbols = SymbolTable::new();
        let mut scheduler = Scheduler::new();
        scheduler.schedule("missing", 1, Box::new(|_s, _r| Ok(())));
        let err = scheduler.resolve_all(&mut sections, &symbols).unwrap_err();
        assert!(matches!(err, AssemblyError::UnresolvedSymbol { .. }));
    }
}
