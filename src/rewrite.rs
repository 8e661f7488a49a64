// Copyright 2025 Cornell University
// released under MIT License

use std::collections::BTreeSet;

use log::trace;

use crate::ir::Production;
use crate::relation::StringRelation;

/// Re-roots every production at each symbol its start symbol is related to.
/// A production whose start symbol has an empty image is kept as is.
pub fn rewrite_productions(
    productions: &BTreeSet<Production>,
    relation: &StringRelation,
) -> BTreeSet<Production> {
    let mut out = BTreeSet::new();
    for production in productions {
        let mut image = relation.image(production.first()).peekable();
        if image.peek().is_none() {
            out.insert(production.clone());
            continue;
        }
        for start in image {
            out.insert(production.with_first(start));
        }
    }
    trace!(
        "rewrote {} productions into {}",
        productions.len(),
        out.len()
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(symbols: &[&str]) -> Production {
        Production::from_symbols(symbols.iter().copied())
    }

    #[test]
    fn every_related_symbol_gets_a_copy() {
        let mut relation = StringRelation::new();
        relation.add("Init", "Init");
        relation.add("Init", "B_S1");
        let productions = BTreeSet::from([p(&["Init", "m", "Final"])]);

        let rewritten = rewrite_productions(&productions, &relation);
        assert_eq!(
            rewritten.into_iter().collect::<Vec<_>>(),
            vec![p(&["B_S1", "m", "Final"]), p(&["Init", "m", "Final"])]
        );
    }

    #[test]
    fn unrelated_start_symbol_is_kept() {
        let relation = StringRelation::new();
        let productions = BTreeSet::from([p(&["C_Ready", "a", "E_S1"])]);
        assert_eq!(rewrite_productions(&productions, &relation), productions);
    }

    #[test]
    fn start_symbol_may_be_dropped() {
        // the image decides, the production's own start symbol only survives if related to itself
        let mut relation = StringRelation::new();
        relation.add("B_S2", "E_S1");
        let productions = BTreeSet::from([p(&["B_S2", "b", "E_S2"])]);
        assert_eq!(
            rewrite_productions(&productions, &relation),
            BTreeSet::from([p(&["E_S1", "b", "E_S2"])])
        );
    }

    #[test]
    fn rewritten_copies_are_deduplicated() {
        let mut relation = StringRelation::new();
        relation.add("B_S1", "Init");
        relation.add("C_X", "Init");
        let productions = BTreeSet::from([p(&["B_S1", "a", "E_S1"]), p(&["C_X", "a", "E_S1"])]);
        assert_eq!(rewrite_productions(&productions, &relation).len(), 1);
    }
}
