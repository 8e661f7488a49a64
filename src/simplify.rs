// Copyright 2025 Cornell University
// released under MIT License

//! Syntactic simplification of component grammars.
//!
//! Six rewrite rules, each a method on [`Grammar`] returning the number of
//! changes it made, are applied in order until a whole pass changes nothing.
//! Every rule preserves the observable trace language of the start symbol.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::grammar::Grammar;
use crate::ir::{Production, INIT};

/// Placeholder for a rule's own symbol when comparing rules with each other
const SELF_REFERENCE: &str = "<self>";

/// How often each rule fired while simplifying a grammar
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimplifyStats {
    pub passes: usize,
    pub unreachable_rules: usize,
    pub trivial_productions: usize,
    pub recursive_alternatives: usize,
    pub inlined_rules: usize,
    pub duplicate_alternatives: usize,
    pub merged_rules: usize,
}

impl SimplifyStats {
    pub fn total_changes(&self) -> usize {
        self.unreachable_rules
            + self.trivial_productions
            + self.recursive_alternatives
            + self.inlined_rules
            + self.duplicate_alternatives
            + self.merged_rules
    }
}

/// Runs all rules until none of them applies anymore.
pub fn simplify(grammar: &mut Grammar) -> SimplifyStats {
    let mut stats = SimplifyStats::default();
    loop {
        stats.passes += 1;
        let unreachable = grammar.remove_unreachable_rules();
        let trivial = grammar.remove_trivial_productions();
        let recursive = grammar.remove_recursive_alternatives();
        let inlined = grammar.inline_trivial_rules();
        let duplicates = grammar.remove_duplicate_alternatives();
        let merged = grammar.merge_equivalent_rules();

        stats.unreachable_rules += unreachable;
        stats.trivial_productions += trivial;
        stats.recursive_alternatives += recursive;
        stats.inlined_rules += inlined;
        stats.duplicate_alternatives += duplicates;
        stats.merged_rules += merged;

        if unreachable + trivial + recursive + inlined + duplicates + merged == 0 {
            break;
        }
    }
    debug!("simplified grammar in {} passes: {:?}", stats.passes, stats);
    stats
}

/// An alternative that only moves on to another rule without doing anything
/// observable.
fn is_silent_alternative(grammar: &Grammar, alternative: &Production) -> bool {
    alternative.is_silent() && grammar.has_rule(alternative.last())
}

/// An alternative that loops back to its own rule without doing anything
/// observable.
fn is_recursive_alternative(alternative: &Production) -> bool {
    alternative.is_silent() && alternative.first() == alternative.last()
}

/// A rule that can be replaced by its only alternative wherever it is used.
fn is_trivial_rule(grammar: &Grammar, symbol: &str) -> bool {
    symbol != grammar.start()
        && grammar
            .rule(symbol)
            .is_some_and(|r| r.alternatives().len() == 1 && r.alternatives()[0].last() != symbol)
}

/// Identifies a rule by its alternatives, independently of its own name.
fn canonical_key(symbol: &str, alternatives: &[Production]) -> Vec<Vec<String>> {
    let mut key: Vec<Vec<String>> = alternatives
        .iter()
        .map(|a| {
            a.tail()
                .iter()
                .map(|s| {
                    if s == symbol {
                        SELF_REFERENCE.to_string()
                    } else {
                        s.clone()
                    }
                })
                .collect()
        })
        .collect();
    key.sort();
    key.dedup();
    key
}

impl Grammar {
    /// Rule 1: removes every rule that cannot be reached from the start symbol.
    pub fn remove_unreachable_rules(&mut self) -> usize {
        let reachable = self.reachable_symbols();
        let before = self.num_rules();
        self.rules_mut().retain(|symbol, _| reachable.contains(symbol));
        before - self.num_rules()
    }

    /// Rule 2: folds silent alternatives into their rule. A rule that can
    /// silently move on to other rules receives their remaining alternatives
    /// instead. Returns the number of silent alternatives removed.
    pub fn remove_trivial_productions(&mut self) -> usize {
        let snapshot = self.clone();
        let mut removed = 0;
        for (symbol, rule) in self.rules_mut().iter_mut() {
            let silent = rule
                .alternatives()
                .iter()
                .filter(|a| is_silent_alternative(&snapshot, a))
                .count();
            if silent == 0 {
                continue;
            }
            removed += silent;

            let mut alternatives: Vec<Production> = rule
                .alternatives()
                .iter()
                .filter(|a| !is_silent_alternative(&snapshot, a))
                .cloned()
                .collect();
            for target in silent_closure(&snapshot, symbol) {
                let Some(target_rule) = snapshot.rule(&target) else {
                    continue;
                };
                alternatives.extend(
                    target_rule
                        .alternatives()
                        .iter()
                        .filter(|a| !is_silent_alternative(&snapshot, a))
                        .map(|a| a.with_first(symbol)),
                );
            }
            *rule.alternatives_mut() = alternatives;
        }
        removed
    }

    /// Rule 3: removes silent self loops.
    pub fn remove_recursive_alternatives(&mut self) -> usize {
        let mut removed = 0;
        for rule in self.rules_mut().values_mut() {
            let alternatives = rule.alternatives_mut();
            let before = alternatives.len();
            alternatives.retain(|a| !is_recursive_alternative(a));
            removed += before - alternatives.len();
        }
        removed
    }

    /// Rule 4: inlines rules with a single, non recursive alternative into
    /// every alternative that ends in them, then deletes them.
    pub fn inline_trivial_rules(&mut self) -> usize {
        let candidates: Vec<String> = self.symbols().map(str::to_string).collect();
        let mut inlined = 0;
        for symbol in candidates {
            if !is_trivial_rule(self, &symbol) {
                continue;
            }
            let Some(rule) = self.rules_mut().remove(&symbol) else {
                continue;
            };
            let replacement = &rule.alternatives()[0];
            for other in self.rules_mut().values_mut() {
                for alternative in other.alternatives_mut().iter_mut() {
                    if alternative.last() == symbol {
                        *alternative = alternative.splice(replacement);
                    }
                }
            }
            inlined += 1;
        }
        inlined
    }

    /// Rule 5: keeps only the first of several identical alternatives.
    pub fn remove_duplicate_alternatives(&mut self) -> usize {
        let mut removed = 0;
        for rule in self.rules_mut().values_mut() {
            let alternatives = rule.alternatives_mut();
            let before = alternatives.len();
            let mut seen = BTreeSet::new();
            alternatives.retain(|a| seen.insert(a.clone()));
            removed += before - alternatives.len();
        }
        removed
    }

    /// Rule 6: merges rules that have the same alternatives up to their own
    /// symbol. The start symbol survives if it is part of a group, otherwise
    /// the smallest symbol does. Returns the number of rules deleted.
    pub fn merge_equivalent_rules(&mut self) -> usize {
        let mut groups: BTreeMap<Vec<Vec<String>>, Vec<String>> = BTreeMap::new();
        for rule in self.rules() {
            groups
                .entry(canonical_key(rule.symbol(), rule.alternatives()))
                .or_default()
                .push(rule.symbol().to_string());
        }

        let mut renaming: BTreeMap<String, String> = BTreeMap::new();
        for members in groups.into_values().filter(|m| m.len() > 1) {
            // members are sorted since rules are stored by symbol
            let survivor = if members.iter().any(|m| m == INIT) {
                INIT.to_string()
            } else {
                members[0].clone()
            };
            for member in members.into_iter().filter(|m| *m != survivor) {
                renaming.insert(member, survivor.clone());
            }
        }
        if renaming.is_empty() {
            return 0;
        }

        let rules = self.rules_mut();
        rules.retain(|symbol, _| !renaming.contains_key(symbol));
        for rule in rules.values_mut() {
            for alternative in rule.alternatives_mut().iter_mut() {
                if let Some(survivor) = renaming.get(alternative.last()) {
                    *alternative = alternative.with_last(survivor);
                }
            }
        }
        renaming.len()
    }
}

/// Rules reachable from `symbol` through silent alternatives only, excluding
/// `symbol` itself.
fn silent_closure(grammar: &Grammar, symbol: &str) -> BTreeSet<String> {
    let mut reached = BTreeSet::new();
    let mut todo = vec![symbol.to_string()];
    while let Some(current) = todo.pop() {
        let Some(rule) = grammar.rule(&current) else {
            continue;
        };
        for alternative in rule.alternatives() {
            if is_silent_alternative(grammar, alternative)
                && alternative.last() != symbol
                && reached.insert(alternative.last().to_string())
            {
                todo.push(alternative.last().to_string());
            }
        }
    }
    reached
}
