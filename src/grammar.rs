// Copyright 2025 Cornell University
// released under MIT License

use std::collections::{BTreeMap, BTreeSet};

use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::errors::{SynthesisError, SynthesisResult};
use crate::ir::{Production, FINAL, INIT, TAU};

/// A grammar rule: a symbol together with its alternative productions.
/// Every alternative starts with the rule's symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AltProduction {
    symbol: String,
    alternatives: Vec<Production>,
}

impl AltProduction {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            alternatives: vec![],
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn alternatives(&self) -> &[Production] {
        &self.alternatives
    }

    pub fn is_empty(&self) -> bool {
        self.alternatives.is_empty()
    }

    /// Adds `alternative` unless an identical one is already present.
    /// Returns whether it was added.
    pub fn add_alternative(&mut self, alternative: Production) -> SynthesisResult<bool> {
        if alternative.first() != self.symbol {
            return Err(SynthesisError::misplaced_alternative(
                &self.symbol,
                alternative.to_string(),
            ));
        }
        if self.alternatives.contains(&alternative) {
            Ok(false)
        } else {
            self.alternatives.push(alternative);
            Ok(true)
        }
    }

    pub(crate) fn alternatives_mut(&mut self) -> &mut Vec<Production> {
        &mut self.alternatives
    }
}

/// Merges productions that share their start symbol into one rule each.
/// Rules come out ordered by symbol, alternatives in input order.
pub fn group_alternatives(
    productions: impl IntoIterator<Item = Production>,
) -> SynthesisResult<Vec<AltProduction>> {
    let mut rules: BTreeMap<String, AltProduction> = BTreeMap::new();
    for production in productions {
        rules
            .entry(production.first().to_string())
            .or_insert_with_key(|symbol| AltProduction::new(symbol.as_str()))
            .add_alternative(production)?;
    }
    Ok(rules.into_values().collect())
}

/// The local grammar of one component, rooted at `Init`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grammar {
    start: String,
    rules: BTreeMap<String, AltProduction>,
}

impl Grammar {
    /// Builds a grammar from a set of rules. Rules that share a symbol are
    /// merged. Every symbol that ends an alternative, and the start symbol,
    /// gets an (empty) rule if it has none, except for `Final`.
    pub fn new(rules: impl IntoIterator<Item = AltProduction>) -> SynthesisResult<Self> {
        let mut grammar = Self {
            start: INIT.to_string(),
            rules: BTreeMap::new(),
        };
        for rule in rules {
            match grammar.rules.get_mut(rule.symbol()) {
                None => {
                    for alternative in rule.alternatives() {
                        if alternative.first() != rule.symbol() {
                            return Err(SynthesisError::misplaced_alternative(
                                rule.symbol(),
                                alternative.to_string(),
                            ));
                        }
                    }
                    grammar.rules.insert(rule.symbol.clone(), rule);
                }
                Some(existing) => {
                    for alternative in rule.alternatives {
                        existing.add_alternative(alternative)?;
                    }
                }
            }
        }

        let undefined: BTreeSet<String> = grammar
            .rules
            .values()
            .flat_map(|r| r.alternatives().iter().map(|a| a.last()))
            .chain([INIT])
            .filter(|s| *s != FINAL && !grammar.rules.contains_key(*s))
            .map(str::to_string)
            .collect();
        for symbol in undefined {
            debug!("adding empty rule for {symbol}");
            grammar.rules.insert(symbol.clone(), AltProduction::new(symbol));
        }
        Ok(grammar)
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn rule(&self, symbol: &str) -> Option<&AltProduction> {
        self.rules.get(symbol)
    }

    pub fn has_rule(&self, symbol: &str) -> bool {
        self.rules.contains_key(symbol)
    }

    /// Rules ordered by symbol
    pub fn rules(&self) -> impl Iterator<Item = &AltProduction> {
        self.rules.values()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn num_rules(&self) -> usize {
        self.rules.len()
    }

    pub fn num_alternatives(&self) -> usize {
        self.rules.values().map(|r| r.alternatives.len()).sum()
    }

    pub fn alternatives(&self) -> impl Iterator<Item = &Production> {
        self.rules.values().flat_map(|r| r.alternatives.iter())
    }

    pub(crate) fn rules_mut(&mut self) -> &mut BTreeMap<String, AltProduction> {
        &mut self.rules
    }

    /// Symbols of all rules that can be reached from the start symbol by
    /// following the symbols of its alternatives.
    pub fn reachable_symbols(&self) -> BTreeSet<String> {
        let mut reached = BTreeSet::new();
        let mut todo = vec![self.start.as_str()];
        while let Some(symbol) = todo.pop() {
            let Some(rule) = self.rules.get(symbol) else {
                continue;
            };
            if !reached.insert(symbol.to_string()) {
                continue;
            }
            todo.extend(
                rule.alternatives()
                    .iter()
                    .flat_map(|a| a.tail().iter().map(String::as_str))
                    .filter(|s| self.rules.contains_key(*s)),
            );
        }
        reached
    }

    /// All observable action sequences of at most `max_len` actions that the
    /// start symbol can perform, `_tau` hidden. The result is prefix closed and
    /// always contains the empty trace. A symbol without a rule (such as
    /// `Final`) performs nothing.
    pub fn observable_traces(&self, max_len: usize) -> BTreeSet<Vec<String>> {
        let empty: FxHashSet<Vec<String>> = [vec![]].into_iter().collect();
        let mut traces: FxHashMap<&str, FxHashSet<Vec<String>>> = self
            .rules
            .keys()
            .map(|s| (s.as_str(), empty.clone()))
            .collect();

        let mut changed = true;
        while changed {
            changed = false;
            for rule in self.rules.values() {
                let mut found = vec![];
                for alternative in rule.alternatives() {
                    let visible: Vec<String> = alternative
                        .actions()
                        .iter()
                        .filter(|a| *a != TAU)
                        .take(max_len)
                        .cloned()
                        .collect();
                    for len in 1..=visible.len() {
                        found.push(visible[..len].to_vec());
                    }
                    let budget = max_len - visible.len();
                    let continuations = traces.get(alternative.last()).unwrap_or(&empty);
                    for suffix in continuations.iter().filter(|t| t.len() <= budget) {
                        let mut trace = visible.clone();
                        trace.extend(suffix.iter().cloned());
                        found.push(trace);
                    }
                }
                let own = traces.entry(rule.symbol()).or_default();
                for trace in found {
                    changed |= own.insert(trace);
                }
            }
        }

        traces
            .remove(self.start.as_str())
            .unwrap_or(empty)
            .into_iter()
            .collect()
    }

    /// Checks that every rule is stored under its own symbol and that all of
    /// its alternatives start with it.
    pub fn check_invariants(&self) -> SynthesisResult<()> {
        for (key, rule) in self.rules.iter() {
            if key != rule.symbol() {
                return Err(SynthesisError::misplaced_rule(rule.symbol(), key));
            }
            if let Some(alternative) = rule
                .alternatives()
                .iter()
                .find(|a| a.first() != rule.symbol())
            {
                return Err(SynthesisError::misplaced_alternative(
                    rule.symbol(),
                    alternative.to_string(),
                ));
            }
        }
        Ok(())
    }
}
