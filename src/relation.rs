// Copyright 2025 Cornell University
// released under MIT License

use rustc_hash::{FxHashMap, FxHashSet};

/// A binary relation over grammar symbols, stored as a forward image map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringRelation {
    image: FxHashMap<String, FxHashSet<String>>,
}

impl StringRelation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the pair `(from, to)`, returns `false` if it was already present
    pub fn add(&mut self, from: impl Into<String>, to: impl Into<String>) -> bool {
        self.image.entry(from.into()).or_default().insert(to.into())
    }

    pub fn contains(&self, from: &str, to: &str) -> bool {
        self.image.get(from).is_some_and(|tos| tos.contains(to))
    }

    /// All symbols related to `from`, empty if there are none
    pub fn image(&self, from: &str) -> impl Iterator<Item = &str> {
        self.image
            .get(from)
            .into_iter()
            .flat_map(|tos| tos.iter().map(String::as_str))
    }

    /// Number of pairs in the relation
    pub fn len(&self) -> usize {
        self.image.values().map(FxHashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replaces the relation with its transitive closure. The relation may be
    /// cyclic; a symbol on a cycle ends up related to itself.
    pub fn transitive_closure(&mut self) {
        let mut closed: FxHashMap<String, FxHashSet<String>> = FxHashMap::default();
        for from in self.image.keys() {
            let mut reached: FxHashSet<String> = FxHashSet::default();
            let mut todo: Vec<&str> = self.image(from).collect();
            while let Some(symbol) = todo.pop() {
                if reached.insert(symbol.to_string()) {
                    todo.extend(self.image(symbol));
                }
            }
            closed.insert(from.clone(), reached);
        }
        self.image = closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;

    fn sorted_image(r: &StringRelation, from: &str) -> Vec<String> {
        r.image(from).map(str::to_string).sorted().collect()
    }

    #[test]
    fn add_and_lookup() {
        let mut r = StringRelation::new();
        assert!(r.is_empty());
        assert!(r.add("B_S2", "E_S1"));
        assert!(!r.add("B_S2", "E_S1"));
        r.add("B_S2", "Init");
        assert_eq!(r.len(), 2);
        assert!(r.contains("B_S2", "Init"));
        assert!(!r.contains("Init", "B_S2"));
        assert_eq!(sorted_image(&r, "B_S2"), vec!["E_S1", "Init"]);
        assert_eq!(r.image("nothing").count(), 0);
    }

    #[test]
    fn closure_of_a_chain() {
        let mut r = StringRelation::new();
        r.add("a", "b");
        r.add("b", "c");
        r.add("c", "d");
        r.transitive_closure();
        assert_eq!(sorted_image(&r, "a"), vec!["b", "c", "d"]);
        assert_eq!(sorted_image(&r, "b"), vec!["c", "d"]);
        assert_eq!(sorted_image(&r, "c"), vec!["d"]);
        assert!(!r.contains("a", "a"));
    }

    #[test]
    fn closure_of_a_cycle() {
        let mut r = StringRelation::new();
        r.add("C_Ready", "B_S1");
        r.add("B_S1", "C_Ready");
        r.add("B_S1", "E_S0");
        r.transitive_closure();
        assert_eq!(sorted_image(&r, "C_Ready"), vec!["B_S1", "C_Ready", "E_S0"]);
        assert_eq!(sorted_image(&r, "B_S1"), vec!["B_S1", "C_Ready", "E_S0"]);
        assert_eq!(r.image("E_S0").count(), 0);
    }

    #[test]
    fn closure_is_idempotent() {
        let mut r = StringRelation::new();
        r.add("x", "y");
        r.add("y", "x");
        r.add("y", "z");
        r.transitive_closure();
        let once = r.clone();
        r.transitive_closure();
        assert_eq!(r, once);
    }
}
