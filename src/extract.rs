// Copyright 2025 Cornell University
// released under MIT License

use std::collections::BTreeSet;

use log::trace;

use crate::ir::{begin_symbol, condition_symbol, end_symbol, Event, Instance, Production, TAU};

/// Splits every instance of a component on its conditions and returns the
/// resulting set of flat productions.
///
/// While doing so the traces are normalised:
/// - a trace that does not start with a condition begins at `B_<scenario>`
/// - a trace that does not end with a condition ends at `E_<scenario>`
/// - two adjacent conditions are separated by a `_tau` action
///
/// Empty instances contribute no productions.
pub fn extract_productions<'a>(
    instances: impl IntoIterator<Item = (&'a str, &'a Instance)>,
) -> BTreeSet<Production> {
    let mut productions = BTreeSet::new();
    for (scenario, instance) in instances {
        let before = productions.len();
        extract_instance(scenario, instance, &mut productions);
        trace!(
            "bMSC {}: {} events, {} new productions",
            scenario,
            instance.len(),
            productions.len() - before
        );
    }
    productions
}

fn extract_instance(scenario: &str, instance: &Instance, out: &mut BTreeSet<Production>) {
    let events = instance.events();
    let Some(first) = events.first() else {
        return;
    };

    // a leading condition is consumed, otherwise the beginning is synthesised
    let (mut current, rest) = match first.condition_symbol() {
        Some(symbol) => (Production::new(symbol), &events[1..]),
        None => (Production::new(begin_symbol(scenario)), events),
    };

    let mut found_actions = false;
    for event in rest {
        match event {
            Event::Message(label) => {
                current.push(label.as_str());
                found_actions = true;
            }
            Event::Condition(label) => {
                if !found_actions {
                    current.push(TAU);
                }
                let symbol = condition_symbol(label);
                current.push(symbol.as_str());
                out.insert(std::mem::replace(&mut current, Production::new(symbol)));
                found_actions = false;
            }
        }
    }

    if found_actions {
        current.push(end_symbol(scenario));
        out.insert(current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Event::{Condition, Message};

    fn instance(events: Vec<Event>) -> Instance {
        Instance::new(events)
    }

    fn extract(scenario: &str, events: Vec<Event>) -> Vec<Production> {
        let i = instance(events);
        extract_productions([(scenario, &i)]).into_iter().collect()
    }

    fn p(symbols: &[&str]) -> Production {
        Production::from_symbols(symbols.iter().copied())
    }

    #[test]
    fn init_message_final() {
        let productions = extract(
            "S1",
            vec![
                Condition("Init".into()),
                Message("m".into()),
                Condition("Final".into()),
            ],
        );
        assert_eq!(productions, vec![p(&["Init", "m", "Final"])]);
    }

    #[test]
    fn adjacent_conditions_get_a_single_tau() {
        let productions = extract(
            "S1",
            vec![Condition("Init".into()), Condition("C1".into())],
        );
        assert_eq!(productions, vec![p(&["Init", TAU, "C_C1"])]);
    }

    #[test]
    fn missing_boundaries_are_synthesised() {
        let productions = extract("S1", vec![Message("a".into()), Message("b".into())]);
        assert_eq!(productions, vec![p(&["B_S1", "a", "b", "E_S1"])]);
    }

    #[test]
    fn conditions_split_the_trace() {
        let productions = extract(
            "Work",
            vec![
                Message("a".into()),
                Condition("Mid".into()),
                Message("b".into()),
                Condition("Done".into()),
                Condition("Done2".into()),
                Message("c".into()),
            ],
        );
        assert_eq!(
            productions,
            vec![
                p(&["B_Work", "a", "C_Mid"]),
                p(&["C_Done", TAU, "C_Done2"]),
                p(&["C_Done2", "c", "E_Work"]),
                p(&["C_Mid", "b", "C_Done"]),
            ]
        );
    }

    #[test]
    fn trace_ending_on_a_condition_has_no_end_symbol() {
        let productions = extract(
            "S1",
            vec![Message("a".into()), Condition("Ready".into())],
        );
        assert_eq!(productions, vec![p(&["B_S1", "a", "C_Ready"])]);
    }

    #[test]
    fn lone_condition_and_empty_instances_yield_nothing() {
        assert!(extract("S1", vec![Condition("Ready".into())]).is_empty());
        assert!(extract("S2", vec![]).is_empty());
    }

    #[test]
    fn duplicates_collapse_across_scenarios() {
        let a = instance(vec![
            Condition("Init".into()),
            Message("m".into()),
            Condition("Init".into()),
        ]);
        let b = a.clone();
        let productions = extract_productions([("S1", &a), ("S2", &b)]);
        assert_eq!(productions.len(), 1);
    }
}
