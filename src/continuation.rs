// Copyright 2025 Cornell University
// released under MIT License

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::errors::{SynthesisError, SynthesisResult};
use crate::ir::{begin_symbol, end_symbol, Instance, ScenarioId, Specification, FINAL, INIT};
use crate::relation::StringRelation;

/// Maps every scenario to the set of scenarios that may directly precede it.
/// Every scenario of the specification has an entry, possibly empty.
fn predecessor_map(
    spec: &Specification,
) -> SynthesisResult<BTreeMap<ScenarioId, BTreeSet<ScenarioId>>> {
    let mut predecessors: BTreeMap<ScenarioId, BTreeSet<ScenarioId>> = spec
        .scenario_ids()
        .into_iter()
        .map(|id| (id, BTreeSet::new()))
        .collect();

    for (from, to) in spec.edges() {
        let from_name = scenario_name(spec, from, "continuation graph")?;
        scenario_name(spec, to, &format!("continuation of {from_name}"))?;
        predecessors.entry(to).or_default().insert(from);
    }
    Ok(predecessors)
}

fn scenario_name<'a>(
    spec: &'a Specification,
    id: ScenarioId,
    context: &str,
) -> SynthesisResult<&'a str> {
    spec.scenario(id)
        .map(|b| b.name())
        .ok_or_else(|| SynthesisError::unknown_scenario(id, context))
}

/// Builds the continuation relation shared by all components.
///
/// For every scenario `b` the relation contains `(B_b, E_c)` for each scenario
/// `c` that may be followed by `b`: the beginning of `b` can be reached through
/// the end of `c`. Initial scenarios begin at `Init`, and `Final` is reached
/// through the end of every final scenario.
pub fn common_continuation_relation(spec: &Specification) -> SynthesisResult<StringRelation> {
    let mut relation = StringRelation::new();

    for (scenario, predecessors) in predecessor_map(spec)? {
        let name = scenario_name(spec, scenario, "continuation graph")?;
        let begin = begin_symbol(name);
        let end = end_symbol(name);

        relation.add(begin.clone(), begin.clone());
        relation.add(end.clone(), end);

        for predecessor in predecessors {
            let predecessor = scenario_name(spec, predecessor, "continuation graph")?;
            relation.add(begin.clone(), end_symbol(predecessor));
        }
        if spec.is_initial(scenario) {
            relation.add(begin, INIT);
        }
    }

    for &scenario in spec.initial() {
        scenario_name(spec, scenario, "initial scenarios")?;
    }
    for &scenario in spec.finals() {
        let name = scenario_name(spec, scenario, "final scenarios")?;
        relation.add(FINAL, end_symbol(name));
    }
    relation.add(INIT, INIT);

    debug!("common continuation relation has {} pairs", relation.len());
    Ok(relation)
}

/// Extends a copy of the common relation with the boundary aliases of one
/// component and closes it transitively.
///
/// A leading condition is linked both ways with `B_<scenario>` and a trailing
/// condition with `E_<scenario>`. A scenario in which the component takes no
/// part lets its end stand for its beginning.
pub fn component_continuation_relation<'a>(
    common: &StringRelation,
    instances: impl IntoIterator<Item = (&'a str, &'a Instance)>,
) -> StringRelation {
    let mut relation = common.clone();

    for (scenario, instance) in instances {
        let begin = begin_symbol(scenario);
        let end = end_symbol(scenario);
        if instance.is_empty() {
            relation.add(end, begin);
            continue;
        }

        if let Some(symbol) = instance.first().and_then(|e| e.condition_symbol()) {
            relation.add(symbol.clone(), begin.clone());
            relation.add(begin, symbol);
        }
        if let Some(symbol) = instance.last().and_then(|e| e.condition_symbol()) {
            relation.add(end.clone(), symbol.clone());
            relation.add(symbol, end);
        }
    }

    relation.transitive_closure();
    relation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Event;
    use cranelift_entity::EntityRef;
    use itertools::Itertools;

    fn sorted_image(r: &StringRelation, from: &str) -> Vec<String> {
        r.image(from).map(str::to_string).sorted().collect()
    }

    /// S1 -> S2 -> S1, S1 initial, S2 final
    fn ping_pong() -> Specification {
        let mut spec = Specification::default();
        let s1 = spec.add_scenario("S1");
        let s2 = spec.add_scenario("S2");
        spec.add_continuation(s1, s2);
        spec.add_continuation(s2, s1);
        spec.add_initial(s1);
        spec.add_final(s2);
        spec
    }

    #[test]
    fn common_relation_points_at_predecessors() {
        let r = common_continuation_relation(&ping_pong()).unwrap();
        assert_eq!(sorted_image(&r, "B_S1"), vec!["B_S1", "E_S2", "Init"]);
        assert_eq!(sorted_image(&r, "B_S2"), vec!["B_S2", "E_S1"]);
        assert_eq!(sorted_image(&r, "E_S1"), vec!["E_S1"]);
        assert_eq!(sorted_image(&r, "Final"), vec!["E_S2"]);
        assert_eq!(sorted_image(&r, "Init"), vec!["Init"]);
        assert_eq!(r.len(), 9);
    }

    #[test]
    fn common_relation_without_edges() {
        let mut spec = Specification::default();
        let s1 = spec.add_scenario("S1");
        spec.add_initial(s1);
        let r = common_continuation_relation(&spec).unwrap();
        assert_eq!(sorted_image(&r, "B_S1"), vec!["B_S1", "Init"]);
        assert!(!r.contains("Final", "E_S1"));
    }

    #[test]
    fn dangling_edge_is_inconsistent() {
        let mut spec = Specification::default();
        let s1 = spec.add_scenario("S1");
        spec.add_continuation(s1, ScenarioId::new(7));
        let err = common_continuation_relation(&spec).unwrap_err();
        assert_eq!(
            err,
            SynthesisError::unknown_scenario(ScenarioId::new(7), "continuation of S1")
        );
    }

    #[test]
    fn dangling_final_marker_is_inconsistent() {
        let mut spec = Specification::default();
        spec.add_scenario("S1");
        spec.add_final(ScenarioId::new(2));
        assert!(common_continuation_relation(&spec).is_err());
    }

    #[test]
    fn empty_instance_aliases_end_to_begin() {
        let common = common_continuation_relation(&ping_pong()).unwrap();
        let s1 = Instance::new(vec![Event::message("a")]);
        let s2 = Instance::default();
        let r = component_continuation_relation(&common, [("S1", &s1), ("S2", &s2)]);
        assert!(r.contains("E_S2", "B_S2"));
        // B_S1 follows S2, which this component skips, so it also follows S1
        assert_eq!(
            sorted_image(&r, "B_S1"),
            vec!["B_S1", "B_S2", "E_S1", "E_S2", "Init"]
        );
    }

    #[test]
    fn conditions_alias_boundaries() {
        let common = common_continuation_relation(&ping_pong()).unwrap();
        let s1 = Instance::new(vec![
            Event::condition("Init"),
            Event::message("a"),
            Event::condition("Ready"),
        ]);
        let s2 = Instance::new(vec![Event::condition("Ready"), Event::message("b")]);
        let r = component_continuation_relation(&common, [("S1", &s1), ("S2", &s2)]);

        assert!(r.contains("Init", "B_S1"));
        assert!(r.contains("B_S1", "Init"));
        assert!(r.contains("E_S1", "C_Ready"));
        assert!(r.contains("C_Ready", "E_S1"));
        assert!(r.contains("C_Ready", "B_S2"));
        // closed: productions leaving `C_Ready` also leave the end of S1
        assert!(r.contains("C_Ready", "C_Ready"));
        assert!(r.contains("Init", "E_S2"));
    }
}
