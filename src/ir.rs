// Copyright 2025 Cornell University
// released under MIT License

use cranelift_entity::{entity_impl, PrimaryMap, SecondaryMap};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::ops::Index;

/// Start symbol of every component grammar (and the distinguished initial condition)
pub const INIT: &str = "Init";
/// Distinguished final condition
pub const FINAL: &str = "Final";
/// Invisible action, hidden in the rendered processes
pub const TAU: &str = "_tau";

pub const BEGIN_PREFIX: &str = "B_";
pub const END_PREFIX: &str = "E_";
pub const COND_PREFIX: &str = "C_";

/// Symbol synthesized for the beginning of a scenario without a leading condition
pub fn begin_symbol(scenario: &str) -> String {
    format!("{BEGIN_PREFIX}{scenario}")
}

/// Symbol synthesized for the end of a scenario without a trailing condition
pub fn end_symbol(scenario: &str) -> String {
    format!("{END_PREFIX}{scenario}")
}

/// Grammar symbol of a condition. `Init` and `Final` keep their name,
/// every other label is prefixed with `C_`.
pub fn condition_symbol(label: &str) -> String {
    if label == INIT || label == FINAL {
        label.to_string()
    } else {
        format!("{COND_PREFIX}{label}")
    }
}

/// A single event in a component's local view of a scenario
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Event {
    /// Sending or receiving a message, the label becomes an action
    Message(String),
    /// Synchronisation point shared between scenarios
    Condition(String),
}

impl Event {
    pub fn message(label: impl Into<String>) -> Self {
        Event::Message(label.into())
    }

    pub fn condition(label: impl Into<String>) -> Self {
        Event::Condition(label.into())
    }

    /// Returns the grammar symbol of a `Condition`, `None` for messages
    pub fn condition_symbol(&self) -> Option<String> {
        match self {
            Event::Condition(label) => Some(condition_symbol(label)),
            Event::Message(_) => None,
        }
    }
}

/// One component's ordered event trace within one scenario
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Instance {
    events: Vec<Event>,
}

impl Instance {
    pub fn new(events: Vec<Event>) -> Self {
        Self { events }
    }

    pub fn push(&mut self, event: Event) {
        self.events.push(event)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn first(&self) -> Option<&Event> {
        self.events.first()
    }

    pub fn last(&self) -> Option<&Event> {
        self.events.last()
    }
}

impl From<Vec<Event>> for Instance {
    fn from(events: Vec<Event>) -> Self {
        Self::new(events)
    }
}

#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct ScenarioId(u32);
entity_impl!(ScenarioId, "bmsc");

#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct ComponentId(u32);
entity_impl!(ComponentId, "component");

/// A basic MSC, i.e. a node of the continuation graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicMsc {
    name: String,
}

impl BasicMsc {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A component together with its instance in each scenario it takes part in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    name: String,
    instances: BTreeMap<ScenarioId, Instance>,
}

impl Component {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Iterates over the scenarios this component has an instance in,
    /// in scenario declaration order
    pub fn instances(&self) -> impl Iterator<Item = (ScenarioId, &Instance)> {
        self.instances.iter().map(|(id, instance)| (*id, instance))
    }

    pub fn instance(&self, scenario: ScenarioId) -> Option<&Instance> {
        self.instances.get(&scenario)
    }
}

/// The synthesis input: scenarios, their continuation graph, and every
/// component's local view of each scenario.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Specification {
    scenarios: PrimaryMap<ScenarioId, BasicMsc>,
    by_name_scenario: FxHashMap<String, ScenarioId>,
    components: PrimaryMap<ComponentId, Component>,
    by_name_component: FxHashMap<String, ComponentId>,
    /// Maps a scenario to the scenarios that may follow it
    continuations: SecondaryMap<ScenarioId, Vec<ScenarioId>>,
    initial: Vec<ScenarioId>,
    finals: Vec<ScenarioId>,
}

impl Specification {
    pub fn add_scenario(&mut self, name: impl Into<String>) -> ScenarioId {
        let name = name.into();
        assert!(
            !self.by_name_scenario.contains_key(&name),
            "we already have a bMSC named {name}!"
        );
        let id = self.scenarios.push(BasicMsc { name: name.clone() });
        self.by_name_scenario.insert(name, id);
        id
    }

    pub fn add_component(&mut self, name: impl Into<String>) -> ComponentId {
        let name = name.into();
        assert!(
            !self.by_name_component.contains_key(&name),
            "we already have a component named {name}!"
        );
        let id = self.components.push(Component {
            name: name.clone(),
            instances: BTreeMap::new(),
        });
        self.by_name_component.insert(name, id);
        id
    }

    /// Sets (or replaces) the instance of `component` in `scenario`
    pub fn set_instance(
        &mut self,
        component: ComponentId,
        scenario: ScenarioId,
        instance: Instance,
    ) {
        self.components[component]
            .instances
            .insert(scenario, instance);
    }

    /// Records that `to` may follow `from`. Repeated edges are ignored.
    pub fn add_continuation(&mut self, from: ScenarioId, to: ScenarioId) {
        let successors = &mut self.continuations[from];
        if !successors.contains(&to) {
            successors.push(to);
        }
    }

    pub fn add_initial(&mut self, scenario: ScenarioId) {
        if !self.initial.contains(&scenario) {
            self.initial.push(scenario);
        }
    }

    pub fn add_final(&mut self, scenario: ScenarioId) {
        if !self.finals.contains(&scenario) {
            self.finals.push(scenario);
        }
    }

    pub fn scenario_id_from_name(&self, name: &str) -> Option<ScenarioId> {
        self.by_name_scenario.get(name).copied()
    }

    pub fn component_id_from_name(&self, name: &str) -> Option<ComponentId> {
        self.by_name_component.get(name).copied()
    }

    pub fn scenario(&self, id: ScenarioId) -> Option<&BasicMsc> {
        self.scenarios.get(id)
    }

    pub fn component(&self, id: ComponentId) -> Option<&Component> {
        self.components.get(id)
    }

    pub fn scenarios(&self) -> impl Iterator<Item = (ScenarioId, &BasicMsc)> {
        self.scenarios.iter()
    }

    pub fn scenario_ids(&self) -> Vec<ScenarioId> {
        self.scenarios.keys().collect()
    }

    /// Components in declaration order
    pub fn components(&self) -> impl Iterator<Item = (ComponentId, &Component)> {
        self.components.iter()
    }

    pub fn component_ids(&self) -> Vec<ComponentId> {
        self.components.keys().collect()
    }

    /// Scenarios that may directly follow `scenario`
    pub fn continuations(&self, scenario: ScenarioId) -> &[ScenarioId] {
        &self.continuations[scenario]
    }

    /// All continuation edges `(from, to)`
    pub fn edges(&self) -> impl Iterator<Item = (ScenarioId, ScenarioId)> + '_ {
        self.continuations
            .iter()
            .flat_map(|(from, successors)| successors.iter().map(move |to| (from, *to)))
    }

    pub fn initial(&self) -> &[ScenarioId] {
        &self.initial
    }

    pub fn finals(&self) -> &[ScenarioId] {
        &self.finals
    }

    pub fn is_initial(&self, scenario: ScenarioId) -> bool {
        self.initial.contains(&scenario)
    }
}

impl Index<ScenarioId> for Specification {
    type Output = BasicMsc;

    fn index(&self, index: ScenarioId) -> &Self::Output {
        &self.scenarios[index]
    }
}

impl Index<ComponentId> for Specification {
    type Output = Component;

    fn index(&self, index: ComponentId) -> &Self::Output {
        &self.components[index]
    }
}

/// A flat production: start symbol, zero or more actions, end symbol.
/// Equality, hashing and ordering are structural.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Production {
    symbols: Vec<String>,
}

impl Production {
    /// A production that so far only has its start symbol
    pub fn new(start: impl Into<String>) -> Self {
        Self {
            symbols: vec![start.into()],
        }
    }

    pub fn from_symbols<S: Into<String>>(symbols: impl IntoIterator<Item = S>) -> Self {
        let symbols: Vec<String> = symbols.into_iter().map(Into::into).collect();
        assert!(!symbols.is_empty(), "a production needs a start symbol");
        Self { symbols }
    }

    pub fn push(&mut self, symbol: impl Into<String>) {
        self.symbols.push(symbol.into())
    }

    pub fn first(&self) -> &str {
        &self.symbols[0]
    }

    pub fn last(&self) -> &str {
        &self.symbols[self.symbols.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Everything after the start symbol: the actions followed by the end symbol
    pub fn tail(&self) -> &[String] {
        &self.symbols[1..]
    }

    /// The interior symbols, i.e. the actions between start and end
    pub fn actions(&self) -> &[String] {
        if self.symbols.len() < 2 {
            &[]
        } else {
            &self.symbols[1..self.symbols.len() - 1]
        }
    }

    /// Copy of this production starting at `symbol` instead
    pub fn with_first(&self, symbol: &str) -> Self {
        let mut symbols = self.symbols.clone();
        symbols[0] = symbol.to_string();
        Self { symbols }
    }

    /// Copy of this production ending at `symbol` instead
    pub fn with_last(&self, symbol: &str) -> Self {
        let mut symbols = self.symbols.clone();
        let last = symbols.len() - 1;
        symbols[last] = symbol.to_string();
        Self { symbols }
    }

    /// Replaces the end symbol with the tail of `other`, splicing `other`'s
    /// actions in between
    pub fn splice(&self, other: &Production) -> Self {
        let mut symbols = self.symbols[..self.symbols.len() - 1].to_vec();
        symbols.extend_from_slice(other.tail());
        Self { symbols }
    }

    /// Returns true if the production has at least one action and all of its
    /// actions are `_tau`
    pub fn is_silent(&self) -> bool {
        let actions = self.actions();
        !actions.is_empty() && actions.iter().all(|a| a == TAU)
    }
}
