// Copyright 2025 Cornell University
// released under MIT License

use std::time::Instant;

use log::{debug, info};
use rayon::prelude::*;

use crate::continuation::{common_continuation_relation, component_continuation_relation};
use crate::errors::{SynthesisError, SynthesisResult};
use crate::extract::extract_productions;
use crate::grammar::{group_alternatives, Grammar};
use crate::ir::{ComponentId, Instance, Specification};
use crate::relation::StringRelation;
use crate::rewrite::rewrite_productions;
use crate::serialize::{serialize_component, serialize_header, serialize_system, RenderOptions};
use crate::simplify::{simplify, SimplifyStats};

/// Receives progress messages. Never influences the outcome of a run.
pub trait StatusSink {
    fn status(&mut self, message: &str);
}

impl StatusSink for Vec<String> {
    fn status(&mut self, message: &str) {
        self.push(message.to_string());
    }
}

/// Forwards status messages to the `log` facade
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl StatusSink for LogSink {
    fn status(&mut self, message: &str) {
        info!("{message}");
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SynthesisOptions {
    /// emit deterministic processes
    pub late_semantics: bool,
    /// synthesise components on the rayon thread pool
    pub parallel: bool,
}

/// The simplified grammar of one component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisedComponent {
    pub name: String,
    pub grammar: Grammar,
    pub stats: SimplifyStats,
}

#[derive(Debug, Clone, Default)]
pub struct Synthesiser {
    options: SynthesisOptions,
}

impl Synthesiser {
    pub fn new(options: SynthesisOptions) -> Self {
        Self { options }
    }

    /// Builds the grammar of one component before it is simplified.
    pub fn component_grammar(
        &self,
        spec: &Specification,
        common: &StringRelation,
        component: ComponentId,
    ) -> SynthesisResult<(String, Grammar)> {
        let c = spec
            .component(component)
            .ok_or_else(|| SynthesisError::unknown_component(component))?;
        let context = format!("instance of component {}", c.name());
        if let Some((scenario, _)) = c.instances().find(|(id, _)| spec.scenario(*id).is_none()) {
            return Err(SynthesisError::unknown_scenario(scenario, context));
        }

        // a scenario without an instance of this component is an empty one
        let empty = Instance::default();
        let instances: Vec<(&str, &Instance)> = spec
            .scenarios()
            .map(|(id, b)| (b.name(), c.instance(id).unwrap_or(&empty)))
            .collect();

        let relation = component_continuation_relation(common, instances.iter().copied());
        let productions = extract_productions(instances.iter().copied());
        let rewritten = rewrite_productions(&productions, &relation);
        debug!(
            "{}: {} productions, {} after rewriting",
            c.name(),
            productions.len(),
            rewritten.len()
        );

        let grammar = Grammar::new(group_alternatives(rewritten)?)?;
        grammar.check_invariants()?;
        Ok((c.name().to_string(), grammar))
    }

    /// Builds and simplifies the grammar of one component.
    pub fn synthesise_component(
        &self,
        spec: &Specification,
        common: &StringRelation,
        component: ComponentId,
    ) -> SynthesisResult<SynthesisedComponent> {
        let (name, mut grammar) = self.component_grammar(spec, common, component)?;
        let before = grammar.num_rules();
        let stats = simplify(&mut grammar);
        grammar.check_invariants()?;
        debug!(
            "{}: simplified from {} to {} rules",
            name,
            before,
            grammar.num_rules()
        );
        Ok(SynthesisedComponent {
            name,
            grammar,
            stats,
        })
    }

    /// Synthesises all components, in declaration order.
    pub fn synthesise_grammars(
        &self,
        spec: &Specification,
    ) -> SynthesisResult<Vec<SynthesisedComponent>> {
        let common = common_continuation_relation(spec)?;
        let ids = spec.component_ids();
        let results: Vec<SynthesisResult<SynthesisedComponent>> = if self.options.parallel {
            ids.par_iter()
                .map(|id| self.synthesise_component(spec, &common, *id))
                .collect()
        } else {
            ids.iter()
                .map(|id| self.synthesise_component(spec, &common, *id))
                .collect()
        };
        // merged in order so that the output does not depend on scheduling
        results.into_iter().collect()
    }

    /// Synthesises the FSP text for `spec` and reports the time it took to `sink`.
    pub fn synthesise_fsp(
        &self,
        spec: &Specification,
        sink: &mut impl StatusSink,
    ) -> SynthesisResult<String> {
        let start = Instant::now();
        let render = RenderOptions {
            late_semantics: self.options.late_semantics,
        };

        let mut out = Vec::new();
        serialize_header(&mut out)?;
        let components = self.synthesise_grammars(spec)?;
        for component in components.iter() {
            serialize_component(&mut out, &component.name, &component.grammar, render)?;
        }
        serialize_system(&mut out, components.iter().map(|c| c.name.as_str()))?;
        let text = String::from_utf8(out).map_err(|e| SynthesisError::Output(e.to_string()))?;

        sink.status(&format!(
            "Total synthesis time: {} milliseconds.",
            start.elapsed().as_millis()
        ));
        Ok(text)
    }
}
