// Copyright 2025 Cornell University
// released under MIT License

use std::collections::VecDeque;
use std::path::Path;

use anyhow::{bail, Context};
use log::info;
use pest::error::InputLocation;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use rustc_hash::FxHashSet;

use crate::diagnostic::{DiagnosticHandler, Level};
use crate::ir::{ComponentId, Event, Instance, ScenarioId, Specification};

#[derive(Parser)]
#[grammar = "msc.pest"]
struct MscParser;

/// hMSC node that precedes the initial bMSCs
const HMSC_INIT: &str = "init";
/// hMSC node that follows the final bMSCs
const HMSC_FINAL: &str = "final";

struct ParserContext<'a, 'i> {
    spec: Specification,
    fileid: usize,
    handler: &'a mut DiagnosticHandler,
    /// name of every bMSC with its location, in declaration order
    scenario_spans: Vec<(ScenarioId, usize, usize)>,
    /// hMSC edges are resolved once all bMSCs are known
    edges: Vec<(Pair<'i, Rule>, Pair<'i, Rule>)>,
}

impl<'i> ParserContext<'_, 'i> {
    fn error(&mut self, message: &str, pair: &Pair<'i, Rule>) {
        self.handler
            .emit_diagnostic_parsing(message, self.fileid, pair, Level::Error);
    }

    fn parse_components(&mut self, pair: Pair<'i, Rule>) {
        for name in pair.into_inner() {
            if self.spec.component_id_from_name(name.as_str()).is_some() {
                let msg = format!("component `{}` is declared more than once", name.as_str());
                self.error(&msg, &name);
            } else {
                self.spec.add_component(name.as_str());
            }
        }
    }

    fn parse_bmsc(&mut self, pair: Pair<'i, Rule>) {
        let mut inner = pair.into_inner();
        let Some(name) = inner.next() else {
            return;
        };
        let scenario = match name.as_str() {
            HMSC_INIT | HMSC_FINAL => {
                let msg = format!("`{}` is reserved for the hMSC", name.as_str());
                self.error(&msg, &name);
                return;
            }
            n if self.spec.scenario_id_from_name(n).is_some() => {
                let msg = format!("bMSC `{n}` is defined more than once");
                self.error(&msg, &name);
                return;
            }
            n => self.spec.add_scenario(n),
        };
        let span = name.as_span();
        self.scenario_spans.push((scenario, span.start(), span.end()));

        let mut seen: FxHashSet<ComponentId> = FxHashSet::default();
        for instance in inner {
            self.parse_instance(scenario, instance, &mut seen);
        }
    }

    fn parse_instance(
        &mut self,
        scenario: ScenarioId,
        pair: Pair<'i, Rule>,
        seen: &mut FxHashSet<ComponentId>,
    ) {
        let mut inner = pair.into_inner();
        let Some(name) = inner.next() else {
            return;
        };
        let Some(component) = self.spec.component_id_from_name(name.as_str()) else {
            let msg = format!("undeclared component `{}`", name.as_str());
            self.error(&msg, &name);
            return;
        };
        if !seen.insert(component) {
            let msg = format!(
                "component `{}` has more than one instance in bMSC `{}`",
                name.as_str(),
                self.spec[scenario].name()
            );
            self.error(&msg, &name);
            return;
        }

        let mut events = Instance::default();
        for event in inner {
            let rule = event.as_rule();
            let label = event.into_inner().as_str();
            match rule {
                Rule::message => events.push(Event::message(label)),
                Rule::condition => events.push(Event::condition(label)),
                rule => unreachable!("instance expected an event, found {:?}", rule),
            }
        }
        self.spec.set_instance(component, scenario, events);
    }

    fn collect_edges(&mut self, pair: Pair<'i, Rule>) {
        let mut inner = pair.into_inner();
        let Some(from) = inner.next() else {
            return;
        };
        for to in inner {
            self.edges.push((from.clone(), to));
        }
    }

    fn resolve_node(&mut self, pair: &Pair<'i, Rule>) -> Option<ScenarioId> {
        let id = self.spec.scenario_id_from_name(pair.as_str());
        if id.is_none() {
            let msg = format!("unknown bMSC `{}`", pair.as_str());
            self.error(&msg, pair);
        }
        id
    }

    fn resolve_edges(&mut self) {
        for (from, to) in std::mem::take(&mut self.edges) {
            match (from.as_str(), to.as_str()) {
                (HMSC_INIT, HMSC_FINAL) => {
                    self.error("`init` cannot be followed by `final` directly", &to);
                }
                (_, HMSC_INIT) => self.error("`init` cannot have predecessors", &to),
                (HMSC_FINAL, _) => self.error("`final` cannot have successors", &from),
                (HMSC_INIT, _) => {
                    if let Some(to) = self.resolve_node(&to) {
                        self.spec.add_initial(to);
                    }
                }
                (_, HMSC_FINAL) => {
                    if let Some(from) = self.resolve_node(&from) {
                        self.spec.add_final(from);
                    }
                }
                _ => {
                    let from = self.resolve_node(&from);
                    let to = self.resolve_node(&to);
                    if let (Some(from), Some(to)) = (from, to) {
                        self.spec.add_continuation(from, to);
                    }
                }
            }
        }
    }

    /// Every component takes part in every bMSC, possibly with an empty instance.
    fn add_missing_instances(&mut self) {
        for component in self.spec.component_ids() {
            for scenario in self.spec.scenario_ids() {
                if self.spec[component].instance(scenario).is_none() {
                    self.spec
                        .set_instance(component, scenario, Instance::default());
                }
            }
        }
    }

    fn warn_unreachable(&mut self) {
        if self.spec.initial().is_empty() && !self.scenario_spans.is_empty() {
            self.handler
                .emit_general_message("the hMSC has no `init` edge", Level::Warning);
            return;
        }

        let mut reached: FxHashSet<ScenarioId> = self.spec.initial().iter().copied().collect();
        let mut todo: VecDeque<ScenarioId> = self.spec.initial().iter().copied().collect();
        while let Some(scenario) = todo.pop_front() {
            for next in self.spec.continuations(scenario) {
                if reached.insert(*next) {
                    todo.push_back(*next);
                }
            }
        }

        for (scenario, start, end) in self.scenario_spans.clone() {
            if !reached.contains(&scenario) {
                let msg = format!(
                    "bMSC `{}` is unreachable from `init`",
                    self.spec[scenario].name()
                );
                self.handler
                    .emit_diagnostic_lexing(&msg, self.fileid, start, end, Level::Warning);
            }
        }
    }
}

/// Parses the scenario description in `input`, reporting problems through
/// `handler`. `name` is only used in diagnostics.
pub fn parse_str(
    name: &str,
    input: &str,
    handler: &mut DiagnosticHandler,
) -> anyhow::Result<Specification> {
    let fileid = handler.add_file(name.to_string(), input.to_string());

    let file = match MscParser::parse(Rule::file, input) {
        Ok(mut pairs) => pairs.next().context("empty parse tree")?,
        Err(err) => {
            let (start, end) = match err.location {
                InputLocation::Pos(start) => (start, start),
                InputLocation::Span(span) => span,
            };
            let msg = format!("Lexing failed: {}", err.variant.message());
            handler.emit_diagnostic_lexing(&msg, fileid, start, end, Level::Error);
            bail!(msg);
        }
    };

    let errors_before = handler.num_errors();
    let mut context = ParserContext {
        spec: Specification::default(),
        fileid,
        handler,
        scenario_spans: vec![],
        edges: vec![],
    };
    for pair in file.into_inner() {
        match pair.as_rule() {
            Rule::components => context.parse_components(pair),
            Rule::bmsc => context.parse_bmsc(pair),
            Rule::hmsc => {
                for edge in pair.into_inner() {
                    context.collect_edges(edge);
                }
            }
            Rule::EOI => (),
            rule => unreachable!("unexpected top level item {:?}", rule),
        }
    }
    context.resolve_edges();
    context.add_missing_instances();
    context.warn_unreachable();

    let errors = context.handler.num_errors() - errors_before;
    if errors > 0 {
        bail!("{name}: found {errors} error(s)");
    }
    let spec = context.spec;
    info!(
        "loaded {}: {} bMSCs, {} components",
        name,
        spec.scenario_ids().len(),
        spec.component_ids().len()
    );
    Ok(spec)
}

/// Loads a scenario file.
pub fn parse_file(
    filename: impl AsRef<Path>,
    handler: &mut DiagnosticHandler,
) -> anyhow::Result<Specification> {
    let path = filename.as_ref();
    let input = std::fs::read_to_string(path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    parse_str(&path.display().to_string(), &input, handler)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use strip_ansi_escapes::strip_str;

    use super::*;

    fn parse_err(input: &str) -> String {
        let mut handler = DiagnosticHandler::default();
        let result = parse_str("test.msc", input, &mut handler);
        assert!(result.is_err(), "expected an error for:\n{input}");
        strip_str(handler.error_string())
    }

    #[test]
    fn parse_login() {
        let mut handler = DiagnosticHandler::default();
        let spec = parse_file("tests/login.msc", &mut handler).unwrap();
        assert_eq!(handler.error_string(), "");

        let login = spec.scenario_id_from_name("Login").unwrap();
        let work = spec.scenario_id_from_name("Work").unwrap();
        let logout = spec.scenario_id_from_name("Logout").unwrap();
        assert_eq!(spec.initial(), &[login]);
        assert_eq!(spec.finals(), &[logout]);
        assert_eq!(spec.continuations(login), &[work, logout]);
        assert_eq!(spec.continuations(logout), &[login]);

        let client = spec.component_id_from_name("Client").unwrap();
        let server = spec.component_id_from_name("Server").unwrap();
        assert_eq!(
            spec[client].instance(login).unwrap().events(),
            &[
                Event::condition("Init"),
                Event::message("login"),
                Event::condition("LoggedIn"),
            ]
        );
        assert_eq!(spec[server].instances().count(), 3);
    }

    #[test]
    fn missing_instances_are_empty() {
        let mut handler = DiagnosticHandler::default();
        let spec = parse_str(
            "test.msc",
            "component A, B;\n\
             bmsc S1 { instance A { message m; } }\n\
             hmsc { init -> S1; S1 -> final; }",
            &mut handler,
        )
        .unwrap();
        let b = spec.component_id_from_name("B").unwrap();
        let s1 = spec.scenario_id_from_name("S1").unwrap();
        assert!(spec[b].instance(s1).unwrap().is_empty());
    }

    #[test]
    fn parse_from_temp_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "// only a comment and a component").unwrap();
        writeln!(file, "component Lonely;").unwrap();
        let mut handler = DiagnosticHandler::default();
        let spec = parse_file(file.path(), &mut handler).unwrap();
        assert_eq!(spec.component_ids().len(), 1);
        assert!(spec.scenario_ids().is_empty());
    }

    #[test]
    fn missing_file() {
        let mut handler = DiagnosticHandler::default();
        let err = parse_file("tests/does_not_exist.msc", &mut handler).unwrap_err();
        assert!(err.to_string().contains("failed to load"));
    }

    #[test]
    fn lexing_error() {
        let content = parse_err("component A;\nbmsc S1 { instance A { send m; } }");
        assert!(content.contains("Lexing failed"));
        assert!(content.contains("test.msc:2:"));
    }

    #[test]
    fn undeclared_component() {
        let mut handler = DiagnosticHandler::default();
        assert!(parse_file("tests/undeclared_component.msc", &mut handler).is_err());
        let content = strip_str(handler.error_string());
        assert!(content.contains("undeclared component `Server`"));
    }

    #[test]
    fn unknown_bmsc_in_hmsc() {
        let content = parse_err("bmsc S1 { }\nhmsc { init -> S1; S1 -> S2; }");
        assert!(content.contains("unknown bMSC `S2`"));
    }

    #[test]
    fn duplicates() {
        let content = parse_err("bmsc S1 { }\nbmsc S1 { }");
        assert!(content.contains("bMSC `S1` is defined more than once"));

        let content = parse_err("component A;\nbmsc S1 { instance A { } instance A { } }");
        assert!(content.contains("component `A` has more than one instance in bMSC `S1`"));

        let content = parse_err("component A, A;");
        assert!(content.contains("component `A` is declared more than once"));
    }

    #[test]
    fn malformed_hmsc_edges() {
        let content = parse_err("bmsc init { }");
        assert!(content.contains("`init` is reserved for the hMSC"));

        let content = parse_err("bmsc S1 { }\nhmsc { init -> final; S1 -> init; final -> S1; }");
        assert!(content.contains("`init` cannot be followed by `final` directly"));
        assert!(content.contains("`init` cannot have predecessors"));
        assert!(content.contains("`final` cannot have successors"));
    }

    #[test]
    fn unreachable_bmsc_warning() {
        let input = "bmsc S1 { }\nbmsc S2 { }\nhmsc { init -> S1; }";
        let mut handler = DiagnosticHandler::default().with_warnings(true);
        parse_str("test.msc", input, &mut handler).unwrap();
        let content = strip_str(handler.error_string());
        assert!(content.contains("warning: bMSC `S2` is unreachable from `init`"));
        assert!(!content.contains("`S1` is unreachable"));

        let mut handler = DiagnosticHandler::default().with_warnings(true);
        parse_str("test.msc", "bmsc S1 { }\nbmsc S2 { }", &mut handler).unwrap();
        assert_eq!(
            strip_str(handler.error_string()),
            "Warning: the hMSC has no `init` edge\n"
        );

        // warnings are off by default
        let mut handler = DiagnosticHandler::default();
        parse_str("test.msc", input, &mut handler).unwrap();
        assert_eq!(handler.error_string(), "");
    }
}
