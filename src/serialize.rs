// Copyright 2025 Cornell University
// released under MIT License

use crate::grammar::{AltProduction, Grammar};
use crate::ir::{Production, Specification, FINAL, TAU};
use itertools::Itertools;
use std::io::Write;

/// Pretty prints a `Production` as its symbols joined by arrows
impl std::fmt::Display for Production {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbols().iter().join(" -> "))
    }
}

/// Output options for a single component process
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// prefix every process with `deterministic`
    pub late_semantics: bool,
}

fn to_string(out: Vec<u8>) -> std::io::Result<String> {
    String::from_utf8(out).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

/// Comment line that starts every generated file
pub fn serialize_header(out: &mut impl Write) -> std::io::Result<()> {
    writeln!(
        out,
        "// Automatically generated by {} {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    )
}

/// Pretty prints a rule: `X = (a -> Y | b -> Z)`, or `X = STOP` if it has no alternatives
pub fn serialize_rule(rule: &AltProduction) -> String {
    if rule.is_empty() {
        format!("{} = STOP", rule.symbol())
    } else {
        let alternatives = rule
            .alternatives()
            .iter()
            .map(|a| a.tail().iter().join(" -> "))
            .join(" | ");
        format!("{} = ({})", rule.symbol(), alternatives)
    }
}

/// Rules in output order: the start symbol first, all others by symbol
fn ordered_rules(grammar: &Grammar) -> impl Iterator<Item = &AltProduction> {
    grammar
        .rule(grammar.start())
        .into_iter()
        .chain(grammar.rules().filter(move |r| r.symbol() != grammar.start()))
}

/// Serializes the grammar of one component as an FSP process named `name`.
pub fn serialize_component(
    out: &mut impl Write,
    name: &str,
    grammar: &Grammar,
    options: RenderOptions,
) -> std::io::Result<()> {
    if options.late_semantics {
        write!(out, "deterministic ")?;
    }
    write!(out, "minimal {} = {}", name, grammar.start())?;

    for rule in ordered_rules(grammar) {
        write!(out, ",\n{}", serialize_rule(rule))?;
    }

    let has_final =
        !grammar.has_rule(FINAL) && grammar.alternatives().any(|a| a.last() == FINAL);
    let has_tau = grammar
        .alternatives()
        .any(|a| a.actions().iter().any(|s| s == TAU));
    if has_final {
        writeln!(out, ",\n{FINAL} = ({TAU}->STOP)\\{{{TAU}}}.")?;
    } else if has_tau {
        writeln!(out, "\\{{{TAU}}}.")?;
    } else {
        writeln!(out, ".")?;
    }
    writeln!(out)
}

pub fn serialize_component_to_string(
    name: &str,
    grammar: &Grammar,
    options: RenderOptions,
) -> std::io::Result<String> {
    let mut out = Vec::new();
    serialize_component(&mut out, name, grammar, options)?;
    to_string(out)
}

/// Serializes the parallel composition of all components
pub fn serialize_system<'a>(
    out: &mut impl Write,
    components: impl IntoIterator<Item = &'a str>,
) -> std::io::Result<()> {
    writeln!(out, "||System = ({}).", components.into_iter().join(" || "))
}

/// Serializes the continuation graph as a deterministic process together with
/// its projection onto every component, so that the composition of the
/// projections can be checked against the graph itself.
pub fn serialize_hmsc_check(out: &mut impl Write, spec: &Specification) -> std::io::Result<()> {
    let initial = spec
        .initial()
        .iter()
        .filter_map(|id| spec.scenario(*id))
        .map(|b| format!("init -> {}", b.name()))
        .join(" | ");
    let mut lines = vec![if initial.is_empty() {
        "deterministic DetHMSC = STOP".to_string()
    } else {
        format!("deterministic DetHMSC = ({initial})")
    }];

    for (id, scenario) in spec.scenarios() {
        let name = scenario.name();
        let successors = spec
            .continuations(id)
            .iter()
            .filter_map(|next| spec.scenario(*next))
            .map(|next| format!("_{} -> {}", name, next.name()))
            .join(" | ");
        if successors.is_empty() {
            lines.push(format!("{name} = STOP"));
        } else {
            lines.push(format!("{name} = ({successors})"));
        }
    }
    writeln!(out, "{}.", lines.join(",\n"))?;
    writeln!(out, "property ||HSMC = DetHMSC\\{{init}}.")?;

    for (_, component) in spec.components() {
        let alphabet = component
            .instances()
            .filter(|(_, instance)| !instance.is_empty())
            .filter_map(|(id, _)| spec.scenario(id))
            .map(|b| format!("_{}", b.name()))
            .join(", ");
        writeln!(
            out,
            "deterministic ||Det{} = DetHMSC@{{{}}}.",
            component.name(),
            alphabet
        )?;
    }
    writeln!(
        out,
        "deterministic ||ComposedHMSC = ({}).",
        spec.components()
            .map(|(_, c)| format!("Det{}", c.name()))
            .join(" || ")
    )?;
    writeln!(out, "||Check = (HSMC || ComposedHMSC).")
}

pub fn serialize_hmsc_check_to_string(spec: &Specification) -> std::io::Result<String> {
    let mut out = Vec::new();
    serialize_hmsc_check(&mut out, spec)?;
    to_string(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::tests::grammar;
    use crate::ir::{Event, Instance};

    fn render(g: &Grammar) -> String {
        serialize_component_to_string("C", g, RenderOptions::default()).unwrap()
    }

    #[test]
    fn production_display() {
        let p = Production::from_symbols(["Init", "a", "b", "C_X"]);
        assert_eq!(p.to_string(), "Init -> a -> b -> C_X");
    }

    #[test]
    fn final_clause_is_shared() {
        let g = grammar(&[&["Init", "m", "Final"]]);
        insta::assert_snapshot!(render(&g), @r"
        minimal C = Init,
        Init = (m -> Final),
        Final = (_tau->STOP)\{_tau}.
        ");
    }

    #[test]
    fn own_final_rule_replaces_shared_clause() {
        let g = grammar(&[&["Init", "a", "Final"], &["Final", "b", "Init"]]);
        insta::assert_snapshot!(render(&g), @r"
        minimal C = Init,
        Init = (a -> Final),
        Final = (b -> Init).
        ");

        let g = grammar(&[&["Init", "a", "Final"], &["Final", TAU, "Init"]]);
        insta::assert_snapshot!(render(&g), @r"
        minimal C = Init,
        Init = (a -> Final),
        Final = (_tau -> Init)\{_tau}.
        ");
    }

    #[test]
    fn tau_is_hidden_without_final() {
        let g = grammar(&[
            &["Init", "a", "C_X"],
            &["C_X", TAU, "E_S1"],
            &["C_X", "b", "Init"],
        ]);
        insta::assert_snapshot!(render(&g), @r"
        minimal C = Init,
        Init = (a -> C_X),
        C_X = (_tau -> E_S1 | b -> Init),
        E_S1 = STOP\{_tau}.
        ");
    }

    #[test]
    fn late_semantics_and_plain_footer() {
        let g = grammar(&[&["Init", "a", "Init"]]);
        let out = serialize_component_to_string(
            "Client",
            &g,
            RenderOptions {
                late_semantics: true,
            },
        )
        .unwrap();
        assert_eq!(
            out,
            "deterministic minimal Client = Init,\nInit = (a -> Init).\n\n"
        );
    }

    #[test]
    fn system_composition() {
        let mut out = Vec::new();
        serialize_system(&mut out, ["Client", "Server"]).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "||System = (Client || Server).\n"
        );
    }

    #[test]
    fn hmsc_check() {
        let mut spec = Specification::default();
        let login = spec.add_scenario("Login");
        let work = spec.add_scenario("Work");
        let logout = spec.add_scenario("Logout");
        spec.add_initial(login);
        spec.add_continuation(login, work);
        spec.add_continuation(work, work);
        spec.add_continuation(work, logout);
        spec.add_final(logout);
        let client = spec.add_component("Client");
        let server = spec.add_component("Server");
        for scenario in [login, work, logout] {
            spec.set_instance(client, scenario, Instance::new(vec![Event::message("x")]));
        }
        spec.set_instance(server, login, Instance::new(vec![Event::message("x")]));
        spec.set_instance(server, work, Instance::default());

        insta::assert_snapshot!(serialize_hmsc_check_to_string(&spec).unwrap(), @r"
        deterministic DetHMSC = (init -> Login),
        Login = (_Login -> Work),
        Work = (_Work -> Work | _Work -> Logout),
        Logout = STOP.
        property ||HSMC = DetHMSC\{init}.
        deterministic ||DetClient = DetHMSC@{_Login, _Work, _Logout}.
        deterministic ||DetServer = DetHMSC@{_Login}.
        deterministic ||ComposedHMSC = (DetClient || DetServer).
        ||Check = (HSMC || ComposedHMSC).
        ");
    }
}
