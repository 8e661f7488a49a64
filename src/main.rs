// Copyright 2025 Cornell University
// released under MIT License

use std::io::Write;

use anyhow::Context;
use clap::ColorChoice;
use clap::Parser;
use clap_verbosity_flag::{log::LevelFilter, Verbosity, WarnLevel};
use log::info;
use mscsynth::diagnostic::DiagnosticHandler;
use mscsynth::parser::parse_file;
use mscsynth::serialize::serialize_hmsc_check_to_string;
use mscsynth::synthesis::{LogSink, SynthesisOptions, Synthesiser};

/// Synthesises one FSP process per component from a scenario (.msc) file
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a scenario (.msc) file
    #[arg(value_name = "MSC_FILE")]
    input: String,

    /// Write the FSP specification to this file instead of stdout
    #[arg(short, long, value_name = "FSP_FILE")]
    output: Option<String>,

    /// Emit deterministic processes (late semantics)
    #[arg(short, long)]
    deterministic: bool,

    /// Append the hMSC cross-check processes
    #[arg(long)]
    check: bool,

    /// Synthesise the components in parallel
    #[arg(short = 'j', long)]
    parallel: bool,

    /// Users can specify `-v` or `--verbose` to toggle logging
    #[command(flatten)]
    verbosity: Verbosity<WarnLevel>,

    /// Pass in `--color never` to suppress colored error messages.
    #[arg(long, value_name = "COLOR_CHOICE", default_value = "auto")]
    color: ColorChoice,
}

/// Examples:
/// ```
/// $ cargo run -- tests/login.msc
/// $ cargo run -- tests/order.msc --check -o order.lts -v
/// ```
fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // For concision, we disable timestamps in the log
    let mut logger = env_logger::Builder::new();
    logger
        .format_timestamp(None)
        .filter_level(cli.verbosity.log_level_filter());
    if cli.color == ColorChoice::Never {
        logger.write_style(env_logger::WriteStyle::Never);
    }
    logger.init();

    // Print warning messages only if `--verbose` is enabled
    let emit_warnings = cli.verbosity.log_level_filter() >= LevelFilter::Info;
    let mut handler = DiagnosticHandler::new(cli.color).with_warnings(emit_warnings);
    let spec = parse_file(&cli.input, &mut handler)?;

    let synthesiser = Synthesiser::new(SynthesisOptions {
        late_semantics: cli.deterministic,
        parallel: cli.parallel,
    });
    let mut fsp = synthesiser.synthesise_fsp(&spec, &mut LogSink)?;
    if cli.check {
        fsp.push('\n');
        fsp.push_str(&serialize_hmsc_check_to_string(&spec)?);
    }

    match &cli.output {
        Some(path) => {
            std::fs::write(path, &fsp).with_context(|| format!("failed to write {path}"))?;
            info!("wrote {path}");
        }
        None => std::io::stdout().write_all(fsp.as_bytes())?,
    }
    Ok(())
}
