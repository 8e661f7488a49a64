// Copyright 2025 Cornell University
// released under MIT License

use std::io::Write;

use clap::ColorChoice;
use codespan_reporting::diagnostic::{
    Diagnostic as CodespanDiagnostic, Label as CodespanLabel, LabelStyle, Severity,
};
use codespan_reporting::files::{Error as FilesError, SimpleFiles};
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{Buffer, Color, ColorSpec, WriteColor};
use log::error;
use pest::iterators::Pair;
use pest::RuleType;
use rustc_hash::FxHashSet;

/// Severity of diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Error,
    Warning,
}

/// A label representing a part of the source code
#[derive(Debug, Clone, PartialEq, Eq)]
struct Label {
    message: Option<String>,
    range: (usize, usize),
}

impl Label {
    fn to_codespan_label(&self, fileid: usize) -> CodespanLabel<usize> {
        CodespanLabel::new(LabelStyle::Primary, fileid, self.range.0..self.range.1)
            .with_message(self.message.clone().unwrap_or_default())
    }
}

/// Diagnostic of a particular part of an input file
struct Diagnostic {
    title: String,
    message: String,
    level: Level,
    location: Option<(usize, Label)>,
}

impl Diagnostic {
    fn emit(
        &self,
        buffer: &mut Buffer,
        files: &SimpleFiles<String, String>,
    ) -> Result<(), FilesError> {
        if let Some((fileid, label)) = &self.location {
            let severity = match self.level {
                Level::Error => Severity::Error,
                Level::Warning => Severity::Warning,
            };

            let diagnostic = CodespanDiagnostic::new(severity)
                .with_message(&self.message)
                .with_labels(vec![label.to_codespan_label(*fileid)]);

            let config = term::Config::default();
            term::emit(buffer, &config, files, &diagnostic)
        } else {
            let color = match self.level {
                Level::Error => Color::Red,
                Level::Warning => Color::Yellow,
            };

            buffer.set_color(ColorSpec::new().set_bold(true).set_fg(Some(color)))?;
            write!(buffer, "{}", self.title)?;
            buffer.set_color(&ColorSpec::new())?;
            writeln!(buffer, ": {}", self.message)?;
            Ok(())
        }
    }
}

/// Collects and prints diagnostics about scenario files.
///
/// Every emitted diagnostic is printed to stderr and appended to
/// [`DiagnosticHandler::error_string`]. Warnings are dropped unless
/// enabled with [`DiagnosticHandler::with_warnings`].
pub struct DiagnosticHandler {
    files: SimpleFiles<String, String>,
    reported: FxHashSet<(usize, usize, usize, Level)>,
    error_string: String,
    /// `color_choice` indicates whether to emit messages w/ ANSI colors
    color_choice: ColorChoice,
    emit_warnings: bool,
    num_errors: usize,
}

impl Default for DiagnosticHandler {
    /// Default `DiagnosticHandler` does not emit colored messages
    fn default() -> Self {
        Self::new(ColorChoice::Never)
    }
}

impl DiagnosticHandler {
    pub fn new(color_choice: ColorChoice) -> Self {
        Self {
            files: SimpleFiles::new(),
            reported: FxHashSet::default(),
            error_string: String::new(),
            color_choice,
            emit_warnings: false,
            num_errors: 0,
        }
    }

    pub fn with_warnings(mut self, emit_warnings: bool) -> Self {
        self.emit_warnings = emit_warnings;
        self
    }

    /// Creates a buffer for diagnostics
    /// (different buffers are created based on whether we want colors or not)
    fn create_buffer(&self) -> Buffer {
        if self.color_choice == ColorChoice::Never {
            Buffer::no_color()
        } else {
            Buffer::ansi()
        }
    }

    pub fn add_file(&mut self, name: String, content: String) -> usize {
        self.files.add(name, content)
    }

    pub fn error_string(&self) -> &str {
        &self.error_string
    }

    /// Number of errors emitted so far
    pub fn num_errors(&self) -> usize {
        self.num_errors
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        if diagnostic.level == Level::Warning && !self.emit_warnings {
            return;
        }
        if let Some((fileid, label)) = &diagnostic.location {
            // the same problem may be found more than once
            let key = (*fileid, label.range.0, label.range.1, diagnostic.level);
            if !self.reported.insert(key) {
                return;
            }
        }
        if diagnostic.level == Level::Error {
            self.num_errors += 1;
        }

        let mut buffer = self.create_buffer();
        if let Err(e) = diagnostic.emit(&mut buffer, &self.files) {
            error!("failed to render diagnostic `{}`: {e}", diagnostic.message);
            return;
        }
        let msg = String::from_utf8_lossy(buffer.as_slice());
        self.error_string.push_str(&msg);
        eprint!("{}", msg);
    }

    /// Note: we make this function parametric over any type `R`
    /// that implements Pest's `RuleType` trait
    /// so that we can call this function from different parsers
    pub fn emit_diagnostic_parsing<R: RuleType>(
        &mut self,
        message: &str,
        fileid: usize,
        pair: &Pair<'_, R>,
        level: Level,
    ) {
        let span = pair.as_span();
        self.emit_diagnostic_lexing(message, fileid, span.start(), span.end(), level);
    }

    pub fn emit_diagnostic_lexing(
        &mut self,
        message: &str,
        fileid: usize,
        start: usize,
        end: usize,
        level: Level,
    ) {
        let label = Label {
            message: Some(message.to_string()),
            range: (start, end),
        };
        self.report(Diagnostic {
            title: format!("{:?} in file {}", level, fileid),
            message: message.to_string(),
            level,
            location: Some((fileid, label)),
        });
    }

    pub fn emit_general_message(&mut self, message: &str, level: Level) {
        self.report(Diagnostic {
            title: format!("{:?}", level),
            message: message.to_string(),
            level,
            location: None,
        });
    }
}
