//! Error rendering using ariadne
//!
//! Parse errors are shown against the source with a label on the offending
//! span. Compile and runtime errors have no location and render as a
//! single report header.

use crate::Error;
use ariadne::{Color, Label, Report, ReportKind, Source};
use std::io::Write;

const SOURCE_ID: &str = "<input>";

/// Render an error with formatting to stderr
///
/// # Example
/// ```no_run
/// use blaze::{Session, render_error};
///
/// let mut session = Session::default();
/// let source = "let = 1;";
/// if let Err(e) = session.run(source) {
///     render_error(source, &e);
/// }
/// ```
pub fn render_error(source: &str, error: &Error) {
    render_error_to_writer(source, error, &mut std::io::stderr(), true).ok();
}

/// Render an error to a specific writer
pub fn render_error_to(source: &str, error: &Error, writer: &mut dyn Write) -> std::io::Result<()> {
    render_error_to_writer(source, error, writer, true)
}

/// Render an error to a String (useful for tests, logs, etc.)
pub fn render_error_to_string(source: &str, error: &Error) -> String {
    let mut buf = Vec::new();
    render_error_to_writer(source, error, &mut buf, true).ok();
    String::from_utf8_lossy(&buf).to_string()
}

/// Render an error to a String without color codes (useful for tests)
pub fn render_error_to_string_no_color(source: &str, error: &Error) -> String {
    let mut buf = Vec::new();
    render_error_to_writer(source, error, &mut buf, false).ok();
    String::from_utf8_lossy(&buf).to_string()
}

fn render_error_to_writer(
    source: &str,
    error: &Error,
    writer: &mut dyn Write,
    use_color: bool,
) -> std::io::Result<()> {
    let config = ariadne::Config::default().with_color(use_color);

    let Error::Parse(parse_error) = error else {
        let report = Report::build(ReportKind::Error, (SOURCE_ID, 0..0))
            .with_code(error.stage())
            .with_message(error.to_string())
            .with_config(config);
        return report
            .finish()
            .write((SOURCE_ID, Source::from(source)), &mut *writer);
    };

    // Zero-width spans (e.g. "expected X here") still get one visible column.
    let mut span = parse_error.span.0.clone();
    if span.is_empty() && span.end < source.len() {
        span.end += source[span.start..]
            .chars()
            .next()
            .map_or(1, char::len_utf8);
    }

    let mut report = Report::build(ReportKind::Error, (SOURCE_ID, span.clone()))
        .with_code(error.stage())
        .with_message(format!("Syntax error: {}", parse_error.kind))
        .with_config(config)
        .with_label(
            Label::new((SOURCE_ID, span))
                .with_message(parse_error.kind.to_string())
                .with_color(Color::Red),
        );
    if let Some(help) = parse_error.help() {
        report = report.with_help(help);
    }

    report
        .finish()
        .write((SOURCE_ID, Source::from(source)), &mut *writer)
}
