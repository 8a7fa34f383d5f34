//! Pretty diagnostic rendering using ariadne.
//!
//! Binary input has no lines to point at, so diagnostics are rendered against
//! a hex dump of the input: 16 bytes per line, each byte as two uppercase hex
//! digits followed by a separator. Byte spans are mapped onto that text.

use std::io::{self, IsTerminal};

use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use escpos_toolchain_diagnostics::{Diagnostic, Severity, Span};

const BYTES_PER_LINE: usize = 16;
/// Characters per dumped byte: two hex digits plus a separator.
const CELL: usize = 3;

// ── Output format ───────────────────────────────────────────────────────

/// Output format for command results.
///
/// JSON output embeds diagnostics in the result object; pretty output draws
/// them on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Format {
    /// Listing plus annotated diagnostics (ariadne).
    Pretty,
    /// Machine-readable JSON.
    Json,
}

impl Format {
    /// Use the explicit choice, else pretty for terminals and JSON for pipes.
    pub(crate) fn resolve_or_detect(explicit: Option<&str>) -> Self {
        match explicit {
            Some("json") => Format::Json,
            Some("pretty") => Format::Pretty,
            _ => {
                if io::stdout().is_terminal() {
                    Format::Pretty
                } else {
                    Format::Json
                }
            }
        }
    }
}

// ── Hex dump view ───────────────────────────────────────────────────────

/// Render `bytes` as the dump text diagnostics are drawn on.
fn hex_dump(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * CELL);
    for (i, b) in bytes.iter().enumerate() {
        out.push_str(&format!("{b:02X}"));
        out.push(if i % BYTES_PER_LINE == BYTES_PER_LINE - 1 {
            '\n'
        } else {
            ' '
        });
    }
    out
}

/// Offset in the dump text of the first hex digit of byte `index`.
fn dump_offset(index: usize) -> usize {
    (index / BYTES_PER_LINE) * BYTES_PER_LINE * CELL + (index % BYTES_PER_LINE) * CELL
}

/// Map a byte span onto the dump text, covering the hex digits of every byte
/// in the span. Spans past the end are clamped to the dump.
fn dump_range(span: &Span, input_len: usize, dump_len: usize) -> std::ops::Range<usize> {
    let start = span.start.min(input_len);
    let end = span.end.min(input_len).max(start);
    let from = dump_offset(start).min(dump_len);
    let to = if end > start {
        (dump_offset(end - 1) + 2).min(dump_len)
    } else {
        from
    };
    from..to
}

// ── Severity mapping ────────────────────────────────────────────────────

fn report_kind(severity: &Severity) -> ReportKind<'static> {
    match severity {
        Severity::Warn => ReportKind::Warning,
        Severity::Info => ReportKind::Advice,
        _ => ReportKind::Warning,
    }
}

fn severity_color(severity: &Severity) -> Color {
    match severity {
        Severity::Warn => Color::Yellow,
        Severity::Info => Color::Blue,
        _ => Color::White,
    }
}

fn context_note(diag: &Diagnostic) -> Option<String> {
    if diag.context.is_empty() {
        return None;
    }
    let pairs: Vec<String> = diag
        .context
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect();
    Some(pairs.join(", "))
}

// ── Pretty rendering ────────────────────────────────────────────────────

/// Render diagnostics against a hex dump of `input`, to stderr.
pub(crate) fn render_diagnostics(input: &[u8], filename: &str, diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        return;
    }

    let config = Config::default().with_compact(false);
    let dump = hex_dump(input);
    let mut cache = (filename, Source::from(dump.as_str()));

    for diag in diagnostics {
        let range = dump_range(&diag.span, input.len(), dump.len());
        let label_msg = format!("bytes 0x{:04X}..0x{:04X}", diag.span.start, diag.span.end);

        let mut builder = Report::build(report_kind(&diag.severity), (filename, range.clone()))
            .with_code(diag.id.as_ref())
            .with_message(&diag.message)
            .with_config(config)
            .with_label(
                Label::new((filename, range))
                    .with_message(label_msg)
                    .with_color(severity_color(&diag.severity)),
            );

        if let Some(note) = context_note(diag) {
            builder = builder.with_note(note);
        }
        if let Some(explanation) = diag.explain() {
            builder = builder.with_help(explanation);
        }

        builder.finish().eprint(&mut cache).ok();
    }
}

// ── Summary line ────────────────────────────────────────────────────────

/// Print a coloured summary line, e.g. `1 warning, 3 info`.
pub(crate) fn print_summary(diagnostics: &[Diagnostic]) {
    use ariadne::Fmt;

    let warnings = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Warn)
        .count();
    let infos = diagnostics.len() - warnings;

    let mut parts = Vec::new();
    if warnings > 0 {
        let s = if warnings == 1 { "" } else { "s" };
        parts.push(format!(
            "{}",
            format!("{warnings} warning{s}").fg(Color::Yellow)
        ));
    }
    if infos > 0 {
        parts.push(format!("{}", format!("{infos} info").fg(Color::Blue)));
    }
    if !parts.is_empty() {
        eprintln!("{}", parts.join(", "));
    }
}
