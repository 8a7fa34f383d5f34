mod logging;
mod render;

use std::fs;
use std::io::{self, Read};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use escpos_toolchain_command_tables::CommandTable;
use escpos_toolchain_core::{
    ExpressionFailurePolicy, ParseOptions, RegistrationMode, Registry, UnknownControlPolicy,
    format_listing, to_pretty_json, tokenize_with_options,
};
use escpos_toolchain_diagnostics as diag;
use serde::Serialize;
use tracing::{debug, info};

use crate::logging::{LogFormat, LogLevel, init_logging};
use crate::render::{Format, print_summary, render_diagnostics};

// ── CLI definition ──────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "escpos",
    version,
    about = "ESC/POS toolchain: tokenize and inspect receipt printer byte streams"
)]
struct Cli {
    /// Output mode: "pretty" for human-readable output, "json" for
    /// machine-readable JSON. Defaults to "pretty" when stdout is a TTY,
    /// "json" otherwise.
    #[arg(long, global = true, value_parser = ["pretty", "json"])]
    output: Option<String>,

    /// Log encoding on stderr.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Most verbose log level to emit.
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Warn)]
    log_level: LogLevel,

    #[command(subcommand)]
    cmd: Cmd,
}

/// Where the command set comes from.
#[derive(clap::Args, Debug)]
struct TableArgs {
    /// Command table JSON to register after the built-in set.
    #[arg(long)]
    tables: Option<String>,
    /// Skip the built-in ESC/POS command set.
    #[arg(long)]
    no_builtin: bool,
    /// Let a later prefix signature silently shadow an earlier one instead of
    /// rejecting it.
    #[arg(long)]
    legacy_registration: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Tokenize an ESC/POS byte stream ("-" reads stdin).
    Tokenize {
        file: String,
        #[command(flatten)]
        table: TableArgs,
        /// Handling of control bytes that start no registered command.
        #[arg(long, value_enum, default_value_t = UnknownArg::Drop)]
        unknown: UnknownArg,
        /// Handling of length formulas that fail to evaluate.
        #[arg(long, value_enum, default_value_t = ExprFailureArg::Zero)]
        on_expr_error: ExprFailureArg,
    },

    /// List the registered command set.
    Commands {
        #[command(flatten)]
        table: TableArgs,
    },

    /// Explain a diagnostic ID (e.g. ESC1102).
    Explain { id: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum UnknownArg {
    /// Skip the byte.
    Drop,
    /// Keep the byte as an `unknown` token.
    Emit,
    /// Stop with an error.
    Abort,
}

impl From<UnknownArg> for UnknownControlPolicy {
    fn from(arg: UnknownArg) -> Self {
        match arg {
            UnknownArg::Drop => UnknownControlPolicy::Drop,
            UnknownArg::Emit => UnknownControlPolicy::Emit,
            UnknownArg::Abort => UnknownControlPolicy::Abort,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ExprFailureArg {
    /// Use an empty payload and warn.
    Zero,
    /// Stop with an error.
    Abort,
}

impl From<ExprFailureArg> for ExpressionFailurePolicy {
    fn from(arg: ExprFailureArg) -> Self {
        match arg {
            ExprFailureArg::Zero => ExpressionFailurePolicy::Zero,
            ExprFailureArg::Abort => ExpressionFailurePolicy::Abort,
        }
    }
}

// ── Main ────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);
    let format = Format::resolve_or_detect(cli.output.as_deref());

    match cli.cmd {
        Cmd::Tokenize {
            file,
            table,
            unknown,
            on_expr_error,
        } => {
            let options = ParseOptions::default()
                .with_unknown_control(unknown.into())
                .with_expression_failure(on_expr_error.into());
            cmd_tokenize(&file, &table, options, format)?;
        }
        Cmd::Commands { table } => cmd_commands(&table, format)?,
        Cmd::Explain { id } => cmd_explain(&id, format)?,
    }

    Ok(())
}

// ── Commands ────────────────────────────────────────────────────────────

fn cmd_tokenize(file: &str, table: &TableArgs, options: ParseOptions, format: Format) -> Result<()> {
    let input = read_input(file)?;
    let registry = load_registry(table)?;
    let res = tokenize_with_options(&registry, &input, &options)
        .with_context(|| format!("tokenizing {file} aborted"))?;

    match format {
        Format::Json => {
            // Single valid JSON object to stdout.
            println!("{}", to_pretty_json(&res));
        }
        Format::Pretty => {
            // Listing to stdout, diagnostics to stderr.
            print!("{}", format_listing(&res.tokens));
            if !res.diagnostics.is_empty() {
                render_diagnostics(&input, file, &res.diagnostics);
                print_summary(&res.diagnostics);
            }
        }
    }

    Ok(())
}

/// One row of `escpos commands`.
#[derive(Serialize)]
struct CommandRow<'a> {
    id: &'a str,
    signature: String,
    length: String,
    description: &'a str,
}

fn cmd_commands(table: &TableArgs, format: Format) -> Result<()> {
    let registry = load_registry(table)?;
    let rows: Vec<CommandRow<'_>> = registry
        .definitions()
        .map(|d| CommandRow {
            id: &d.id,
            signature: d.signature_hex(),
            length: d.length_policy.to_string(),
            description: &d.description,
        })
        .collect();

    match format {
        Format::Json => {
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        Format::Pretty => {
            let id_w = rows.iter().map(|r| r.id.len()).max().unwrap_or(0);
            let sig_w = rows.iter().map(|r| r.signature.len()).max().unwrap_or(0);
            for r in &rows {
                println!(
                    "{:<id_w$}  {:<sig_w$}  {}{}",
                    r.id,
                    r.signature,
                    r.length,
                    if r.description.is_empty() {
                        String::new()
                    } else {
                        format!("  # {}", r.description)
                    }
                );
            }
        }
    }
    Ok(())
}

fn cmd_explain(id: &str, format: Format) -> Result<()> {
    match format {
        Format::Json => {
            let text = diag::explain(id);
            let out = serde_json::json!({
                "id": id,
                "explanation": text,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Format::Pretty => {
            // Explanation is the command output, so stdout.
            if let Some(text) = diag::explain(id) {
                use ariadne::Fmt;
                println!("{}: {}", id.fg(ariadne::Color::Cyan), text);
            } else {
                println!("{}: (no explanation available)", id);
            }
        }
    }
    Ok(())
}

// ── Helpers ─────────────────────────────────────────────────────────────

/// Read the whole input file, or stdin for `-`.
fn read_input(file: &str) -> Result<Vec<u8>> {
    if file == "-" {
        let mut buf = Vec::new();
        io::stdin()
            .read_to_end(&mut buf)
            .context("failed to read stdin")?;
        return Ok(buf);
    }
    fs::read(file).with_context(|| format!("failed to read input file '{file}'"))
}

/// Build the registry from (in order):
///   1. The built-in command set, unless `--no-builtin`
///   2. The `--tables` file, if given
fn load_registry(args: &TableArgs) -> Result<Registry> {
    let mut table = if args.no_builtin {
        CommandTable::new(Vec::new())
    } else {
        CommandTable::builtin()
    };

    if let Some(path) = &args.tables {
        let json = fs::read_to_string(path)
            .with_context(|| format!("failed to read tables file '{path}'"))?;
        let extra = CommandTable::from_json(&json)
            .with_context(|| format!("failed to parse tables file '{path}'"))?;
        debug!(path = %path, commands = extra.commands.len(), "loaded command table");
        table.extend(extra);
    }

    let mode = if args.legacy_registration {
        RegistrationMode::Legacy
    } else {
        RegistrationMode::Strict
    };
    let registry = Registry::from_table(&table, mode).context("invalid command table")?;
    info!(commands = registry.len(), ?mode, "registry ready");
    Ok(registry)
}
