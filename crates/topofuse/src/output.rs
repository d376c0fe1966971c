//! Output formatting: table, JSON, YAML, plain.
//!
//! Table uses `tabled`, structured formats serialize the original data via
//! serde, plain emits one identifier per line.

use std::io::{self, IsTerminal, Write};

use tabled::{Table, Tabled, settings::Style};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render `data` in the chosen format. `table_fn` builds the human view
/// and `plain_fn` the one-value-per-line view.
pub fn render<T>(
    format: OutputFormat,
    data: &T,
    table_fn: impl FnOnce(&T) -> String,
    plain_fn: impl FnOnce(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize + ?Sized,
{
    match format {
        OutputFormat::Table => Ok(table_fn(data)),
        OutputFormat::Json => serde_json::to_string_pretty(data).map_err(render_err),
        OutputFormat::JsonCompact => serde_json::to_string(data).map_err(render_err),
        OutputFormat::Yaml => serde_yaml::to_string(data).map_err(render_err),
        OutputFormat::Plain => Ok(plain_fn(data)),
    }
}

fn render_err(e: impl std::fmt::Display) -> CliError {
    CliError::Render {
        message: e.to_string(),
    }
}

pub fn table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Print to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

/// Print to stderr, respecting quiet mode.
pub fn print_note(note: &str, quiet: bool) {
    if quiet || note.is_empty() {
        return;
    }
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "{note}");
}
