//! How commands print: one serializable value per command, shown either as
//! JSON or through a human formatter.
//!
//! The mode comes from `--format`, then `--json`, then `RELGRAPH_FORMAT`
//! (`pretty`, `text` or `json`). Without any of those, a terminal gets
//! [`OutputMode::Pretty`] and a pipe gets [`OutputMode::Text`].
//!
//! Errors go to stderr in the same mode, carrying the stable `E####` code
//! of the failure when there is one.

use std::io::{self, IsTerminal, Write};

use clap::ValueEnum;
use relgraph_core::RelationshipError;
use serde::Serialize;

const SECTION_WIDTH: usize = 72;
const KEY_WIDTH: usize = 12;

/// Heading line followed by a dashed rule.
pub fn pretty_section(w: &mut dyn Write, heading: &str) -> io::Result<()> {
    writeln!(w, "{heading}\n{}", "-".repeat(SECTION_WIDTH))
}

/// `Key:        value` line.
pub fn pretty_kv(w: &mut dyn Write, key: &str, value: impl AsRef<str>) -> io::Result<()> {
    let label = format!("{key}:");
    writeln!(w, "{label:<width$} {}", value.as_ref(), width = KEY_WIDTH)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Headings and aligned columns for a terminal.
    Pretty,
    /// Bare lines for pipes and scripts.
    Text,
    Json,
}

impl OutputMode {
    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }

    pub const fn is_pretty(self) -> bool {
        matches!(self, Self::Pretty)
    }

    fn from_env_value(value: &str) -> Option<Self> {
        Self::from_str(value.trim(), true).ok()
    }

    fn pick(flag: Option<Self>, json: bool, env: Option<&str>, tty: bool) -> Self {
        flag.or_else(|| json.then_some(Self::Json))
            .or_else(|| env.and_then(Self::from_env_value))
            .unwrap_or(if tty { Self::Pretty } else { Self::Text })
    }
}

/// Mode for this process from flags, `RELGRAPH_FORMAT` and whether stdout
/// is a terminal.
pub fn resolve_output_mode(format_flag: Option<OutputMode>, json_flag: bool) -> OutputMode {
    let env = std::env::var("RELGRAPH_FORMAT").ok();
    OutputMode::pick(
        format_flag,
        json_flag,
        env.as_deref(),
        io::stdout().is_terminal(),
    )
}

/// Error payload shown on stderr.
#[derive(Debug, Serialize)]
pub struct CliError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            error_code: None,
        }
    }

    pub fn with_details(
        message: impl Into<String>,
        suggestion: impl Into<String>,
        error_code: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            suggestion: Some(suggestion.into()),
            error_code: Some(error_code.into()),
        }
    }
}

impl From<&RelationshipError> for CliError {
    fn from(err: &RelationshipError) -> Self {
        let code = err.code();
        Self {
            message: err.to_string(),
            suggestion: code.hint().map(str::to_string),
            error_code: Some(code.code().to_string()),
        }
    }
}

/// Print `value` to stdout: JSON in JSON mode, otherwise via `human`.
pub fn render<T: Serialize>(
    mode: OutputMode,
    value: &T,
    human: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    write_value(&mut io::stdout().lock(), mode, value, human)
}

fn write_value<T: Serialize>(
    out: &mut dyn Write,
    mode: OutputMode,
    value: &T,
    human: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    if mode.is_json() {
        serde_json::to_writer_pretty(&mut *out, value)?;
        writeln!(out)?;
    } else {
        human(value, out)?;
    }
    Ok(())
}

fn write_error(out: &mut dyn Write, mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    if mode.is_json() {
        serde_json::to_writer_pretty(&mut *out, &serde_json::json!({ "error": error }))?;
        writeln!(out)?;
        return Ok(());
    }

    let tag = error
        .error_code
        .as_ref()
        .map_or_else(|| "error".to_string(), |code| format!("error[{code}]"));
    writeln!(out, "{tag}: {}", error.message)?;
    if let Some(suggestion) = &error.suggestion {
        writeln!(out, "  suggestion: {suggestion}")?;
    }
    Ok(())
}

/// Show `error` on stderr and return it as the command's failure.
pub fn fail_with(mode: OutputMode, error: CliError) -> anyhow::Error {
    if let Err(io_err) = write_error(&mut io::stderr().lock(), mode, &error) {
        tracing::warn!(%io_err, "could not print error");
    }
    anyhow::anyhow!(error.message)
}

/// [`fail_with`] for a store error, keeping its code and hint.
pub fn fail(mode: OutputMode, err: &RelationshipError) -> anyhow::Error {
    fail_with(mode, CliError::from(err))
}
