//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one identifier per line.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use irota_core::UpdateState;

use crate::cli::{ColorMode, OutputFormat};

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Update state label, colored by outcome.
pub fn paint_state(state: UpdateState, color: bool) -> String {
    let label = state.to_string();
    if !color {
        return label;
    }
    match state {
        UpdateState::Success => label.green().to_string(),
        UpdateState::Failed => label.red().to_string(),
        UpdateState::Idle => label.dimmed().to_string(),
        UpdateState::Checking | UpdateState::Downloading | UpdateState::Installing => {
            label.yellow().to_string()
        }
    }
}

/// Highlight a pending version; `-` when there is none.
pub fn paint_update(version: Option<&str>, color: bool) -> String {
    match version {
        Some(v) if color => v.cyan().bold().to_string(),
        Some(v) => v.to_owned(),
        None => "-".into(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
///
/// - `table`: uses the `Tabled` derive to build a pretty table
/// - `json` / `json-compact`: serializes the original data via serde
/// - `yaml`: serializes via serde_yaml
/// - `plain`: calls `id_fn` on each item to emit one identifier per line
pub fn render_list<T, R>(
    format: &OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            render_table(&rows)
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => data.iter().map(&id_fn).collect::<Vec<_>>().join("\n"),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses `detail_fn`, since detail views don't use `Tabled`.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => id_fn(data),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> String {
    let rendered = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    rendered.unwrap_or_else(|e| format!("{{\"error\": \"serialization failed: {e}\"}}"))
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_yaml::to_string(data).unwrap_or_else(|e| format!("error: serialization failed: {e}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(serde::Serialize, Tabled)]
    struct Row {
        id: String,
        version: String,
    }

    fn rows() -> Vec<Row> {
        vec![
            Row {
                id: "aabbcc000001".into(),
                version: "1.2.0".into(),
            },
            Row {
                id: "aabbcc000002".into(),
                version: "1.3.0".into(),
            },
        ]
    }

    fn render(format: &OutputFormat) -> String {
        render_list(
            format,
            &rows(),
            |r| Row {
                id: r.id.clone(),
                version: r.version.clone(),
            },
            |r| r.id.clone(),
        )
    }

    #[test]
    fn plain_is_one_id_per_line() {
        assert_eq!(render(&OutputFormat::Plain), "aabbcc000001\naabbcc000002");
    }

    #[test]
    fn json_round_trips_through_serde() {
        let value: serde_json::Value = serde_json::from_str(&render(&OutputFormat::Json)).unwrap();
        assert_eq!(value[1]["version"], "1.3.0");
        assert!(!render(&OutputFormat::JsonCompact).contains('\n'));
    }

    #[test]
    fn table_has_headers() {
        let table = render(&OutputFormat::Table);
        assert!(table.contains("id"));
        assert!(table.contains("1.2.0"));
    }

    #[test]
    fn uncolored_labels_are_plain() {
        assert_eq!(paint_state(UpdateState::Failed, false), "failed");
        assert_eq!(paint_update(None, true), "-");
        assert_eq!(paint_update(Some("1.3.0"), false), "1.3.0");
    }
}
