//! Report rendering
//!
//! The aggregator emits neutral [`StatRecord`] rows; this module turns
//! them into one of four outputs selected by a flag: hand-formatted
//! tables on stdout (the default), or a structured Json / Yaml / Hcl
//! document. Status and warning lines go to stderr, colored when a TTY
//! is attached (or when forced by `--color`).

use crate::error::{ReplayerError, Result};
use crate::stats::{StatRecord, Statistics};
use console::style;
use serde::Serialize;

/// Structured output backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Json,
    Yaml,
    Hcl,
}

impl OutputMode {
    /// Parse the mode the way the flag historically worked: first
    /// letter, case-insensitive (`Json`/`j`/`JSON`, `Yaml`/`yml`/`Y`,
    /// `Hcl`/`h`)
    pub fn parse(value: &str) -> std::result::Result<Self, String> {
        match value.chars().next().map(|c| c.to_ascii_uppercase()) {
            Some('J') => Ok(OutputMode::Json),
            Some('Y') => Ok(OutputMode::Yaml),
            Some('H') => Ok(OutputMode::Hcl),
            _ => Err(format!(
                "unknown output type '{value}' (expected Json, Yaml or Hcl)"
            )),
        }
    }
}

/// The four statistic sections of a full run
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FullReport {
    pub files: Vec<StatRecord>,
    pub file_types: Vec<StatRecord>,
    pub queues: Vec<StatRecord>,
    pub queue_types: Vec<StatRecord>,
}

/// Render the structured document in the selected backend
pub fn render_structured(mode: OutputMode, report: &FullReport) -> Result<String> {
    match mode {
        OutputMode::Json => {
            serde_json::to_string_pretty(report).map_err(|e| ReplayerError::Render(e.to_string()))
        }
        OutputMode::Yaml => {
            serde_yaml::to_string(report).map_err(|e| ReplayerError::Render(e.to_string()))
        }
        OutputMode::Hcl => {
            hcl::to_string(report).map_err(|e| ReplayerError::Render(e.to_string()))
        }
    }
}

/// Print one statistics table to stdout
///
/// Grouped tables (type roll-ups) show the Count column; plain tables
/// hide it. Tables with more than one row get a footer with the joined
/// totals, the first cell holding the row count.
pub fn print_table(title: &str, stats: &Statistics, grouped: bool) {
    let mut rows: Vec<Vec<String>> = Vec::with_capacity(stats.len());
    for stat in stats.iter() {
        rows.push(table_row(
            &stat.name,
            stat.count(),
            stat.messages(),
            stat.sum() as i64,
            stat.average() as i64,
            stat.minimum() as i64,
            stat.maximum() as i64,
            grouped,
        ));
    }

    let mut header = vec![
        title.to_string(),
        "Count".to_string(),
        "Messages".to_string(),
        "Size".to_string(),
        "Average".to_string(),
        "Minimum".to_string(),
        "Maximum".to_string(),
    ];
    if !grouped {
        header.remove(1);
    }

    let footer = if stats.len() > 1 {
        let total = stats.total();
        Some(table_row(
            &stats.len().to_string(),
            total.count(),
            total.messages(),
            total.sum() as i64,
            total.average() as i64,
            total.minimum() as i64,
            total.maximum() as i64,
            grouped,
        ))
    } else {
        None
    };

    print_aligned(&header, &rows, footer.as_deref());
    println!();
}

/// Print the per-queue published totals after a replay
pub fn print_published_table(published: &std::collections::HashMap<String, u64>) {
    let mut queues: Vec<_> = published.iter().collect();
    queues.sort_by(|a, b| a.0.cmp(b.0));

    let header = vec!["Queue name".to_string(), "Published".to_string()];
    let rows: Vec<Vec<String>> = queues
        .iter()
        .map(|(queue, count)| vec![(*queue).clone(), count.to_string()])
        .collect();
    let total: u64 = published.values().sum();
    let footer = vec![String::new(), total.to_string()];

    print_aligned(&header, &rows, Some(&footer));
    println!();
}

#[allow(clippy::too_many_arguments)]
fn table_row(
    name: &str,
    count: u64,
    messages: u64,
    size: i64,
    average: i64,
    minimum: i64,
    maximum: i64,
    grouped: bool,
) -> Vec<String> {
    let mut row = vec![
        name.to_string(),
        count.to_string(),
        messages.to_string(),
        size.to_string(),
        average.to_string(),
        minimum.to_string(),
        maximum.to_string(),
    ];
    if !grouped {
        row.remove(1);
    }
    row
}

/// Column output: name column left-aligned, numbers right
pub(crate) fn print_aligned(header: &[String], rows: &[Vec<String>], footer: Option<&[String]>) {
    let mut widths: Vec<usize> = header.iter().map(|h| h.len()).collect();
    let mut widen = |row: &[String]| {
        for (i, cell) in row.iter().enumerate() {
            if cell.len() > widths[i] {
                widths[i] = cell.len();
            }
        }
    };
    for row in rows {
        widen(row);
    }
    if let Some(footer) = footer {
        widen(footer);
    }

    let print_row = |row: &[String]| {
        let mut line = String::new();
        for (i, cell) in row.iter().enumerate() {
            if i == 0 {
                line.push_str(&format!("{:<width$}", cell, width = widths[0]));
            } else {
                line.push_str(&format!("  {:>width$}", cell, width = widths[i]));
            }
        }
        println!("{}", line.trim_end());
    };

    print_row(header);
    let separators: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    print_row(&separators);
    for row in rows {
        print_row(row);
    }
    if let Some(footer) = footer {
        print_row(&separators);
        print_row(footer);
    }
}

/// Force colors on or off; `None` keeps TTY auto-detection
pub fn set_color_mode(force: Option<bool>) {
    if let Some(enabled) = force {
        console::set_colors_enabled(enabled);
        console::set_colors_enabled_stderr(enabled);
    }
}

/// Green status line on stderr
pub fn status(msg: impl AsRef<str>) {
    eprintln!("{}", style(msg.as_ref()).for_stderr().green());
}

/// Red warning line on stderr
pub fn alert(msg: impl AsRef<str>) {
    eprintln!("{}", style(msg.as_ref()).for_stderr().red());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_mode_parse() {
        assert_eq!(OutputMode::parse("Json").unwrap(), OutputMode::Json);
        assert_eq!(OutputMode::parse("j").unwrap(), OutputMode::Json);
        assert_eq!(OutputMode::parse("YAML").unwrap(), OutputMode::Yaml);
        assert_eq!(OutputMode::parse("yml").unwrap(), OutputMode::Yaml);
        assert_eq!(OutputMode::parse("hcl").unwrap(), OutputMode::Hcl);
        assert!(OutputMode::parse("xml").is_err());
        assert!(OutputMode::parse("").is_err());
    }

    fn sample_report() -> FullReport {
        let mut queues = Statistics::default();
        queues.add("q.doc", 100.0);
        queues.add("q.doc", 50.0);
        FullReport {
            files: Vec::new(),
            file_types: Vec::new(),
            queues: queues.records(),
            queue_types: Vec::new(),
        }
    }

    #[test]
    fn test_json_rendering() {
        let out = render_structured(OutputMode::Json, &sample_report()).unwrap();
        assert!(out.contains("\"Queues\""));
        assert!(out.contains("\"q.doc\""));
        assert!(out.contains("\"Messages\": 2"));
    }

    #[test]
    fn test_yaml_rendering() {
        let out = render_structured(OutputMode::Yaml, &sample_report()).unwrap();
        assert!(out.contains("Queues:"));
        assert!(out.contains("Name: q.doc"));
    }

    #[test]
    fn test_hcl_rendering() {
        let out = render_structured(OutputMode::Hcl, &sample_report()).unwrap();
        assert!(out.contains("Queues"));
        assert!(out.contains("q.doc"));
    }
}
