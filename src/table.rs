use std::fmt::Write as _;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
}

/// Renders rows as an aligned text table. Columns whose cells are all
/// numeric are right-aligned.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    let mut aligns = vec![Align::Right; headers.len()];
    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(headers.len()) {
            widths[idx] = widths[idx].max(cell.chars().count());
            if !cell.is_empty() && cell.parse::<f64>().is_err() {
                aligns[idx] = Align::Left;
            }
        }
    }

    let mut output = String::new();
    let header_aligns = vec![Align::Left; headers.len()];
    let _ = writeln!(output, "{}", format_row(headers, &widths, &header_aligns));
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(output, "{}", format_row(&rule, &widths, &header_aligns));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths, &aligns));
    }
    output
}

fn format_row(values: &[String], widths: &[usize], aligns: &[Align]) -> String {
    let cells: Vec<String> = values
        .iter()
        .zip(widths.iter().zip(aligns))
        .map(|(value, (width, align))| {
            let cleaned = value.replace(['\n', '\r', '\t'], " ");
            match align {
                Align::Left => format!("{cleaned:<width$}"),
                Align::Right => format!("{cleaned:>width$}"),
            }
        })
        .collect();
    cells.join("  ").trim_end().to_string()
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Renders serialized records, using the field names of the first record as
/// the header.
pub fn render_records<T: Serialize>(records: &[T]) -> Result<String> {
    let values: Vec<Value> = records
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<_, _>>()
        .context("Serializing records for preview")?;
    let Some(Value::Object(first)) = values.first() else {
        return Ok(String::new());
    };
    let headers: Vec<String> = first.keys().cloned().collect();
    let rows: Vec<Vec<String>> = values
        .iter()
        .map(|value| {
            headers
                .iter()
                .map(|h| value.get(h).map(display_value).unwrap_or_default())
                .collect()
        })
        .collect();
    Ok(render_table(&headers, &rows))
}

pub fn print_records<T: Serialize>(records: &[T]) -> Result<()> {
    print!("{}", render_records(records)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_columns_align_right() {
        let headers = vec!["city".to_string(), "share".to_string()];
        let rows = vec![
            vec!["Lisbon".to_string(), "12.5".to_string()],
            vec!["Rome".to_string(), "3".to_string()],
        ];
        let rendered = render_table(&headers, &rows);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(
            lines,
            vec!["city    share", "------  -----", "Lisbon   12.5", "Rome        3"]
        );
    }

    #[test]
    fn records_render_in_field_order() {
        #[derive(Serialize)]
        struct Row {
            id: &'static str,
            value: Option<f64>,
        }
        let rendered = render_records(&[
            Row {
                id: "a",
                value: Some(1.5),
            },
            Row { id: "b", value: None },
        ])
        .unwrap();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "id  value");
        assert_eq!(lines[2], "a     1.5");
        assert_eq!(lines[3], "b");
    }
}
