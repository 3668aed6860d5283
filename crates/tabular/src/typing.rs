//! Optional numeric typing pass applied after parsing.
//!
//! A column is a numeric candidate when the value in its first row parses as a
//! finite number. Every other non-empty value in the column must then parse
//! too, otherwise the whole column stays text. Numeric columns become integers
//! when all values are integral and floats otherwise; empty cells become null.
//!
//! This is a first-row heuristic, not authoritative typing.

use simlog_protocol::{Cell, TabularDataset};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    Float,
}

pub fn coerce_numeric(mut dataset: TabularDataset) -> TabularDataset {
    for idx in 0..dataset.col_count {
        let kind = infer_column(&dataset.rows, idx);
        if kind == ColumnKind::Text {
            continue;
        }
        for row in &mut dataset.rows {
            if let Some(cell) = row.get_mut(idx) {
                *cell = convert(cell, kind);
            }
        }
    }
    dataset
}

pub fn infer_column(rows: &[Vec<Cell>], idx: usize) -> ColumnKind {
    let Some(first) = rows.first().and_then(|row| row.get(idx)).and_then(Cell::as_text) else {
        return ColumnKind::Text;
    };
    if parse_number(first).is_none() {
        return ColumnKind::Text;
    }

    let mut kind = ColumnKind::Integer;
    for row in rows {
        let Some(text) = row.get(idx).and_then(Cell::as_text) else {
            return ColumnKind::Text;
        };
        if text.trim().is_empty() {
            continue;
        }
        match parse_number(text) {
            Some(Number::Int(_)) => {}
            Some(Number::Float(_)) => kind = ColumnKind::Float,
            None => return ColumnKind::Text,
        }
    }
    kind
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Number {
    Int(i64),
    Float(f64),
}

fn parse_number(raw: &str) -> Option<Number> {
    let trimmed = raw.trim();
    let first = trimmed.as_bytes().first()?;
    // Rejects "inf", "NaN" and friends that f64::from_str would accept.
    if !(first.is_ascii_digit() || matches!(first, b'-' | b'+' | b'.')) {
        return None;
    }
    if let Ok(value) = trimmed.parse::<i64>() {
        return Some(Number::Int(value));
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .map(Number::Float)
}

fn convert(cell: &Cell, kind: ColumnKind) -> Cell {
    let Some(text) = cell.as_text() else {
        return cell.clone();
    };
    if text.trim().is_empty() {
        return Cell::Null;
    }
    match (kind, parse_number(text)) {
        (ColumnKind::Integer, Some(Number::Int(value))) => Cell::Int(value),
        (ColumnKind::Float, Some(Number::Int(value))) => Cell::Float(value as f64),
        (_, Some(Number::Float(value))) => Cell::Float(value),
        _ => cell.clone(),
    }
}
