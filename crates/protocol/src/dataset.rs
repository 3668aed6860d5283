use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One value of a tabular dataset.
///
/// Parsing only produces `Text`; the other variants come from the optional
/// numeric typing pass.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(value) => Some(*value as f64),
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Column-oriented table: unique column names plus rows of equal arity.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TabularDataset {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    pub row_count: usize,
    pub col_count: usize,
}

impl TabularDataset {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a dataset; callers guarantee every row has `columns.len()` cells.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        debug_assert!(rows.iter().all(|row| row.len() == columns.len()));
        Self {
            row_count: rows.len(),
            col_count: columns.len(),
            columns,
            rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn column<'a>(&'a self, name: &str) -> Option<impl Iterator<Item = &'a Cell> + 'a> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().filter_map(move |row| row.get(idx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn cells_serialize_untagged() {
        let dataset = TabularDataset::new(
            vec!["time".into(), "label".into(), "wait".into()],
            vec![vec![Cell::Int(3), Cell::from("L1"), Cell::Null]],
        );
        assert_eq!(
            serde_json::to_value(&dataset).unwrap(),
            json!({
                "columns": ["time", "label", "wait"],
                "rows": [[3, "L1", null]],
                "rowCount": 1,
                "colCount": 3
            })
        );
    }

    #[test]
    fn column_lookup_by_name() {
        let dataset = TabularDataset::new(
            vec!["a".into(), "b".into()],
            vec![
                vec![Cell::Int(1), Cell::Float(2.5)],
                vec![Cell::Int(3), Cell::Float(4.0)],
            ],
        );
        let b: Vec<f64> = dataset
            .column("b")
            .unwrap()
            .filter_map(Cell::as_f64)
            .collect();
        assert_eq!(b, vec![2.5, 4.0]);
        assert!(dataset.column("missing").is_none());
    }
}
