use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use crate::error::AnalysisError;

// ---------------------------------------------------------------------------
// MetadataValue – a single annotation cell
// ---------------------------------------------------------------------------

/// A dynamically-typed annotation value guessed from its text.
/// Used as a key in `BTreeMap` / `BTreeSet`, so it must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl Eq for MetadataValue {}

impl PartialOrd for MetadataValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MetadataValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use MetadataValue::*;
        fn rank(v: &MetadataValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
            }
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) => a.cmp(b),
            _ => rank(self).cmp(&rank(other)),
        }
    }
}

impl std::hash::Hash for MetadataValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            MetadataValue::String(s) => s.hash(state),
            MetadataValue::Integer(i) => i.hash(state),
            MetadataValue::Float(f) => f.to_bits().hash(state),
            MetadataValue::Bool(b) => b.hash(state),
            MetadataValue::Null => {}
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::String(s) => write!(f, "{s}"),
            MetadataValue::Integer(i) => write!(f, "{i}"),
            MetadataValue::Float(v) => write!(f, "{v}"),
            MetadataValue::Bool(b) => write!(f, "{b}"),
            MetadataValue::Null => write!(f, "<null>"),
        }
    }
}

impl MetadataValue {
    /// Guess the type of a raw text cell: integer, float, bool, else string.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() {
            return MetadataValue::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return MetadataValue::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return MetadataValue::Float(f);
        }
        if s == "true" || s == "false" {
            return MetadataValue::Bool(s == "true");
        }
        MetadataValue::String(s.to_string())
    }
}

/// Parse a numeric cell. Blank and NA-style markers read as `None`.
pub(crate) fn parse_number(cell: &str) -> Result<Option<f64>, ()> {
    let cell = cell.trim();
    match cell {
        "" | "NA" | "na" | "NaN" | "nan" | "null" | "None" => Ok(None),
        _ => cell.parse::<f64>().map(Some).map_err(|_| ()),
    }
}

// ---------------------------------------------------------------------------
// Table – a raw delimited file
// ---------------------------------------------------------------------------

/// A loaded table: header names plus rows of text cells.
/// Rows shorter than the header are padded with empty cells by the loader.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut r| {
                r.resize(width, String::new());
                r
            })
            .collect();
        Table { headers, rows }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Per-column overview shown next to the generic table view.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    pub name: String,
    pub non_empty: usize,
    /// Numeric range, present only when every non-empty cell is a number.
    pub range: Option<(f64, f64)>,
}

pub fn summarize(table: &Table) -> Vec<ColumnSummary> {
    table
        .headers
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let mut non_empty = 0;
            let mut numeric = true;
            let mut min = f64::INFINITY;
            let mut max = f64::NEG_INFINITY;
            for row in &table.rows {
                let cell = row[idx].trim();
                if cell.is_empty() {
                    continue;
                }
                non_empty += 1;
                match cell.parse::<f64>() {
                    Ok(v) if v.is_finite() => {
                        min = min.min(v);
                        max = max.max(v);
                    }
                    _ => numeric = false,
                }
            }
            ColumnSummary {
                name: name.clone(),
                non_empty,
                range: (numeric && non_empty > 0).then_some((min, max)),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// SampleMetadata – sample → annotations
// ---------------------------------------------------------------------------

/// Sample annotations indexed by the first column of the source table.
#[derive(Debug, Clone)]
pub struct SampleMetadata {
    /// Sample identifiers in file order.
    pub samples: Vec<String>,
    /// Annotation column names (excludes the index column).
    pub column_names: Vec<String>,
    /// One map per sample, aligned with `samples`.
    pub annotations: Vec<BTreeMap<String, MetadataValue>>,
    /// For each annotation column the sorted set of unique values.
    pub unique_values: BTreeMap<String, BTreeSet<MetadataValue>>,
    index: HashMap<String, usize>,
}

impl SampleMetadata {
    pub fn from_table(table: &Table) -> Result<Self, AnalysisError> {
        if table.headers.is_empty() || table.is_empty() {
            return Err(AnalysisError::EmptyMetadata);
        }
        let column_names: Vec<String> = table.headers[1..].to_vec();
        let mut samples = Vec::with_capacity(table.len());
        let mut annotations = Vec::with_capacity(table.len());
        let mut unique_values: BTreeMap<String, BTreeSet<MetadataValue>> = BTreeMap::new();
        let mut index = HashMap::with_capacity(table.len());

        for row in &table.rows {
            let sample = row[0].trim().to_string();
            if index.insert(sample.clone(), samples.len()).is_some() {
                return Err(AnalysisError::DuplicateSample(sample));
            }
            let mut values = BTreeMap::new();
            for (col, cell) in column_names.iter().zip(&row[1..]) {
                let value = MetadataValue::parse(cell);
                unique_values
                    .entry(col.clone())
                    .or_default()
                    .insert(value.clone());
                values.insert(col.clone(), value);
            }
            samples.push(sample);
            annotations.push(values);
        }

        Ok(SampleMetadata {
            samples,
            column_names,
            annotations,
            unique_values,
            index,
        })
    }

    pub fn position(&self, sample: &str) -> Option<usize> {
        self.index.get(sample).copied()
    }

    pub fn value(&self, sample: &str, column: &str) -> Option<&MetadataValue> {
        self.position(sample)
            .and_then(|i| self.annotations[i].get(column))
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }
}

// ---------------------------------------------------------------------------
// ComparisonResult – one DE comparison
// ---------------------------------------------------------------------------

pub const GENE_ID: &str = "GeneID";
pub const GENE_NAME: &str = "GeneName";
pub const LOG_FC: &str = "logFC";
pub const P_VALUE: &str = "PValue";
pub const FDR: &str = "FDR";

/// Statistical columns that are never read as sample counts.
const STAT_COLUMNS: &[&str] = &[
    GENE_ID, GENE_NAME, LOG_FC, P_VALUE, FDR, "logCPM", "F", "LR", "AveExpr", "t", "B",
    "baseMean", "lfcSE", "stat",
];

/// Per-gene statistics from one comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneStat {
    pub gene_id: String,
    pub gene_name: String,
    /// `NaN` when the source cell was blank or NA.
    pub log_fc: f64,
    pub p_value: f64,
    pub fdr: f64,
}

/// One differential-expression comparison, named after its source folder.
#[derive(Debug, Clone)]
pub struct ComparisonResult {
    pub name: String,
    pub genes: Vec<GeneStat>,
    /// Non-statistical columns; candidates for per-sample read counts.
    pub count_columns: Vec<String>,
    /// Raw cells of `count_columns`, one row per gene.
    count_cells: Vec<Vec<String>>,
}

impl ComparisonResult {
    pub fn from_table(name: &str, table: &Table) -> Result<Self, AnalysisError> {
        let require = |column: &str| {
            table
                .column_index(column)
                .ok_or_else(|| AnalysisError::MissingColumn {
                    comparison: name.to_string(),
                    column: column.to_string(),
                })
        };
        let id_idx = require(GENE_ID)?;
        let lfc_idx = require(LOG_FC)?;
        let p_idx = require(P_VALUE)?;
        let fdr_idx = require(FDR)?;
        let name_idx = table.column_index(GENE_NAME);

        let count_idx: Vec<usize> = table
            .headers
            .iter()
            .enumerate()
            .filter(|(_, h)| !STAT_COLUMNS.contains(&h.as_str()))
            .map(|(i, _)| i)
            .collect();

        let mut genes = Vec::with_capacity(table.len());
        let mut count_cells = Vec::with_capacity(table.len());
        for (row_no, row) in table.rows.iter().enumerate() {
            let stat = |idx: usize| -> Result<f64, AnalysisError> {
                parse_number(&row[idx])
                    .map(|v| v.unwrap_or(f64::NAN))
                    .map_err(|_| AnalysisError::InvalidNumber {
                        comparison: name.to_string(),
                        row: row_no,
                        column: table.headers[idx].clone(),
                        value: row[idx].clone(),
                    })
            };
            let gene_id = row[id_idx].trim().to_string();
            let gene_name = name_idx
                .map(|i| row[i].trim().to_string())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| gene_id.clone());
            genes.push(GeneStat {
                gene_id,
                gene_name,
                log_fc: stat(lfc_idx)?,
                p_value: stat(p_idx)?,
                fdr: stat(fdr_idx)?,
            });
            count_cells.push(count_idx.iter().map(|&i| row[i].clone()).collect());
        }

        Ok(ComparisonResult {
            name: name.to_string(),
            genes,
            count_columns: count_idx
                .iter()
                .map(|&i| table.headers[i].clone())
                .collect(),
            count_cells,
        })
    }

    /// Parse one count column (index into `count_columns`), one entry per gene.
    pub fn counts(&self, column: usize) -> Result<Vec<Option<f64>>, AnalysisError> {
        self.count_cells
            .iter()
            .enumerate()
            .map(|(row, cells)| {
                parse_number(&cells[column]).map_err(|_| AnalysisError::InvalidNumber {
                    comparison: self.name.clone(),
                    row,
                    column: self.count_columns[column].clone(),
                    value: cells[column].clone(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> Table {
        Table::new(
            headers.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn test_guess_metadata_type() {
        assert_eq!(MetadataValue::parse("12"), MetadataValue::Integer(12));
        assert_eq!(MetadataValue::parse("1.5"), MetadataValue::Float(1.5));
        assert_eq!(MetadataValue::parse("true"), MetadataValue::Bool(true));
        assert_eq!(MetadataValue::parse(" "), MetadataValue::Null);
        assert_eq!(
            MetadataValue::parse("treated"),
            MetadataValue::String("treated".into())
        );
    }

    #[test]
    fn test_metadata_from_table() {
        let t = table(
            &["sample", "group", "dose"],
            &[&["A", "x", "1"], &["B", "y", "2"], &["C", "x", ""]],
        );
        let meta = SampleMetadata::from_table(&t).unwrap();
        assert_eq!(meta.samples, vec!["A", "B", "C"]);
        assert_eq!(meta.column_names, vec!["group", "dose"]);
        assert_eq!(meta.position("B"), Some(1));
        assert_eq!(meta.position("D"), None);
        assert_eq!(
            meta.value("C", "dose"),
            Some(&MetadataValue::Null)
        );
        assert_eq!(meta.unique_values["group"].len(), 2);
    }

    #[test]
    fn test_metadata_rejects_duplicates_and_empty() {
        let dup = table(&["sample", "group"], &[&["A", "x"], &["A", "y"]]);
        assert_eq!(
            SampleMetadata::from_table(&dup).unwrap_err(),
            AnalysisError::DuplicateSample("A".into())
        );
        let empty = table(&["sample", "group"], &[]);
        assert_eq!(
            SampleMetadata::from_table(&empty).unwrap_err(),
            AnalysisError::EmptyMetadata
        );
    }

    #[test]
    fn test_comparison_splits_stats_and_counts() {
        let t = table(
            &["GeneID", "GeneName", "logFC", "logCPM", "PValue", "FDR", "A", "B"],
            &[
                &["g1", "Alpha", "2.0", "5.1", "0.001", "0.01", "10", "20"],
                &["g2", "", "NA", "3.3", "0.5", "0.9", "5", ""],
            ],
        );
        let cmp = ComparisonResult::from_table("treated_vs_ctrl", &t).unwrap();
        assert_eq!(cmp.count_columns, vec!["A", "B"]);
        assert_eq!(cmp.genes[0].gene_name, "Alpha");
        assert_eq!(cmp.genes[1].gene_name, "g2");
        assert!(cmp.genes[1].log_fc.is_nan());
        assert_eq!(cmp.counts(1).unwrap(), vec![Some(20.0), None]);
    }

    #[test]
    fn test_comparison_missing_column() {
        let t = table(&["GeneID", "logFC", "PValue"], &[&["g1", "1", "0.1"]]);
        let err = ComparisonResult::from_table("c1", &t).unwrap_err();
        assert_eq!(
            err.to_string(),
            "comparison 'c1' is missing the required column 'FDR'"
        );
    }

    #[test]
    fn test_comparison_invalid_count() {
        let t = table(
            &["GeneID", "logFC", "PValue", "FDR", "A"],
            &[&["g1", "1", "0.1", "0.2", "lots"]],
        );
        let cmp = ComparisonResult::from_table("c1", &t).unwrap();
        assert!(matches!(
            cmp.counts(0),
            Err(AnalysisError::InvalidNumber { row: 0, .. })
        ));
    }

    #[test]
    fn test_summarize_columns() {
        let t = table(&["name", "value"], &[&["a", "1.5"], &["b", "-2"], &["", ""]]);
        let summary = summarize(&t);
        assert_eq!(summary[0].non_empty, 2);
        assert_eq!(summary[0].range, None);
        assert_eq!(summary[1].range, Some((-2.0, 1.5)));
    }
}
