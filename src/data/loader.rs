use std::fmt;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};
use arrow::array::Array;
use arrow::util::display::array_value_to_string;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::model::Table;

// ---------------------------------------------------------------------------
// Field separator
// ---------------------------------------------------------------------------

/// Field separator for delimited text files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Separator {
    #[default]
    Comma,
    Tab,
    Space,
}

impl Separator {
    pub const ALL: [Separator; 3] = [Separator::Comma, Separator::Tab, Separator::Space];

    pub fn as_byte(self) -> u8 {
        match self {
            Separator::Comma => b',',
            Separator::Tab => b'\t',
            Separator::Space => b' ',
        }
    }

    /// Name used in config files and query strings.
    pub fn name(self) -> &'static str {
        match self {
            Separator::Comma => "comma",
            Separator::Tab => "tab",
            Separator::Space => "space",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }

    /// Separator implied by a file name, if any.
    pub fn from_extension(path: &Path) -> Option<Self> {
        match extension(path).as_str() {
            "csv" => Some(Separator::Comma),
            "tsv" | "tab" => Some(Separator::Tab),
            "txt" => Some(Separator::Space),
            _ => None,
        }
    }
}

impl fmt::Display for Separator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a table from a file.
///
/// `.parquet` / `.pq` and `.json` are dispatched by extension. Everything
/// else is read as delimited text using `sep`, falling back to the
/// separator implied by the extension and then to comma.
pub fn load_file(path: &Path, sep: Option<Separator>) -> Result<Table> {
    let table = match extension(path).as_str() {
        "parquet" | "pq" => load_parquet(path)?,
        "json" => load_json(path)?,
        _ => {
            let sep = sep
                .or_else(|| Separator::from_extension(path))
                .unwrap_or_default();
            let file = std::fs::File::open(path)
                .with_context(|| format!("opening {}", path.display()))?;
            read_delimited(file, sep).with_context(|| format!("reading {}", path.display()))?
        }
    };
    log::info!(
        "Loaded {} rows x {} columns from {}",
        table.len(),
        table.headers.len(),
        path.display()
    );
    Ok(table)
}

/// Read delimited text with a header row.
pub fn read_delimited<R: Read>(reader: R, sep: Separator) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(sep.as_byte())
        .flexible(true)
        .from_reader(reader);
    let headers: Vec<String> = reader
        .headers()
        .context("reading headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        bail!("file has no header row");
    }

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("row {row_no}"))?;
        rows.push(record.iter().map(|c| c.to_string()).collect());
    }
    Ok(Table::new(headers, rows))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON (`df.to_json(orient='records')`):
///
/// ```json
/// [ { "GeneID": "g1", "logFC": 1.2 }, ... ]
/// ```
///
/// Columns are the union of keys in first-seen order.
fn load_json(path: &Path) -> Result<Table> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;
    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut headers: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }

    let rows = records
        .iter()
        .filter_map(|rec| rec.as_object())
        .map(|obj| {
            headers
                .iter()
                .map(|h| obj.get(h).map(json_to_cell).unwrap_or_default())
                .collect()
        })
        .collect();
    Ok(Table::new(headers, rows))
}

fn json_to_cell(val: &JsonValue) -> String {
    match val {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file; every column is rendered to text.
/// Works with files written by both **Pandas** and **Polars**.
fn load_parquet(path: &Path) -> Result<Table> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for row in 0..batch.num_rows() {
            let mut cells = Vec::with_capacity(batch.num_columns());
            for col in batch.columns() {
                let cell = if col.is_null(row) {
                    String::new()
                } else {
                    array_value_to_string(col, row)
                        .with_context(|| format!("Row {row}: formatting value"))?
                };
                cells.push(cell);
            }
            rows.push(cells);
        }
    }
    Ok(Table::new(headers, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_each_separator() {
        let comma = read_delimited("a,b\n1,2\n".as_bytes(), Separator::Comma).unwrap();
        let tab = read_delimited("a\tb\n1\t2\n".as_bytes(), Separator::Tab).unwrap();
        let space = read_delimited("a b\n1 2\n".as_bytes(), Separator::Space).unwrap();
        for t in [comma, tab, space] {
            assert_eq!(t.headers, vec!["a", "b"]);
            assert_eq!(t.rows, vec![vec!["1".to_string(), "2".to_string()]]);
        }
    }

    #[test]
    fn test_short_rows_are_padded() {
        let t = read_delimited("a,b,c\n1,2\n".as_bytes(), Separator::Comma).unwrap();
        assert_eq!(t.rows[0], vec!["1", "2", ""]);
    }

    #[test]
    fn test_wrong_separator_gives_single_column() {
        let t = read_delimited("a\tb\n1\t2\n".as_bytes(), Separator::Comma).unwrap();
        assert_eq!(t.headers.len(), 1);
    }

    #[test]
    fn test_separator_names() {
        assert_eq!(Separator::from_name("tab"), Some(Separator::Tab));
        assert_eq!(Separator::from_name("pipe"), None);
        assert_eq!(Separator::default().name(), "comma");
        assert_eq!(
            Separator::from_extension(Path::new("x/y.results.TSV")),
            Some(Separator::Tab)
        );
    }

    #[test]
    fn test_load_file_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let tsv = dir.path().join("counts.tsv");
        std::fs::write(&tsv, "GeneID\tA\ng1\t3\n").unwrap();
        let t = load_file(&tsv, None).unwrap();
        assert_eq!(t.headers, vec!["GeneID", "A"]);

        let json = dir.path().join("records.json");
        let mut f = std::fs::File::create(&json).unwrap();
        write!(f, r#"[{{"GeneID":"g1","logFC":1.5}},{{"GeneID":"g2","FDR":null}}]"#).unwrap();
        let t = load_file(&json, None).unwrap();
        assert_eq!(t.headers, vec!["GeneID", "logFC", "FDR"]);
        assert_eq!(t.rows[1], vec!["g2", "", ""]);
    }

    #[test]
    fn test_load_parquet_renders_cells_as_text() {
        use std::sync::Arc;

        use arrow::array::{Float64Array, Int64Array, StringArray};
        use arrow::datatypes::{DataType, Field, Schema};
        use arrow::record_batch::RecordBatch;
        use parquet::arrow::ArrowWriter;

        let schema = Arc::new(Schema::new(vec![
            Field::new("GeneID", DataType::Utf8, true),
            Field::new("count", DataType::Int64, false),
            Field::new("logFC", DataType::Float64, false),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec![Some("g1"), None])),
                Arc::new(Int64Array::from(vec![3, 40])),
                Arc::new(Float64Array::from(vec![1.5, -2.25])),
            ],
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.parquet");
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let t = load_file(&path, Some(Separator::Tab)).unwrap();
        assert_eq!(t.headers, vec!["GeneID", "count", "logFC"]);
        assert_eq!(t.rows[0], vec!["g1", "3", "1.5"]);
        assert_eq!(t.rows[1], vec!["", "40", "-2.25"]);
    }
}
