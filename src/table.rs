use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use serde::Serialize;

use crate::error::MmashError;

/// Column name injected into every table read for a subject.
pub const SUBJECT_COLUMN: &str = "user_id";

/// Column-major table of string cells with header-derived column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    headers: Vec<String>,
    columns: Vec<Vec<String>>,
    rows: usize,
}

impl Table {
    pub fn new(headers: Vec<String>, columns: Vec<Vec<String>>) -> Result<Self, MmashError> {
        if headers.len() != columns.len() {
            return Err(MmashError::TableShape(format!(
                "table has {} headers but {} columns",
                headers.len(),
                columns.len()
            )));
        }
        let rows = columns.first().map(Vec::len).unwrap_or(0);
        if columns.iter().any(|column| column.len() != rows) {
            return Err(MmashError::TableShape(
                "table columns have different lengths".to_string(),
            ));
        }
        Ok(Self {
            headers,
            columns,
            rows,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn column(&self, name: &str) -> Option<&[String]> {
        self.position(name).map(|idx| self.columns[idx].as_slice())
    }

    pub fn row(&self, index: usize) -> Option<Vec<&str>> {
        (index < self.rows).then(|| {
            self.columns
                .iter()
                .map(|column| column[index].as_str())
                .collect()
        })
    }

    /// Fills `name` with `value` on every row, replacing the column if it exists.
    pub fn set_column(&mut self, name: &str, value: &str) {
        let filled = vec![value.to_string(); self.rows];
        match self.position(name) {
            Some(idx) => self.columns[idx] = filled,
            None => {
                self.headers.push(name.to_string());
                self.columns.push(filled);
            }
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }
}

/// Reads a CSV file with a header line.
///
/// A file that does not exist yields [`MmashError::TableNotFound`]; any other
/// failure (permissions, over-long rows, missing header) is a [`MmashError::Csv`]
/// or [`MmashError::Filesystem`] error. Rows shorter than the header are padded
/// with empty cells.
pub fn read_table(path: &Path) -> Result<Table, MmashError> {
    let file = File::open(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => MmashError::TableNotFound(path.to_path_buf()),
        _ => MmashError::Filesystem(format!("open {}: {err}", path.display())),
    })?;
    parse_table(file).map_err(|err| MmashError::Csv {
        path: path.to_path_buf(),
        message: err,
    })
}

fn parse_table<R: Read>(input: R) -> Result<Table, String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input);
    let raw_headers = reader.headers().map_err(|err| err.to_string())?.clone();
    if raw_headers.is_empty() {
        return Err("no columns to parse from file".to_string());
    }
    let headers = normalize_headers(raw_headers.iter());

    let mut columns: Vec<Vec<String>> = headers.iter().map(|_| Vec::new()).collect();
    for result in reader.records() {
        let record = result.map_err(|err| err.to_string())?;
        if record.len() > headers.len() {
            let line = record.position().map(|pos| pos.line()).unwrap_or(0);
            return Err(format!(
                "expected {} fields in line {line}, saw {}",
                headers.len(),
                record.len()
            ));
        }
        for (idx, column) in columns.iter_mut().enumerate() {
            column.push(record.get(idx).unwrap_or_default().to_string());
        }
    }

    Table::new(headers, columns).map_err(|err| err.to_string())
}

/// Names blank header cells `Unnamed: <idx>` and suffixes repeats with `.1`, `.2`, ...
fn normalize_headers<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut headers: Vec<String> = Vec::new();
    for (idx, name) in raw.enumerate() {
        let base = if name.is_empty() {
            format!("Unnamed: {idx}")
        } else {
            name.to_string()
        };
        let mut candidate = base.clone();
        let mut suffix = 1;
        while headers.contains(&candidate) {
            candidate = format!("{base}.{suffix}");
            suffix += 1;
        }
        headers.push(candidate);
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_unnamed_index_column() {
        let table = parse_table(",Day,ibi_s\n0,1,0.7\n1,1,0.71\n".as_bytes()).unwrap();
        assert_eq!(table.headers(), ["Unnamed: 0", "Day", "ibi_s"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.column("ibi_s").unwrap(), ["0.7", "0.71"]);
    }

    #[test]
    fn duplicate_headers_are_suffixed() {
        let table = parse_table("a,a,b,a\n1,2,3,4\n".as_bytes()).unwrap();
        assert_eq!(table.headers(), ["a", "a.1", "b", "a.2"]);
    }

    #[test]
    fn long_rows_fail() {
        let err = parse_table("a,b\n1,2\n3,4,5\n".as_bytes()).unwrap_err();
        assert!(err.contains("expected 2 fields in line 3, saw 3"));
    }

    #[test]
    fn short_rows_are_padded() {
        let table = parse_table(",MEQ,STAI1,STAI2\n0,47,41\n1,50\n".as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.column("STAI2").unwrap(), ["", ""]);
        assert_eq!(table.column("STAI1").unwrap(), ["41", ""]);
    }

    #[test]
    fn mismatched_shape_is_a_table_error() {
        let err = Table::new(
            vec!["a".to_string(), "b".to_string()],
            vec![vec!["1".to_string()], Vec::new()],
        )
        .unwrap_err();
        assert!(matches!(err, MmashError::TableShape(_)));
    }

    #[test]
    fn empty_input_fails() {
        assert!(parse_table("".as_bytes()).is_err());
    }

    #[test]
    fn set_column_overwrites_in_place() {
        let mut table = parse_table("user_id,x\nold,1\nold,2\n".as_bytes()).unwrap();
        table.set_column(SUBJECT_COLUMN, "user_7");
        assert_eq!(table.headers(), ["user_id", "x"]);
        assert_eq!(table.column(SUBJECT_COLUMN).unwrap(), ["user_7", "user_7"]);
    }

    #[test]
    fn set_column_appends_when_absent() {
        let mut table = parse_table("x\n1\n".as_bytes()).unwrap();
        table.set_column(SUBJECT_COLUMN, "user_1");
        assert_eq!(table.headers(), ["x", "user_id"]);
        assert_eq!(table.row(0).unwrap(), ["1", "user_1"]);
        assert!(table.row(1).is_none());
    }
}
