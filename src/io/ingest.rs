//! CSV ingest for star tables.
//!
//! A star table is one row per star with a free set of numeric columns
//! (`numax`, `dnu_err`, `parallax`, `ra`, ...). Columns are looked up
//! case-insensitively when a command asks for them, so a single file can feed
//! every subcommand.
//!
//! - malformed CSV rows are skipped and reported
//! - a blank cell in an optional column means "not given"
//! - a non-numeric cell in a requested column is an input error naming the line

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::domain::Observable;
use crate::error::AppError;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone)]
struct Row {
    line: usize,
    record: StringRecord,
}

/// Parsed CSV star table.
#[derive(Debug, Clone)]
pub struct StarTable {
    ids: Vec<String>,
    header_map: HashMap<String, usize>,
    rows: Vec<Row>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Load a star table from a CSV file.
pub fn load_star_table(path: &Path) -> Result<StarTable, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open CSV '{}': {e}", path.display())))?;
    read_star_table(file)
}

/// Parse a star table from any CSV source.
pub fn read_star_table<R: Read>(source: R) -> Result<StarTable, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader
        .headers()
        .map_err(|e| AppError::invalid_input(format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);
    let id_column = header_map.get("id").copied();

    let mut ids = Vec::new();
    let mut rows = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        let id = id_column
            .and_then(|i| record.get(i))
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("row{}", line - 1));
        ids.push(id);
        rows.push(Row { line, record });
    }

    if rows.is_empty() {
        return Err(AppError::invalid_input("CSV contains no usable rows."));
    }

    Ok(StarTable {
        ids,
        header_map,
        rows,
        row_errors,
        rows_read,
    })
}

impl StarTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.header_map.contains_key(&normalize_header_name(name))
    }

    /// The first of `names` present in the table.
    pub fn first_present<'a>(&self, names: &[&'a str]) -> Option<&'a str> {
        names.iter().copied().find(|n| self.has_column(n))
    }

    /// Every cell of `name`, blanks as `None`. `Ok(None)` if the column is absent.
    pub fn optional_column(&self, name: &str) -> Result<Option<Vec<Option<f64>>>, AppError> {
        let Some(&idx) = self.header_map.get(&normalize_header_name(name)) else {
            return Ok(None);
        };
        self.rows
            .iter()
            .map(|row| {
                let cell = row.record.get(idx).map(str::trim).filter(|s| !s.is_empty());
                cell.map(|s| parse_f64(s, name, row.line)).transpose()
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    /// Every cell of `name`; the column must exist and no cell may be blank.
    pub fn required_column(&self, name: &str) -> Result<Vec<f64>, AppError> {
        let cells = self
            .optional_column(name)?
            .ok_or_else(|| AppError::invalid_input(format!("Missing required column: `{name}`")))?;
        cells
            .into_iter()
            .zip(&self.rows)
            .map(|(cell, row)| {
                cell.ok_or_else(|| {
                    AppError::invalid_input(format!(
                        "Missing required value `{name}` on line {}.",
                        row.line
                    ))
                })
            })
            .collect()
    }

    /// Values from `name` with optional per-star uncertainties from `err_name`.
    pub fn observable(&self, name: &str, err_name: &str) -> Result<Observable, AppError> {
        let values = self.required_column(name)?;
        let errors = self.optional_column(err_name)?.unwrap_or_default();
        Ok(Observable::new(values).with_optional_errors(errors))
    }

    /// Like [`StarTable::observable`], but `Ok(None)` when `name` is absent.
    pub fn optional_observable(&self, name: &str, err_name: &str) -> Result<Option<Observable>, AppError> {
        if !self.has_column(name) {
            return Ok(None);
        }
        self.observable(name, err_name).map(Some)
    }
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn parse_f64(s: &str, column: &str, line: usize) -> Result<f64, AppError> {
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(AppError::invalid_input(format!(
            "Invalid number '{s}' in column `{column}` on line {line}."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const TABLE: &str = "\u{feff}ID,numax,Numax_err,dnu,dnu_err,teff\n\
                         kic1,30.0,0.6,4.0,,4750\n\
                         kic2,100.0,,9.0,,4900\n";

    #[test]
    fn headers_are_case_insensitive() {
        let table = read_star_table(TABLE.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.ids(), &["kic1".to_string(), "kic2".to_string()]);
        assert!(table.has_column("NUMAX"));
        assert_eq!(table.required_column("Teff").unwrap(), vec![4750.0, 4900.0]);
    }

    #[test]
    fn blank_errors_are_optional() {
        let table = read_star_table(TABLE.as_bytes()).unwrap();

        let numax = table.observable("numax", "numax_err").unwrap();
        assert_eq!(numax.error(0), Some(0.6));
        assert_eq!(numax.error(1), None);

        let dnu = table.observable("dnu", "dnu_err").unwrap();
        assert!(!dnu.has_errors());

        let teff = table.observable("teff", "teff_err").unwrap();
        assert!(!teff.has_errors());
    }

    #[test]
    fn absent_columns() {
        let table = read_star_table(TABLE.as_bytes()).unwrap();
        assert!(table.optional_column("feh").unwrap().is_none());
        assert!(table.optional_observable("parallax", "parallax_err").unwrap().is_none());
        assert_eq!(table.first_present(&["ra", "l", "dnu"]), Some("dnu"));

        let err = table.required_column("parallax").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn bad_cells_name_the_line() {
        let csv = "numax,teff\n30,4750\nabc,\n";
        let table = read_star_table(csv.as_bytes()).unwrap();
        let err = table.required_column("numax").unwrap_err();
        assert!(err.to_string().contains("line 3"), "{err}");

        let err = table.required_column("teff").unwrap_err();
        assert!(err.to_string().contains("line 3"), "{err}");
    }

    #[test]
    fn ids_fall_back_to_row_numbers() {
        let csv = "numax\n30\n40\n";
        let table = read_star_table(csv.as_bytes()).unwrap();
        assert_eq!(table.ids(), &["row1".to_string(), "row2".to_string()]);
    }

    #[test]
    fn empty_table_is_rejected() {
        let err = read_star_table("numax,dnu\n".as_bytes()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
