use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};

use super::index::decompose_all;
use super::model::{Column, PanelDataset, RawSheet, VariableMeta};
use super::validate::{MIN_COLUMNS, validate_shape};

/// Names given to the index-derived columns.
pub const DERIVED_COLUMNS: [&str; 3] = ["year", "month", "region"];

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Read a panel sheet from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`         – comma separated
/// * `.tsv` / `.txt` – tab separated
///
/// Layout (all formats):
/// ```text
///  row 1:  <index header>, var_1,  var_2,  ...
///  row 2:  <ignored>,      flag_1, flag_2, ...   "is this variable a factor"
///  row 3+: 2023073304557,  12,     0.4,    ...
/// ```
pub fn load_file(path: &Path) -> Result<RawSheet> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let delimiter = match ext.as_str() {
        "csv" => b',',
        "tsv" | "txt" => b'\t',
        other => bail!("Unsupported file type: .{other} (expected .csv, .tsv or .txt)"),
    };

    let file = std::fs::File::open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    read_sheet(file, delimiter).with_context(|| format!("reading {}", path.display()))
}

/// Parse the two header rows and the data records from any reader.
pub fn read_sheet<R: Read>(source: R, delimiter: u8) -> Result<RawSheet> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(source);

    let mut sheet = RawSheet::default();
    let mut header_line = None;
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("row {}", row_no + 1))?;
        let line = record.position().map(|p| p.line());
        let cells: Vec<String> = record.iter().map(|c| c.to_string()).collect();
        match row_no {
            0 => {
                header_line = line;
                sheet.headers = cells;
                if let Some(first) = sheet.headers.first_mut() {
                    *first = first.trim_start_matches('\u{feff}').to_string();
                }
            }
            // The reader skips empty lines, so a blank flag row shows up as
            // the first data record starting further down.
            1 if line.is_some() && line != header_line.map(|l| l + 1) => {
                log::warn!("factor-flag row is blank; no variable is flagged");
                sheet.records.push(cells);
            }
            1 => sheet.factor_flags = cells,
            _ => sheet.records.push(cells),
        }
    }

    log::debug!(
        "read sheet: {} header cells, {} data rows",
        sheet.headers.len(),
        sheet.records.len()
    );
    Ok(sheet)
}

// ---------------------------------------------------------------------------
// Typed dataset construction
// ---------------------------------------------------------------------------

/// Turn a validated sheet into a typed [`PanelDataset`].
///
/// Column types are inferred per column. Short records are padded with
/// nulls; records wider than the header are an error. The compound index is
/// decomposed and its parts appended as `year`, `month`, `region` text
/// columns unless the sheet already uses those names.
pub fn build_dataset(sheet: &RawSheet) -> Result<PanelDataset> {
    if !validate_shape(sheet) {
        bail!(
            "the sheet has {} column(s); at least {MIN_COLUMNS} are required",
            sheet.headers.len()
        );
    }

    let width = sheet.headers.len();
    for (row_no, record) in sheet.records.iter().enumerate() {
        if record.len() > width {
            bail!(
                "data row {} has {} fields but the header has {width}",
                row_no + 1,
                record.len()
            );
        }
    }

    let index: Vec<String> = sheet
        .records
        .iter()
        .map(|r| r.first().cloned().unwrap_or_default())
        .collect();

    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut columns = Vec::with_capacity(width - 1 + DERIVED_COLUMNS.len());

    for col_idx in 1..width {
        let header = sheet.headers[col_idx].trim();
        let name = if header.is_empty() {
            format!("column_{col_idx}")
        } else {
            header.to_string()
        };
        if !seen.insert(name.clone()) {
            bail!("duplicate column name '{name}'");
        }

        let factor_flag = sheet
            .factor_flags
            .get(col_idx)
            .map(|f| f.trim().to_string())
            .unwrap_or_default();

        let raw: Vec<&str> = sheet
            .records
            .iter()
            .map(|r| r.get(col_idx).map(String::as_str).unwrap_or(""))
            .collect();

        columns.push(Column::from_raw(VariableMeta { name, factor_flag }, &raw));
    }

    let decomposed = decompose_all(&index);
    let parts = [&decomposed.years, &decomposed.months, &decomposed.regions];
    for (name, values) in DERIVED_COLUMNS.iter().zip(parts) {
        if seen.contains(*name) {
            log::warn!("sheet already has a '{name}' column; not deriving it from the index");
            continue;
        }
        columns.push(Column::derived_text(name, values));
    }

    if decomposed.short_count() > 0 {
        log::warn!(
            "{} index value(s) shorter than 7 characters have no region code",
            decomposed.short_count()
        );
    }

    Ok(PanelDataset {
        index_name: sheet.headers[0].trim().to_string(),
        index,
        decomposed,
        columns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{CellValue, ColumnOrigin, ColumnType};
    use crate::data::validate::TableShape;
    use std::io::Write;

    const PANEL_CSV: &str = "\
indice,cases,rain,zone
,nao,nao,sim
2020013304557,0,1.5,north
2020023304557,3,2.0,south
2020033550308,,0.5,north
";

    fn write_temp(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_csv_reads_both_header_rows() {
        let file = write_temp(".csv", PANEL_CSV);
        let sheet = load_file(file.path()).unwrap();
        assert_eq!(sheet.headers, vec!["indice", "cases", "rain", "zone"]);
        assert_eq!(sheet.factor_flags, vec!["", "nao", "nao", "sim"]);
        assert_eq!(sheet.records.len(), 3);
        assert_eq!(sheet.n_columns(), 4);
    }

    #[test]
    fn test_load_tsv() {
        let file = write_temp(".tsv", "id\ty\n\t\n2020011\t4\n");
        let sheet = load_file(file.path()).unwrap();
        assert_eq!(sheet.headers, vec!["id", "y"]);
        assert_eq!(sheet.records, vec![vec!["2020011".to_string(), "4".to_string()]]);
    }

    #[test]
    fn test_unsupported_extension() {
        let file = write_temp(".xlsx", "whatever");
        let err = load_file(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("Unsupported file type"));
    }

    #[test]
    fn test_strips_byte_order_mark() {
        let sheet = read_sheet("\u{feff}idx,y\n,\n".as_bytes(), b',').unwrap();
        assert_eq!(sheet.headers[0], "idx");
    }

    #[test]
    fn test_build_dataset_types_and_derived_columns() {
        let sheet = read_sheet(PANEL_CSV.as_bytes(), b',').unwrap();
        let ds = build_dataset(&sheet).unwrap();

        assert_eq!(ds.len(), 3);
        assert_eq!(ds.index_name, "indice");
        assert_eq!(ds.n_columns(), 4);

        let cases = ds.column("cases").unwrap();
        assert_eq!(cases.dtype, ColumnType::Integer);
        assert_eq!(cases.values[2], CellValue::Null);
        assert_eq!(ds.column("rain").unwrap().dtype, ColumnType::Float);

        let zone = ds.column("zone").unwrap();
        assert_eq!(zone.dtype, ColumnType::Text);
        assert!(zone.meta.is_factor());

        let region = ds.column("region").unwrap();
        assert_eq!(region.origin, ColumnOrigin::Index);
        assert_eq!(region.values[2], CellValue::Text("3550308".into()));
        assert_eq!(ds.decomposed.months, vec!["01", "02", "03"]);

        let names: Vec<&str> = ds.column_names().collect();
        assert_eq!(names, vec!["cases", "rain", "zone", "year", "month", "region"]);
    }

    #[test]
    fn test_existing_year_column_is_not_overwritten() {
        let sheet = read_sheet("idx,year,y\n,,\n2020011,1999,3\n".as_bytes(), b',').unwrap();
        let ds = build_dataset(&sheet).unwrap();
        let year = ds.column("year").unwrap();
        assert_eq!(year.origin, ColumnOrigin::Sheet);
        assert_eq!(year.values[0], CellValue::Integer(1999));
        assert_eq!(ds.columns.len(), 4);
    }

    #[test]
    fn test_short_records_are_padded() {
        let sheet = read_sheet("idx,a,b\n,,\n2020011,1\n".as_bytes(), b',').unwrap();
        let ds = build_dataset(&sheet).unwrap();
        assert_eq!(ds.column("b").unwrap().values, vec![CellValue::Null]);
    }

    #[test]
    fn test_wide_records_are_rejected() {
        let sheet = read_sheet("idx,a\n,\n2020011,1,9\n".as_bytes(), b',').unwrap();
        assert!(build_dataset(&sheet).is_err());
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let sheet = read_sheet("idx,a,a\n,,\n".as_bytes(), b',').unwrap();
        let err = build_dataset(&sheet).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_blank_flag_row_keeps_first_record() {
        let csv = "idx,y,a\n\n2020011,1,1\n2020021,2,2\n2020031,3,3\n";
        let sheet = read_sheet(csv.as_bytes(), b',').unwrap();
        assert!(sheet.factor_flags.is_empty());
        assert_eq!(sheet.records.len(), 3);
        assert_eq!(sheet.records[0], vec!["2020011", "1", "1"]);

        let ds = build_dataset(&sheet).unwrap();
        assert_eq!(ds.len(), 3);
        assert!(!ds.column("a").unwrap().meta.is_factor());
    }

    #[test]
    fn test_index_is_sliced_raw() {
        let sheet = read_sheet("idx,y\n,\n 2023011,4\n".as_bytes(), b',').unwrap();
        let ds = build_dataset(&sheet).unwrap();
        assert_eq!(ds.index[0], " 2023011");
        assert_eq!(ds.decomposed.years[0], " 202");
        assert_eq!(ds.decomposed.months[0], "30");
        assert_eq!(ds.decomposed.regions[0], "11");
    }

    #[test]
    fn test_single_column_sheet_is_not_built() {
        let sheet = read_sheet("only\n\n1\n2\n".as_bytes(), b',').unwrap();
        assert_eq!(sheet.n_columns(), 1);
        assert!(build_dataset(&sheet).is_err());
    }
}
