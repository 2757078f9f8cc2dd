//! Conversion between records and spreadsheet sheets.
//!
//! Reading takes the first sheet of a workbook and treats its first row as the header,
//! writing produces a single `Sheet1` with a header row followed by one row per record.

use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::path::Path;

use calamine::{Data, Range, Reader, open_workbook_auto_from_rs};
use rust_xlsxwriter::{Workbook, Worksheet};
use tracing::{debug, trace};

use crate::domain::XTVError;
use crate::record::{Record, Value};

pub const EXPORT_SHEET_NAME: &str = "Sheet1";

const EMPTY_HEADER: &str = "__EMPTY";

/// Decodes workbook bytes (xlsx, xlsm, xls, xlsb, ods) into records of the first sheet.
pub fn read_records(bytes: Vec<u8>) -> Result<Vec<Record>, XTVError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range?,
        None => {
            return Err(XTVError::LoadingFailed(
                "Workbook contains no sheets".to_string(),
            ));
        }
    };
    debug!("First sheet has {:?} (rows, columns)", range.get_size());
    Ok(records_from_range(&range))
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Empty,
        Data::String(s) => Value::Text(s.clone()),
        Data::Float(f) => Value::Number(*f),
        Data::Int(i) => Value::Number(*i as f64),
        Data::Bool(b) => Value::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::Error(e) => Value::Text(e.to_string()),
        Data::DateTime(dt) => Value::Number(dt.as_f64()),
        Data::DateTimeIso(s) => Value::Text(s.clone()),
        Data::DurationIso(s) => Value::Text(s.clone()),
    }
}

/// Field names for the header row: blank cells become `__EMPTY`, repeated names get `_1`, `_2`, ...
/// A suffixed name never collides with a header issued before it.
pub fn header_names<'a>(cells: impl Iterator<Item = &'a Data>) -> Vec<String> {
    let mut issued: HashSet<String> = HashSet::new();
    let mut next_suffix: HashMap<String, usize> = HashMap::new();
    cells
        .map(|cell| {
            let base = match cell_value(cell) {
                Value::Empty => EMPTY_HEADER.to_string(),
                v => v.to_string(),
            };
            let mut name = base.clone();
            if issued.contains(&name) {
                let suffix = next_suffix.entry(base.clone()).or_insert(1);
                loop {
                    name = format!("{base}_{suffix}");
                    *suffix += 1;
                    if !issued.contains(&name) {
                        break;
                    }
                }
            }
            issued.insert(name.clone());
            name
        })
        .collect()
}

/// Converts a sheet range into records. Blank cells are left out of the record and
/// rows without any value are skipped.
pub fn records_from_range(range: &Range<Data>) -> Vec<Record> {
    let mut rows = range.rows();
    let header = match rows.next() {
        Some(first) => header_names(first.iter()),
        None => return Vec::new(),
    };

    let records: Vec<Record> = rows
        .filter_map(|row| {
            let mut record = Record::new();
            for (name, cell) in header.iter().zip(row.iter()) {
                let value = cell_value(cell);
                if !value.is_empty() {
                    record.insert(name.as_str(), value);
                }
            }
            (!record.is_empty()).then_some(record)
        })
        .collect();
    trace!("Converted sheet into {} records", records.len());
    records
}

/// Header of an exported sheet: every field name in order of first appearance.
pub fn export_header(records: &[&Record]) -> Vec<String> {
    let mut header: Vec<String> = Vec::new();
    for record in records {
        for name in record.field_names() {
            if !header.iter().any(|h| h == name) {
                header.push(name.to_string());
            }
        }
    }
    header
}

fn write_sheet(worksheet: &mut Worksheet, records: &[&Record]) -> Result<(), XTVError> {
    worksheet.set_name(EXPORT_SHEET_NAME)?;
    let header = export_header(records);
    for (col, name) in header.iter().enumerate() {
        worksheet.write_string(0, col as u16, name)?;
    }
    for (ridx, record) in records.iter().enumerate() {
        let row = ridx as u32 + 1;
        for (col, name) in header.iter().enumerate() {
            match record.get(name) {
                Some(Value::Text(s)) => {
                    worksheet.write_string(row, col as u16, s)?;
                }
                Some(Value::Number(n)) => {
                    worksheet.write_number(row, col as u16, *n)?;
                }
                Some(Value::Empty) | None => {}
            }
        }
    }
    Ok(())
}

/// Encodes records as an xlsx workbook held in memory.
#[cfg(test)]
pub fn write_records(records: &[&Record]) -> Result<Vec<u8>, XTVError> {
    let mut workbook = Workbook::new();
    write_sheet(workbook.add_worksheet(), records)?;
    Ok(workbook.save_to_buffer()?)
}

pub fn save_records(records: &[&Record], path: &Path) -> Result<(), XTVError> {
    let mut workbook = Workbook::new();
    write_sheet(workbook.add_worksheet(), records)?;
    workbook.save(path)?;
    debug!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::seed_dataset;

    fn range_from(rows: &[Vec<Data>]) -> Range<Data> {
        let width = rows.iter().map(|r| r.len()).max().unwrap_or(1) as u32;
        let mut range = Range::new((0, 0), (rows.len() as u32 - 1, width - 1));
        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                range.set_value((r as u32, c as u32), cell.clone());
            }
        }
        range
    }

    fn s(v: &str) -> Data {
        Data::String(v.to_string())
    }

    #[test]
    fn first_row_becomes_field_names() {
        let range = range_from(&[
            vec![s("Name"), s("City")],
            vec![s("Ali"), s("Tehran")],
            vec![s("Sara"), Data::Empty],
        ]);
        let records = records_from_range(&range);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].field_names().collect::<Vec<_>>(), vec!["Name", "City"]);
        assert_eq!(records[1].get("City"), None);
        assert_eq!(records[1].get("Name"), Some(&Value::from("Sara")));
    }

    #[test]
    fn blank_and_duplicate_headers_get_unique_names() {
        let cells = [s("A"), Data::Empty, s("A"), Data::Empty, s("A")];
        assert_eq!(
            header_names(cells.iter()),
            vec!["A", "__EMPTY", "A_1", "__EMPTY_1", "A_2"]
        );

        let cells = [s("A"), s("A_1"), s("A")];
        assert_eq!(header_names(cells.iter()), vec!["A", "A_1", "A_2"]);
    }

    #[test]
    fn colliding_header_keeps_every_column() {
        let range = range_from(&[
            vec![s("A"), s("A_1"), s("A")],
            vec![s("x"), s("y"), s("z")],
        ]);
        let records = records_from_range(&range);
        assert_eq!(records[0].get("A_1"), Some(&Value::from("y")));
        assert_eq!(records[0].get("A_2"), Some(&Value::from("z")));
    }

    #[test]
    fn blank_rows_are_skipped_and_cells_typed() {
        let range = range_from(&[
            vec![s("ID"), s("Flag")],
            vec![Data::Empty, Data::Empty],
            vec![Data::Int(7), Data::Bool(true)],
        ]);
        let records = records_from_range(&range);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("ID"), Some(&Value::Number(7.0)));
        assert_eq!(records[0].get("Flag"), Some(&Value::from("TRUE")));
    }

    #[test]
    fn export_then_import_gives_same_records() {
        let data = seed_dataset();
        let visible: Vec<&Record> = data.iter().skip(1).collect();
        let bytes = write_records(&visible).unwrap();
        let back = read_records(bytes).unwrap();
        assert_eq!(back.len(), 3);
        for (original, loaded) in visible.iter().zip(back.iter()) {
            assert_eq!(*original, loaded);
        }
    }

    #[test]
    fn export_header_is_union_in_first_seen_order() {
        let a = Record::new().with("Name", "Ali");
        let b = Record::new().with("City", "Tehran").with("Name", "Sara");
        assert_eq!(export_header(&[&a, &b]), vec!["Name", "City"]);
    }

    #[test]
    fn empty_export_is_a_readable_workbook() {
        let bytes = write_records(&[]).unwrap();
        let back = read_records(bytes).unwrap();
        assert!(back.is_empty());
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        assert!(read_records(b"not a spreadsheet".to_vec()).is_err());
    }
}
