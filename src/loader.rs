use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

use polars::prelude::*;
use rayon::prelude::*;
use tracing::{debug, info, instrument};

use crate::domain::XTVError;
use crate::record::{Record, Value};
use crate::workbook;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileType {
    SPREADSHEET,
    CSV,
    PARQUET,
    ARROW,
}

#[derive(Debug)]
pub struct FileInfo {
    pub path: PathBuf,
    pub file_size: u64,
    pub file_type: FileType,
}

pub fn detect_file_type(path: &Path) -> Result<FileType, XTVError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("XLSX") | Some("XLSM") | Some("XLS") | Some("XLSB") | Some("ODS") => {
            Ok(FileType::SPREADSHEET)
        }
        Some("CSV") => Ok(FileType::CSV),
        Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
        Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
        _ => Err(XTVError::UnknownFileType(path.display().to_string())),
    }
}

pub fn get_file_info(path: PathBuf) -> Result<FileInfo, XTVError> {
    let file_type = detect_file_type(&path)?;
    let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => XTVError::FileNotFound,
        ErrorKind::PermissionDenied => XTVError::PermissionDenied,
        _ => XTVError::IoError(e),
    })?;
    if !metadata.is_file() {
        return Err(XTVError::LoadingFailed("Not a file!".into()));
    }

    Ok(FileInfo {
        path,
        file_size: metadata.len(),
        file_type,
    })
}

/// Reads and decodes a tabular file into records.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_path(path: &Path) -> Result<Vec<Record>, XTVError> {
    let file_info = get_file_info(path.to_path_buf())?;
    let start_time = Instant::now();
    debug!("Loading {:?} file of {} bytes", file_info.file_type, file_info.file_size);

    let records = match file_info.file_type {
        FileType::SPREADSHEET => workbook::read_records(fs::read(&file_info.path)?)?,
        FileType::CSV => frame_to_records(load_csv(&file_info.path)?)?,
        FileType::PARQUET => frame_to_records(load_parquet(&file_info.path)?)?,
        FileType::ARROW => frame_to_records(load_arrow(&file_info.path)?)?,
    };

    info!(
        "Loaded {} records in {}ms",
        records.len(),
        start_time.elapsed().as_millis()
    );
    Ok(records)
}

fn is_numeric_type(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

// Column values as strings, typed back into numbers for numeric columns. Nulls stay None.
fn load_column(df: &DataFrame, col_name: &str) -> Result<Vec<Option<Value>>, PolarsError> {
    let numeric = is_numeric_type(df.column(col_name)?.dtype());
    let col = df.column(col_name)?.cast(&DataType::String)?;
    let series = col.str()?;

    Ok(series
        .into_iter()
        .map(|value| {
            value.map(|s| match s.parse::<f64>() {
                Ok(n) if numeric => Value::Number(n),
                _ => Value::Text(s.to_string()),
            })
        })
        .collect())
}

// Each column is converted in its own rayon task, then stitched back into rows.
fn frame_to_records(frame: LazyFrame) -> Result<Vec<Record>, XTVError> {
    let df = frame.collect()?;
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let columns: Vec<Vec<Option<Value>>> = names
        .par_iter()
        .map(|name| load_column(&df, name))
        .collect::<Result<_, _>>()?;

    let records = (0..df.height())
        .map(|ridx| {
            let mut record = Record::new();
            for (name, column) in names.iter().zip(columns.iter()) {
                if let Some(value) = &column[ridx] {
                    record.insert(name.as_str(), value.clone());
                }
            }
            record
        })
        .collect();
    Ok(records)
}

fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyCsvReader::new(PlPath::Local(path.into()))
        .with_has_header(true)
        .finish()
}

fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
}

fn load_arrow(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_ipc(
        PlPath::Local(path.into()),
        polars::io::ipc::IpcScanOptions,
        UnifiedScanArgs::default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn detects_types_by_extension() {
        assert_eq!(
            detect_file_type(Path::new("a/b.XLSX")).unwrap(),
            FileType::SPREADSHEET
        );
        assert_eq!(detect_file_type(Path::new("b.xlsm")).unwrap(), FileType::SPREADSHEET);
        assert_eq!(detect_file_type(Path::new("b.xls")).unwrap(), FileType::SPREADSHEET);
        assert_eq!(detect_file_type(Path::new("b.csv")).unwrap(), FileType::CSV);
        assert!(matches!(
            detect_file_type(Path::new("notes.txt")),
            Err(XTVError::UnknownFileType(_))
        ));
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_path(&dir.path().join("nothing.xlsx"));
        assert!(matches!(result, Err(XTVError::FileNotFound)));
    }

    #[test]
    fn loads_csv_with_typed_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.csv");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "Name,Age\nAli,23\nSara,").unwrap();
        drop(file);

        let records = load_path(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("Age"), Some(&Value::Number(23.0)));
        assert_eq!(records[0].get("Name"), Some(&Value::from("Ali")));
        assert_eq!(records[1].get("Age"), None);
    }
}
