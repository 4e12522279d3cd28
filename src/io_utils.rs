//! File access for the pipelines.
//!
//! The reconciliation core never touches the filesystem; everything it reads
//! or writes passes through here:
//!
//! - **Sheets**: workbooks (`.xlsx`, `.xls`, `.xlsb`, `.ods`) via calamine,
//!   anything else as delimited text.
//! - **CSV**: reader construction with encoding-aware decoding.
//! - **JSON**: typed reads and pretty-printed writes.
//! - **Atomic output**: results are written to a sibling temporary file and
//!   renamed into place, so a failed run never leaves a truncated artifact.
//!   The `-` path writes to stdout instead.

use std::{
    ffi::OsString,
    fs::{self, File},
    io::{self, BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use calamine::{Data, Reader, open_workbook_auto};
use encoding_rs::{Encoding, UTF_8};
use serde::{Serialize, de::DeserializeOwned};

use crate::{data::Cell, sheet::Sheet};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "xlsb", "ods"];

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn open_csv_reader_from_path(
    path: &Path,
    delimiter: u8,
    has_headers: bool,
) -> Result<csv::Reader<Box<dyn Read>>> {
    let reader: Box<dyn Read> = if is_dash(path) {
        Box::new(io::stdin().lock())
    } else {
        Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Opening input file {path:?}"))?,
        ))
    };
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(has_headers)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    Ok(builder.from_reader(reader))
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

pub fn reader_headers<R>(
    reader: &mut csv::Reader<R>,
    encoding: &'static Encoding,
) -> Result<Vec<String>>
where
    R: Read,
{
    let headers = reader.byte_headers()?.clone();
    decode_record(&headers, encoding)
}

/// Position of each requested column in `headers`; fails naming the first
/// column that is missing.
pub fn column_indices(headers: &[String], columns: &[&str], path: &Path) -> Result<Vec<usize>> {
    columns
        .iter()
        .map(|name| {
            headers
                .iter()
                .position(|h| h.trim() == *name)
                .ok_or_else(|| anyhow!("Column '{name}' not found in {path:?}"))
        })
        .collect()
}

fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| WORKBOOK_EXTENSIONS.iter().any(|w| ext.eq_ignore_ascii_case(w)))
}

/// Loads one worksheet (by name, or the first one) or a delimited text file
/// as a grid of cells. Cell positions are absolute: a worksheet whose used
/// range starts further down or right is padded with empty cells.
pub fn load_sheet(path: &Path, sheet_name: Option<&str>) -> Result<Sheet> {
    if is_workbook(path) {
        load_workbook_sheet(path, sheet_name)
    } else {
        load_delimited_sheet(path)
    }
}

fn load_workbook_sheet(path: &Path, sheet_name: Option<&str>) -> Result<Sheet> {
    let mut workbook =
        open_workbook_auto(path).with_context(|| format!("Opening workbook {path:?}"))?;
    let name = match sheet_name {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| anyhow!("Workbook {path:?} contains no sheets"))?,
    };
    let range = workbook
        .worksheet_range(&name)
        .with_context(|| format!("Reading sheet '{name}' from {path:?}"))?;
    let (start_row, start_col) = range.start().unwrap_or((0, 0));

    let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); start_row as usize];
    for source in range.rows() {
        let mut row = vec![Cell::Empty; start_col as usize];
        row.extend(source.iter().map(cell_from_data));
        rows.push(row);
    }
    Ok(Sheet::new(name, rows))
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) if s.trim().is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(n) => Cell::Number(*n),
        Data::Int(n) => Cell::Number(*n as f64),
        other => Cell::Text(other.to_string()),
    }
}

fn load_delimited_sheet(path: &Path) -> Result<Sheet> {
    let delimiter = resolve_input_delimiter(path, None);
    let mut reader = open_csv_reader_from_path(path, delimiter, false)?;
    let mut rows = Vec::new();
    for (row_idx, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Reading row {} of {path:?}", row_idx + 1))?;
        rows.push(
            record
                .iter()
                .map(|value| {
                    if value.trim().is_empty() {
                        Cell::Empty
                    } else {
                        Cell::text(value)
                    }
                })
                .collect(),
        );
    }
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(Sheet::new(name, rows))
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("Opening JSON file {path:?}"))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Parsing JSON from {path:?}"))
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(".partial");
    path.with_file_name(name)
}

/// Runs `write` against a buffered writer for `path`, publishing the file
/// only once `write` has succeeded.
pub fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    if is_dash(path) {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        write(&mut handle)?;
        return handle.flush().context("Flushing stdout");
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Creating output directory {parent:?}"))?;
    }
    let staging = staging_path(path);
    let outcome = (|| -> Result<()> {
        let file = File::create(&staging)
            .with_context(|| format!("Creating output file {staging:?}"))?;
        let mut writer = BufWriter::new(file);
        write(&mut writer)?;
        writer.flush().context("Flushing output")?;
        Ok(())
    })();
    if let Err(err) = outcome {
        let _ = fs::remove_file(&staging);
        return Err(err);
    }
    fs::rename(&staging, path).with_context(|| format!("Publishing output file {path:?}"))
}

pub fn write_json_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    write_atomically(path, |writer| {
        serde_json::to_writer_pretty(&mut *writer, value).context("Serializing JSON output")?;
        writeln!(writer).context("Writing JSON output")?;
        Ok(())
    })
}

pub fn write_csv(path: &Path, headers: &[&str], rows: &[Vec<String>]) -> Result<()> {
    write_atomically(path, |writer| {
        let mut csv_writer = csv::WriterBuilder::new().from_writer(writer);
        csv_writer
            .write_record(headers)
            .context("Writing CSV headers")?;
        for row in rows {
            csv_writer.write_record(row).context("Writing CSV row")?;
        }
        csv_writer.flush().context("Flushing CSV output")?;
        Ok(())
    })
}
