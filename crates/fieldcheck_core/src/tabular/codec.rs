use crate::model::inspection::InspectionRecord;
use crate::model::record::{DetailRecord, RecordId};
use calamine::{Data, Reader, Xlsx};
use log::info;
use rust_xlsxwriter::Workbook;
use std::collections::{BTreeMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::Cursor;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const BACKUP_FILE_PREFIX: &str = "backup_";
const EXPORT_SHEET_NAME: &str = "records";

/// Annotation columns appended after the detail columns on export.
pub const ANNOTATION_COLUMNS: [&str; 5] = [
    "memo",
    "judgment",
    "inspection_result",
    "date",
    "photo_path",
];

/// Container format of a spreadsheet file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadsheetFormat {
    /// Office Open XML workbook; only the first sheet is read.
    Xlsx,
    /// UTF-8 comma-separated text with a header row.
    Csv,
}

impl SpreadsheetFormat {
    /// Detects the format from leading bytes. Anything that is not a zip
    /// container is read as CSV.
    pub fn detect(bytes: &[u8]) -> Self {
        if bytes.starts_with(ZIP_MAGIC) {
            Self::Xlsx
        } else {
            Self::Csv
        }
    }

    /// Maps a file extension (`xlsx`, `csv`) to a format, ignoring case.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "xlsx" => Some(Self::Xlsx),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Csv => "csv",
        }
    }
}

pub type TabularResult<T> = Result<T, TabularError>;

/// Import/export failure.
#[derive(Debug)]
pub enum TabularError {
    Csv(csv::Error),
    XlsxRead(calamine::XlsxError),
    XlsxWrite(rust_xlsxwriter::XlsxError),
    /// The workbook holds no worksheet.
    NoWorksheet,
    /// The input has no usable header row.
    MissingHeader,
    /// The export exceeds the sheet's row or column limits.
    SheetTooLarge,
    Write(String),
}

impl Display for TabularError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Csv(err) => write!(f, "malformed spreadsheet: {err}"),
            Self::XlsxRead(err) => write!(f, "malformed workbook: {err}"),
            Self::XlsxWrite(err) => write!(f, "failed to write workbook: {err}"),
            Self::NoWorksheet => write!(f, "workbook has no worksheet"),
            Self::MissingHeader => write!(f, "spreadsheet has no header row"),
            Self::SheetTooLarge => write!(f, "export does not fit in one worksheet"),
            Self::Write(message) => write!(f, "failed to write spreadsheet: {message}"),
        }
    }
}

impl Error for TabularError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Csv(err) => Some(err),
            Self::XlsxRead(err) => Some(err),
            Self::XlsxWrite(err) => Some(err),
            Self::NoWorksheet | Self::MissingHeader | Self::SheetTooLarge | Self::Write(_) => {
                None
            }
        }
    }
}

impl From<csv::Error> for TabularError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

impl From<calamine::XlsxError> for TabularError {
    fn from(value: calamine::XlsxError) -> Self {
        Self::XlsxRead(value)
    }
}

impl From<rust_xlsxwriter::XlsxError> for TabularError {
    fn from(value: rust_xlsxwriter::XlsxError) -> Self {
        Self::XlsxWrite(value)
    }
}

/// Parses spreadsheet bytes into detail rows.
///
/// Workbooks are recognized by their zip signature; everything else is read
/// as CSV. Blank header cells become `column_<n>`; repeated headers get a
/// `_<k>` suffix. Short rows are padded with empty cells, extra cells are
/// ignored, and fully blank rows are skipped.
///
/// # Errors
/// - `MissingHeader` when the header row is absent or blank.
/// - `Csv` / `XlsxRead` when the input cannot be decoded.
pub fn parse_spreadsheet(bytes: &[u8]) -> TabularResult<Vec<DetailRecord>> {
    let format = SpreadsheetFormat::detect(bytes);
    let mut rows = match format {
        SpreadsheetFormat::Xlsx => read_xlsx_rows(bytes)?,
        SpreadsheetFormat::Csv => read_csv_rows(bytes)?,
    }
    .into_iter();

    let raw_headers = rows.next().unwrap_or_default();
    if raw_headers.iter().all(|cell| cell.trim().is_empty()) {
        return Err(TabularError::MissingHeader);
    }
    let headers = normalize_headers(raw_headers.iter().map(String::as_str));

    let mut records = Vec::new();
    for row in rows {
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let fields = headers
            .iter()
            .enumerate()
            .map(|(column, name)| (name.clone(), row.get(column).cloned().unwrap_or_default()))
            .collect();
        records.push(DetailRecord::from_row(records.len() + 1, fields));
    }

    info!(
        "event=spreadsheet_parse module=tabular status=ok format={} columns={} rows={}",
        format.extension(),
        headers.len(),
        records.len()
    );
    Ok(records)
}

/// Builds the combined export for `details` joined with `inspections`.
///
/// Rows without an inspection get empty annotation cells. CSV output starts
/// with a UTF-8 BOM so spreadsheet applications detect the encoding; workbook
/// output holds one sheet with every cell written as text.
pub fn build_spreadsheet(
    details: &[DetailRecord],
    inspections: &BTreeMap<RecordId, InspectionRecord>,
    format: SpreadsheetFormat,
) -> TabularResult<Vec<u8>> {
    let detail_columns = collect_columns(details);
    let header: Vec<&str> = detail_columns
        .iter()
        .map(String::as_str)
        .chain(ANNOTATION_COLUMNS)
        .collect();
    let rows: Vec<Vec<String>> = details
        .iter()
        .map(|detail| {
            let mut row: Vec<String> = detail_columns
                .iter()
                .map(|column| detail.field(column).unwrap_or_default().to_string())
                .collect();
            row.extend(annotation_cells(inspections.get(&detail.id)));
            row
        })
        .collect();

    let bytes = match format {
        SpreadsheetFormat::Xlsx => write_xlsx(&header, &rows)?,
        SpreadsheetFormat::Csv => write_csv(&header, &rows)?,
    };

    info!(
        "event=spreadsheet_build module=tabular status=ok format={} rows={} bytes={}",
        format.extension(),
        details.len(),
        bytes.len()
    );
    Ok(bytes)
}

/// Default export file name for a backup taken on `date` (`YYYY-MM-DD`).
pub fn backup_file_name(date: &str, format: SpreadsheetFormat) -> String {
    format!("{BACKUP_FILE_PREFIX}{date}.{}", format.extension())
}

fn read_csv_rows(bytes: &[u8]) -> TabularResult<Vec<Vec<String>>> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

fn read_xlsx_rows(bytes: &[u8]) -> TabularResult<Vec<Vec<String>>> {
    let mut workbook = Xlsx::new(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(TabularError::NoWorksheet)??;
    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect())
}

// Numeric cells use their shortest display form, so a customer number typed
// as a number reads back as `1234567`, not `1234567.0`.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn write_csv(header: &[&str], rows: &[Vec<String>]) -> TabularResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(UTF8_BOM.to_vec());
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer
        .into_inner()
        .map_err(|err| TabularError::Write(err.error().to_string()))
}

fn write_xlsx(header: &[&str], rows: &[Vec<String>]) -> TabularResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(EXPORT_SHEET_NAME)?;

    for (column, title) in header.iter().enumerate() {
        worksheet.write_string(0, sheet_column(column)?, *title)?;
    }
    for (index, row) in rows.iter().enumerate() {
        let sheet_row = u32::try_from(index + 1).map_err(|_| TabularError::SheetTooLarge)?;
        for (column, value) in row.iter().enumerate() {
            if !value.is_empty() {
                worksheet.write_string(sheet_row, sheet_column(column)?, value.as_str())?;
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

fn sheet_column(index: usize) -> TabularResult<u16> {
    u16::try_from(index).map_err(|_| TabularError::SheetTooLarge)
}

fn normalize_headers<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut headers = Vec::new();
    for (index, cell) in raw.enumerate() {
        let base = match cell.trim() {
            "" => format!("column_{}", index + 1),
            trimmed => trimmed.to_string(),
        };
        let mut name = base.clone();
        let mut suffix = 1;
        while !seen.insert(name.clone()) {
            suffix += 1;
            name = format!("{base}_{suffix}");
        }
        headers.push(name);
    }
    headers
}

fn collect_columns(details: &[DetailRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    details
        .iter()
        .flat_map(DetailRecord::columns)
        .filter(|column| seen.insert(*column))
        .map(str::to_string)
        .collect()
}

fn annotation_cells(inspection: Option<&InspectionRecord>) -> [String; 5] {
    match inspection {
        Some(record) => [
            record.memo.clone(),
            record
                .judgment
                .map_or_else(String::new, |judgment| judgment.as_str().to_string()),
            record
                .inspection_result
                .map_or_else(String::new, |outcome| outcome.as_str().to_string()),
            record.date.clone(),
            record.photo_path.clone(),
        ],
        None => Default::default(),
    }
}
