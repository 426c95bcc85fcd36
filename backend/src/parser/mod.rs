//! Tabular decoder for delimited text and binary spreadsheets.
//!
//! Converts a file's bytes into header-keyed [`RawRow`]s plus a
//! [`FileSummary`]. No WEB/accounting specific logic here.
//!
//! Records are read from the container in chunks: delimited text is
//! pulled from the csv reader `chunk_size` records at a time, spreadsheet
//! rows are stringified chunk by chunk. Progress is reported and
//! cancellation checked between chunks.

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use csv::{ReaderBuilder, StringRecord};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Cursor;

use crate::api::logs::{log_info, log_warning, log_warning_indent};
use crate::error::{DecodeError, DecodeResult};
use crate::models::{FileSummary, RawRow, SourceFile, SourceFormat};
use crate::transform::chunked::ChunkPlan;

static NON_HEADER_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]").unwrap());

/// Malformed rows logged one by one before switching to a summary line.
const LOGGED_WARNINGS: usize = 5;

/// Bytes handed to chardet when the input is not valid UTF-8.
const ENCODING_SAMPLE: usize = 64 * 1024;

const DELIMITERS: [char; 4] = [',', ';', '\t', '|'];

/// A delimited-text row skipped because its field count is wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowWarning {
    /// 1-based source line where the record starts.
    pub line: u64,
    pub expected: usize,
    pub found: usize,
}

impl std::fmt::Display for RowWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Line {}: expected {} fields, found {} (row skipped)",
            self.line, self.expected, self.found
        )
    }
}

/// Output of [`decode`].
#[derive(Debug, Clone)]
pub struct DecodedFile {
    /// Data rows in source order.
    pub rows: Vec<RawRow>,
    pub summary: FileSummary,
    pub warnings: Vec<RowWarning>,
}

/// Accumulates header-keyed rows as cell rows come out of a container.
struct RowBuilder {
    headers: Vec<String>,
    keys: Vec<String>,
    preview_rows: usize,
    rows: Vec<RawRow>,
    preview: Vec<Vec<String>>,
    warnings: Vec<RowWarning>,
    encoding: Option<String>,
    delimiter: Option<char>,
}

impl RowBuilder {
    fn new(headers: Vec<String>, preview_rows: usize) -> DecodeResult<Self> {
        if headers.iter().all(|h| h.is_empty()) {
            return Err(DecodeError::NoHeaders);
        }
        let keys = headers.iter().map(|h| canonicalize_header(h)).collect();
        Ok(Self {
            headers,
            keys,
            preview_rows,
            rows: Vec::new(),
            preview: Vec::new(),
            warnings: Vec::new(),
            encoding: None,
            delimiter: None,
        })
    }

    /// Blank rows are dropped, rows with the wrong field count become warnings.
    fn push(&mut self, line: u64, cells: Vec<String>) {
        if cells.iter().all(|c| c.trim().is_empty()) {
            return;
        }
        let expected = self.keys.len();
        if cells.len() != expected {
            self.warnings.push(RowWarning {
                line,
                expected,
                found: cells.len(),
            });
            return;
        }

        let mut row = RawRow::with_capacity(expected);
        for (key, cell) in self.keys.iter().zip(&cells) {
            row.insert(key.as_str(), cell.as_str());
        }
        self.rows.push(row);

        if self.preview.len() < self.preview_rows {
            self.preview.push(cells);
        }
    }

    fn finish(self, source: &SourceFile) -> DecodeResult<DecodedFile> {
        report_warnings(&source.name, &self.warnings);

        if self.rows.is_empty() {
            return Err(DecodeError::EmptyDataset);
        }

        log_info(format!(
            "{}: {} rows, {} columns",
            source.name,
            self.rows.len(),
            self.headers.len()
        ));

        let summary = FileSummary {
            file_name: source.name.clone(),
            format: source.format,
            row_count: self.rows.len(),
            headers: self.headers,
            preview: self.preview,
            malformed_rows: self.warnings.len(),
            encoding: self.encoding,
            delimiter: self.delimiter,
        };

        Ok(DecodedFile {
            rows: self.rows,
            summary,
            warnings: self.warnings,
        })
    }
}

// =============================================================================
// Header canonicalization
// =============================================================================

/// `"Doc Number"`, `"doc_number"` and `"DocNumber#"` all become `"docnumber"`.
pub fn canonicalize_header(header: &str) -> String {
    NON_HEADER_CHARS
        .replace_all(&header.trim().to_lowercase(), "")
        .into_owned()
}

// =============================================================================
// Encoding / delimiter detection
// =============================================================================

/// Detect the encoding of raw bytes.
///
/// Valid UTF-8 is taken as is. Other input goes to chardet, and
/// `windows-1252` is assumed when chardet has no guess.
pub fn detect_encoding(bytes: &[u8]) -> String {
    if std::str::from_utf8(bytes).is_ok() {
        return "utf-8".to_string();
    }

    let sample = &bytes[..bytes.len().min(ENCODING_SAMPLE)];
    let charset = chardet::detect(sample).0;

    match charset.to_lowercase().as_str() {
        "" => "windows-1252".to_string(),
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes to text using the given encoding label.
///
/// Unknown labels and invalid sequences degrade to lossy UTF-8.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => String::from_utf8_lossy(bytes).into_owned(),
        "iso-8859-1" | "latin-1" | "latin1" => {
            encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned()
        }
        label => match encoding_rs::Encoding::for_label(label.as_bytes()) {
            Some(enc) => enc.decode(bytes).0.into_owned(),
            None => String::from_utf8_lossy(bytes).into_owned(),
        },
    }
}

/// Detect the delimiter by counting occurrences in the first record.
///
/// Characters inside double quotes are not counted. Falls back to `,`
/// when the record contains none of the candidates.
pub fn detect_delimiter(content: &str) -> char {
    let mut counts = [0usize; DELIMITERS.len()];
    let mut in_quotes = false;

    for c in content.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            '\n' | '\r' if !in_quotes => break,
            _ if !in_quotes => {
                if let Some(i) = DELIMITERS.iter().position(|d| *d == c) {
                    counts[i] += 1;
                }
            }
            _ => {}
        }
    }

    let mut best_sep = ',';
    let mut best_count = 0;
    for (sep, count) in DELIMITERS.iter().zip(counts) {
        if count > best_count {
            best_count = count;
            best_sep = *sep;
        }
    }

    best_sep
}

// =============================================================================
// Container readers
// =============================================================================

fn csv_error(e: csv::Error) -> DecodeError {
    DecodeError::Csv(e.to_string())
}

async fn read_delimited(
    bytes: &[u8],
    preview_rows: usize,
    plan: &ChunkPlan<'_>,
) -> DecodeResult<RowBuilder> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = detect_delimiter(&content);

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut builder = RowBuilder::new(headers, preview_rows)?;
    builder.encoding = Some(encoding);
    builder.delimiter = Some(delimiter);

    // progress is measured in bytes consumed, the record count is unknown up front
    let total = content.len();
    let mut record = StringRecord::new();
    let mut reported = None;

    loop {
        plan.check()?;

        let mut read = 0;
        let mut exhausted = false;
        while read < plan.chunk_size {
            if !reader.read_record(&mut record).map_err(csv_error)? {
                exhausted = true;
                break;
            }
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            builder.push(line, record.iter().map(str::to_string).collect());
            read += 1;
        }

        if read == 0 {
            if reported.is_some_and(|done| done < total) {
                plan.end_chunk(total, total).await;
            }
            break;
        }

        let processed = if exhausted {
            total
        } else {
            (reader.position().byte() as usize).min(total)
        };
        plan.end_chunk(processed, total).await;
        reported = Some(processed);

        if exhausted {
            break;
        }
    }

    Ok(builder)
}

fn open_first_sheet(bytes: &[u8]) -> DecodeResult<Range<Data>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| DecodeError::Spreadsheet(e.to_string()))?;

    let sheet_names = workbook.sheet_names();
    let first_sheet = sheet_names.first().cloned().ok_or(DecodeError::NoSheets)?;

    workbook
        .worksheet_range(&first_sheet)
        .map_err(|e| DecodeError::Spreadsheet(format!("sheet '{}': {}", first_sheet, e)))
}

async fn read_spreadsheet(
    bytes: &[u8],
    preview_rows: usize,
    plan: &ChunkPlan<'_>,
) -> DecodeResult<RowBuilder> {
    let range = open_first_sheet(bytes)?;

    let mut rows = range.rows();
    let header_row = rows.next().ok_or(DecodeError::EmptyDataset)?;
    let headers = header_row
        .iter()
        .map(|cell| cell_text(cell).trim().to_string())
        .collect();

    let mut builder = RowBuilder::new(headers, preview_rows)?;

    // header is the first line of the used range
    let first_line = range.start().map(|(row, _)| row as u64).unwrap_or(0) + 2;
    let data: Vec<&[Data]> = rows.collect();

    plan.run(&data, |offset, chunk| {
        for (i, cells) in chunk.iter().enumerate() {
            let line = first_line + (offset + i) as u64;
            builder.push(line, cells.iter().map(cell_text).collect());
        }
    })
    .await?;

    Ok(builder)
}

/// Text form of a spreadsheet cell.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(n) => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                format!("{}", n)
            }
        }
        Data::Int(n) => n.to_string(),
        Data::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Data::DateTime(dt) => format!("{}", dt.as_f64()),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("#{:?}", e),
    }
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode a file into raw rows, reporting progress per chunk.
///
/// Rows whose field count differs from the header are skipped with a
/// warning. Fully blank rows are dropped silently.
///
/// # Errors
/// `EmptyDataset` when no data row survives, `NoSheets` for a spreadsheet
/// without sheets, `Cancelled` when the plan's flag is set, checked
/// before the container is opened and between chunks.
pub async fn decode(
    source: &SourceFile,
    preview_rows: usize,
    plan: ChunkPlan<'_>,
) -> DecodeResult<DecodedFile> {
    plan.check()?;

    let builder = match source.format {
        SourceFormat::DelimitedText => read_delimited(&source.bytes, preview_rows, &plan).await?,
        SourceFormat::Spreadsheet => read_spreadsheet(&source.bytes, preview_rows, &plan).await?,
    };

    builder.finish(source)
}

fn report_warnings(file_name: &str, warnings: &[RowWarning]) {
    if warnings.is_empty() {
        return;
    }
    log_warning(format!("{}: {} malformed rows skipped", file_name, warnings.len()));
    for warning in warnings.iter().take(LOGGED_WARNINGS) {
        log_warning_indent(warning.to_string(), 1);
    }
    if warnings.len() > LOGGED_WARNINGS {
        log_warning_indent(format!("... {} more", warnings.len() - LOGGED_WARNINGS), 1);
    }
}
