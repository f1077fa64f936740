use std::sync::Arc;

use rust_xlsxwriter::Workbook;
use serde::Serialize;
use serde_json::Value;

use crate::error::ExportError;

pub const CSV_MIME: &str = "text/csv;charset=utf-8";
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// ExportBlob
///
/// A serialized export ready for download. Naming the file is the host's concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportBlob {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
}

/// Column
///
/// One `(header, extractor)` pair of a delimited-text export. Columns are chosen by the
/// caller, independent of what the view displays.
pub struct Column<R> {
    header: String,
    extract: Box<dyn Fn(&R) -> String + Send + Sync>,
}

impl<R> Column<R> {
    pub fn new<F>(header: impl Into<String>, extract: F) -> Self
    where
        F: Fn(&R) -> String + Send + Sync + 'static,
    {
        Self {
            header: header.into(),
            extract: Box::new(extract),
        }
    }

    pub fn header(&self) -> &str {
        &self.header
    }
}

/// Wraps a value in double quotes, doubling any quote inside it.
pub fn quote_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// to_delimited_text
///
/// Header row first, then one row per record. Every field is quoted, fields are joined
/// with a comma and rows with a newline.
pub fn to_delimited_text<'a, R: 'a>(
    records: impl IntoIterator<Item = &'a R>,
    columns: &[Column<R>],
) -> ExportBlob {
    let header = columns
        .iter()
        .map(|c| quote_field(&c.header))
        .collect::<Vec<_>>()
        .join(",");

    let mut lines = vec![header];
    lines.extend(records.into_iter().map(|record| {
        columns
            .iter()
            .map(|c| quote_field(&(c.extract)(record)))
            .collect::<Vec<_>>()
            .join(",")
    }));

    ExportBlob {
        bytes: lines.join("\n").into_bytes(),
        mime: CSV_MIME,
    }
}

/// SheetTable
///
/// Records flattened into a grid with inferred columns: the union of the serialized
/// field names in first-seen order, one row per record. Records that do not serialize
/// to an object land in a single `value` column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SheetTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl SheetTable {
    pub fn from_records<'a, R: Serialize + 'a>(
        records: impl IntoIterator<Item = &'a R>,
    ) -> Result<Self, ExportError> {
        let objects = records
            .into_iter()
            .map(|record| {
                Ok(match serde_json::to_value(record)? {
                    Value::Object(map) => map,
                    other => {
                        let mut map = serde_json::Map::new();
                        map.insert("value".to_string(), other);
                        map
                    }
                })
            })
            .collect::<Result<Vec<_>, ExportError>>()?;

        let mut columns: Vec<String> = Vec::new();
        for object in &objects {
            for key in object.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }

        let rows = objects
            .into_iter()
            .map(|mut object| {
                columns
                    .iter()
                    .map(|c| object.remove(c).unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Ok(Self { columns, rows })
    }
}

/// SpreadsheetEncoder
///
/// The external "serialize rows to a byte blob with a given MIME type" capability.
pub trait SpreadsheetEncoder: Send + Sync {
    fn encode(&self, sheet_name: &str, table: &SheetTable) -> Result<Vec<u8>, ExportError>;

    fn mime(&self) -> &'static str {
        XLSX_MIME
    }
}

/// XlsxEncoder
///
/// Writes an `.xlsx` workbook with a single sheet: header row, then typed cells.
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxEncoder;

impl SpreadsheetEncoder for XlsxEncoder {
    fn encode(&self, sheet_name: &str, table: &SheetTable) -> Result<Vec<u8>, ExportError> {
        let encoding = |e: rust_xlsxwriter::XlsxError| ExportError::Encoding(e.to_string());

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet_name).map_err(encoding)?;

        for (col, header) in table.columns.iter().enumerate() {
            worksheet
                .write_string(0, column_index(col)?, header.as_str())
                .map_err(encoding)?;
        }

        for (row_offset, row) in table.rows.iter().enumerate() {
            let row_num = u32::try_from(row_offset + 1)
                .map_err(|_| ExportError::Encoding("too many rows".to_string()))?;

            for (col, cell) in row.iter().enumerate() {
                let col_num = column_index(col)?;
                match cell {
                    Value::Null => {}
                    Value::Bool(b) => {
                        worksheet
                            .write_boolean(row_num, col_num, *b)
                            .map_err(encoding)?;
                    }
                    Value::Number(n) => {
                        let number = n.as_f64().unwrap_or_default();
                        worksheet
                            .write_number(row_num, col_num, number)
                            .map_err(encoding)?;
                    }
                    Value::String(s) => {
                        worksheet
                            .write_string(row_num, col_num, s.as_str())
                            .map_err(encoding)?;
                    }
                    nested => {
                        worksheet
                            .write_string(row_num, col_num, nested.to_string())
                            .map_err(encoding)?;
                    }
                }
            }
        }

        workbook.save_to_buffer().map_err(encoding)
    }
}

fn column_index(col: usize) -> Result<u16, ExportError> {
    u16::try_from(col).map_err(|_| ExportError::Encoding("too many columns".to_string()))
}

/// to_spreadsheet
///
/// Hands the full collection to the encoder. Nothing about the caller's filter or page
/// state is read or changed.
pub fn to_spreadsheet<'a, R: Serialize + 'a>(
    records: impl IntoIterator<Item = &'a R>,
    sheet_name: &str,
    encoder: &dyn SpreadsheetEncoder,
) -> Result<ExportBlob, ExportError> {
    let table = SheetTable::from_records(records)?;
    let bytes = encoder.encode(sheet_name, &table)?;
    Ok(ExportBlob {
        bytes,
        mime: encoder.mime(),
    })
}

/// EncoderState
///
/// The concrete type used to share the spreadsheet encoder across the application state.
pub type EncoderState = Arc<dyn SpreadsheetEncoder>;
