//! Reading uploaded product tables and writing result tables.
//!
//! Input is RFC 4180 CSV with a header row. Each data row needs at least
//! three fields: serial number, product label and image URLs. Anything past
//! the third field is treated as more URLs, so unquoted URL lists that spill
//! across columns are recovered.

use csv::{ReaderBuilder, WriterBuilder};

use crate::models::row::{InputRecord, RowResult};

pub const RESULT_HEADER: [&str; 4] = [
    "S. No.",
    "Product Name",
    "Input Image Urls",
    "Output Image Urls",
];

/// Minimum number of fields for a row to be processed.
pub const MIN_FIELDS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedRow {
    Valid(InputRecord),
    Rejected { line: u64, field_count: usize },
}

#[derive(Debug, Clone)]
pub struct InputTable {
    pub headers: Vec<String>,
    pub rows: Vec<ParsedRow>,
}

/// Parse an uploaded table, failing on structural problems only.
pub fn parse_input(bytes: &[u8]) -> Result<InputTable, TableError> {
    if bytes.is_empty() {
        return Err(TableError::EmptyInput);
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);
    let mut records = reader.records();

    let headers = match records.next() {
        Some(record) => record?.iter().map(str::to_string).collect(),
        None => return Err(TableError::MissingHeader),
    };

    let mut rows = Vec::new();
    for record in records {
        let record = record?;
        let field_count = record.len();
        if field_count < MIN_FIELDS {
            rows.push(ParsedRow::Rejected {
                line: record.position().map(|p| p.line()).unwrap_or_default(),
                field_count,
            });
            continue;
        }

        let urls: Vec<&str> = record.iter().skip(2).collect();
        rows.push(ParsedRow::Valid(InputRecord {
            serial_number: record[0].to_string(),
            product_label: record[1].to_string(),
            raw_url_text: urls.join(","),
        }));
    }

    if rows.is_empty() {
        return Err(TableError::NoDataRows);
    }

    Ok(InputTable { headers, rows })
}

/// Render the result table: header plus one line per processed row.
pub fn render_result_table(rows: &[RowResult]) -> Result<Vec<u8>, TableError> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(RESULT_HEADER)?;

    for row in rows {
        let inputs = row.input_urls.join(",");
        let outputs = row.output_refs().join(",");
        writer.write_record([
            row.serial_number.as_str(),
            row.product_label.as_str(),
            inputs.as_str(),
            outputs.as_str(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| TableError::Csv(e.into_error().into()))
}

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("CSV file is empty")]
    EmptyInput,

    #[error("CSV file has no header row")]
    MissingHeader,

    #[error("CSV file has no data rows")]
    NoDataRows,

    #[error("Malformed CSV: {0}")]
    Csv(#[from] csv::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::row::ImageOutcome;

    #[test]
    fn test_empty_and_header_only_are_distinct_errors() {
        assert!(matches!(parse_input(b""), Err(TableError::EmptyInput)));
        assert!(matches!(parse_input(b"\n\n"), Err(TableError::MissingHeader)));
        assert!(matches!(
            parse_input(b"S. No.,Product Name,Input Image Urls\n"),
            Err(TableError::NoDataRows)
        ));
    }

    #[test]
    fn test_short_rows_are_rejected_not_fatal() {
        let table = parse_input(b"sn,name,urls\n1,Only Two\n2,Widget,http://x/a.jpg\n").unwrap();
        assert_eq!(table.headers, vec!["sn", "name", "urls"]);
        assert_eq!(table.rows.len(), 2);
        assert!(matches!(
            table.rows[0],
            ParsedRow::Rejected { field_count: 2, .. }
        ));
        assert!(matches!(table.rows[1], ParsedRow::Valid(_)));
    }

    #[test]
    fn test_quoted_and_spilled_url_lists() {
        let input = b"sn,name,urls\n\
            1,Shirt,\"http://x/a.jpg, http://x/b.png\"\n\
            2,Shoe,http://x/c.jpg,http://x/d.jpg\n";
        let table = parse_input(input).unwrap();

        let ParsedRow::Valid(first) = &table.rows[0] else {
            panic!("expected valid row");
        };
        assert_eq!(first.raw_url_text, "http://x/a.jpg, http://x/b.png");

        let ParsedRow::Valid(second) = &table.rows[1] else {
            panic!("expected valid row");
        };
        assert_eq!(second.serial_number, "2");
        assert_eq!(second.product_label, "Shoe");
        assert_eq!(second.raw_url_text, "http://x/c.jpg,http://x/d.jpg");
    }

    #[test]
    fn test_render_result_table() {
        let rows = vec![RowResult {
            serial_number: "1".into(),
            product_label: "Shirt".into(),
            input_urls: vec!["http://x/a.jpg".into(), "http://x/b".into()],
            outputs: vec![
                ImageOutcome::Stored("/static/compressed_images/j_Shirt_0.jpg".into()),
                ImageOutcome::Failed,
            ],
        }];

        let rendered = String::from_utf8(render_result_table(&rows).unwrap()).unwrap();
        let mut lines = rendered.lines();
        assert_eq!(
            lines.next(),
            Some("S. No.,Product Name,Input Image Urls,Output Image Urls")
        );
        assert_eq!(
            lines.next(),
            Some("1,Shirt,\"http://x/a.jpg,http://x/b\",\"/static/compressed_images/j_Shirt_0.jpg,error\"")
        );
        assert_eq!(lines.next(), None);
    }
}
