//! CSV export of grade rows.

use std::io::{Read, Write};

use crate::error::{ReportError, Result};
use crate::parser::flatten::GradeRow;

pub const CSV_HEADER: [&str; 4] = ["class", "grading_period", "description", "score"];

/// Write rows with a `class,grading_period,description,score` header.
pub fn write_rows_csv<W: Write>(writer: W, rows: &[GradeRow]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(CSV_HEADER)
        .map_err(|e| ReportError::Serialization(format!("CSV write error: {e}")))?;

    for row in rows {
        wtr.serialize(row)
            .map_err(|e| ReportError::Serialization(format!("CSV write error: {e}")))?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn rows_to_csv_bytes(rows: &[GradeRow]) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    write_rows_csv(&mut buffer, rows)?;
    Ok(buffer)
}

pub fn read_rows_csv<R: Read>(reader: R) -> Result<Vec<GradeRow>> {
    let mut rdr = csv::Reader::from_reader(reader);
    rdr.deserialize::<GradeRow>()
        .map(|row| row.map_err(|e| ReportError::Serialization(format!("CSV read error: {e}"))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_export_still_has_header() {
        let bytes = rows_to_csv_bytes(&[]).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "class,grading_period,description,score\n");
    }

    #[test]
    fn fields_with_commas_and_quotes_are_escaped() {
        let rows = vec![GradeRow {
            class: "Art, Studio".into(),
            grading_period: "Q1".into(),
            description: "Uses \"line\"".into(),
            score: "P".into(),
        }];
        let bytes = rows_to_csv_bytes(&rows).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.contains("\"Art, Studio\""));
        assert_eq!(read_rows_csv(bytes.as_slice()).unwrap(), rows);
    }
}
