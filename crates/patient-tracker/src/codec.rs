//! CSV codec for the patient-location store.
//!
//! The store is a header line followed by one line per record, ten columns
//! wide, quoted the RFC 4180 way. Decoding is lenient: rows that cannot be
//! turned into a record are dropped and reported, never fatal.

use std::fmt::Write as _;
use std::ops::Range;

use thiserror::Error;

use crate::location::{LocationId, PatientLocation};

/// Header line written at the top of every store file.
pub const HEADER: &str =
    "bil,zon,region,address,patients,latitude,longitude,contact_name,contact_phone,status";

/// Number of columns in a data line.
pub const COLUMN_COUNT: usize = 10;

/// Why a data line was dropped during decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    /// The line had fewer than [`COLUMN_COUNT`] cells.
    #[error("expected 10 columns, found {found}")]
    TooFewColumns {
        /// Number of cells actually present.
        found: usize,
    },

    /// The id cell is not a positive integer.
    #[error("invalid id `{0}`")]
    InvalidId(String),

    /// The latitude cell is not a finite number.
    #[error("invalid latitude `{0}`")]
    InvalidLatitude(String),

    /// The longitude cell is not a finite number.
    #[error("invalid longitude `{0}`")]
    InvalidLongitude(String),
}

/// A data line that was dropped, with its 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    /// Line on which the dropped record started.
    pub line: usize,
    /// What was wrong with it.
    pub reason: SkipReason,
}

/// Result of a best-effort decode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodeReport {
    /// Records that parsed, in file order.
    pub records: Vec<PatientLocation>,
    /// Lines that were dropped.
    pub skipped: Vec<SkippedLine>,
}

/// Decode store text into records, silently dropping malformed lines.
#[must_use]
pub fn decode(text: &str) -> Vec<PatientLocation> {
    decode_report(text).records
}

/// Decode store text into records and collect the reasons for dropped lines.
///
/// The first line is always treated as a header and ignored. Blank lines are
/// skipped without being reported.
#[must_use]
pub fn decode_report(text: &str) -> DecodeReport {
    let mut report = DecodeReport::default();

    for row in split_rows(text).into_iter().skip(1) {
        if row.blank {
            continue;
        }

        let parsed = parse_row(&row.cells);
        let source = &text[row.span.clone()];
        if source.contains('\n') {
            // A stray quote can swallow the lines after it. Fall back to
            // reading each physical line on its own unless the joined row is
            // the better reading.
            let per_line = decode_lines(source, row.line);
            let joined_wins =
                parsed.is_ok() && !row.unterminated && per_line.records.len() <= 1;
            if !joined_wins {
                report.records.extend(per_line.records);
                report.skipped.extend(per_line.skipped);
                continue;
            }
        }

        match parsed {
            Ok(record) => report.records.push(record),
            Err(reason) => report.skipped.push(SkippedLine {
                line: row.line,
                reason,
            }),
        }
    }

    report
}

/// Decode every physical line of `text` as a row of its own.
fn decode_lines(text: &str, first_line: usize) -> DecodeReport {
    let mut report = DecodeReport::default();

    for (offset, physical) in text.split('\n').enumerate() {
        for row in split_rows(physical) {
            if row.blank {
                continue;
            }
            match parse_row(&row.cells) {
                Ok(record) => report.records.push(record),
                Err(reason) => report.skipped.push(SkippedLine {
                    line: first_line + offset,
                    reason,
                }),
            }
        }
    }

    report
}

/// Encode records as store text, header first, one `\n`-terminated line each.
#[must_use]
pub fn encode(records: &[PatientLocation]) -> String {
    let mut out = String::with_capacity(HEADER.len() + 1 + records.len() * 96);
    out.push_str(HEADER);
    out.push('\n');

    for record in records {
        let cells = [
            record.id.to_string(),
            escape_cell(&record.zone),
            escape_cell(&record.region),
            escape_cell(&record.address),
            record.patient_count.to_string(),
            record.latitude.to_string(),
            record.longitude.to_string(),
            escape_cell(&record.contact_name),
            escape_cell(&record.contact_phone),
            escape_cell(&record.status),
        ];
        // Writing to a String cannot fail.
        let _ = writeln!(out, "{}", cells.join(","));
    }

    out
}

/// Quote a cell if it contains a separator, a quote or a line break.
#[must_use]
pub fn escape_cell(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn parse_row(cells: &[String]) -> Result<PatientLocation, SkipReason> {
    if cells.len() < COLUMN_COUNT {
        return Err(SkipReason::TooFewColumns { found: cells.len() });
    }

    let id = cells[0]
        .parse::<LocationId>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| SkipReason::InvalidId(cells[0].clone()))?;
    let patient_count = cells[4].parse::<u32>().unwrap_or(0);
    let latitude =
        parse_coordinate(&cells[5]).ok_or_else(|| SkipReason::InvalidLatitude(cells[5].clone()))?;
    let longitude = parse_coordinate(&cells[6])
        .ok_or_else(|| SkipReason::InvalidLongitude(cells[6].clone()))?;

    Ok(PatientLocation {
        id,
        zone: cells[1].clone(),
        region: cells[2].clone(),
        address: cells[3].clone(),
        patient_count,
        latitude,
        longitude,
        contact_name: cells[7].clone(),
        contact_phone: cells[8].clone(),
        status: cells[9].clone(),
    })
}

fn parse_coordinate(cell: &str) -> Option<f64> {
    cell.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// One logical row of the file.
#[derive(Debug)]
struct Row {
    line: usize,
    /// Byte range of the row in the source text, without its line break.
    span: Range<usize>,
    cells: Vec<String>,
    blank: bool,
    /// The text ended inside a quoted cell.
    unterminated: bool,
}

/// Cell being accumulated, with the byte span that came from inside quotes.
#[derive(Debug, Default)]
struct CellBuf {
    text: String,
    quoted: Option<(usize, usize)>,
}

impl CellBuf {
    fn open_quote(&mut self) {
        let at = self.text.len();
        match &mut self.quoted {
            Some((_, end)) => *end = at,
            None => self.quoted = Some((at, at)),
        }
    }

    fn close_quote(&mut self) {
        if let Some((_, end)) = &mut self.quoted {
            *end = self.text.len();
        }
    }

    /// Trim whitespace that lies outside the quoted span.
    fn finish(self) -> String {
        let Some((start, end)) = self.quoted else {
            return self.text.trim().to_string();
        };
        let lead = start - self.text[..start].trim_start().len();
        let tail = &self.text[end..];
        let trail = tail.len() - tail.trim_end().len();
        self.text[lead..self.text.len() - trail].to_string()
    }
}

/// Split text into rows and cells. A line break inside quotes stays in the cell.
fn split_rows(text: &str) -> Vec<Row> {
    let mut rows = Vec::new();
    let mut cells = Vec::new();
    let mut cell = CellBuf::default();
    let mut in_quotes = false;
    let mut blank = true;
    let mut line = 1;
    let mut row_line = 1;
    let mut row_start = 0;

    let mut chars = text.char_indices().peekable();
    while let Some((at, ch)) = chars.next() {
        match ch {
            '"' => {
                blank = false;
                if in_quotes && matches!(chars.peek(), Some((_, '"'))) {
                    cell.text.push('"');
                    chars.next();
                } else if in_quotes {
                    in_quotes = false;
                    cell.close_quote();
                } else {
                    in_quotes = true;
                    cell.open_quote();
                }
            }
            ',' if !in_quotes => {
                blank = false;
                cells.push(std::mem::take(&mut cell).finish());
            }
            '\n' if !in_quotes => {
                cells.push(std::mem::take(&mut cell).finish());
                rows.push(Row {
                    line: row_line,
                    span: row_start..at,
                    cells: std::mem::take(&mut cells),
                    blank,
                    unterminated: false,
                });
                blank = true;
                line += 1;
                row_line = line;
                row_start = at + 1;
            }
            _ => {
                if ch == '\n' {
                    line += 1;
                }
                if !ch.is_whitespace() {
                    blank = false;
                }
                cell.text.push(ch);
            }
        }
    }

    // Final row without a trailing newline.
    if !blank || !cell.text.is_empty() || !cells.is_empty() {
        if in_quotes {
            cell.close_quote();
        }
        cells.push(cell.finish());
        rows.push(Row {
            line: row_line,
            span: row_start..text.len(),
            cells,
            blank,
            unterminated: in_quotes,
        });
    }

    rows
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn sample(id: LocationId) -> PatientLocation {
        PatientLocation::new("North", "Gombak", "Jalan Ipoh 12", 4, 3.2, 101.65)
            .with_id(id)
            .with_contact("Aminah", "012-3456789")
            .with_status("stable")
    }

    fn data(lines: &[&str]) -> String {
        let mut text = String::from(HEADER);
        for line in lines {
            text.push('\n');
            text.push_str(line);
        }
        text
    }

    #[test]
    fn test_encode_starts_with_header() {
        let text = encode(&[]);
        assert_eq!(text, format!("{HEADER}\n"));
    }

    #[test]
    fn test_encode_line_layout() {
        let text = encode(&[sample(1)]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[1],
            "1,North,Gombak,Jalan Ipoh 12,4,3.2,101.65,Aminah,012-3456789,stable"
        );
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_encode_canonical_numbers() {
        let mut record = sample(9);
        record.latitude = 2.0;
        record.longitude = -0.5;
        let text = encode(&[record]);
        assert!(text.contains(",2,-0.5,"));
    }

    #[test]
    fn test_escape_cell() {
        assert_eq!(escape_cell("plain"), "plain");
        assert_eq!(escape_cell("a,b"), "\"a,b\"");
        assert_eq!(escape_cell("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_cell("two\nlines"), "\"two\nlines\"");
        assert_eq!(escape_cell(""), "");
    }

    #[test]
    fn test_roundtrip_preserves_order_and_fields() {
        let records = vec![sample(5), sample(2).with_status(""), sample(11)];
        assert_eq!(decode(&encode(&records)), records);
    }

    #[test]
    fn test_roundtrip_special_cells() {
        for text in [
            "Lot 5, Jalan Klang",
            "the \"blue\" house",
            "ground floor\nblock B",
            "\"",
            ",",
            "a\r\nb",
            "\"\"quoted,\"\"\nmix",
        ] {
            let record = sample(1).with_status(text);
            let decoded = decode(&encode(std::slice::from_ref(&record)));
            assert_eq!(decoded, vec![record], "cell {text:?} did not survive");
        }
    }

    #[test]
    fn test_decode_discards_header_unconditionally() {
        let text = "1,this,is,not,a,header,at,all,but,ignored\n2,Z,R,A,1,1.5,2.5,,,";
        let records = decode(text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, 2);
    }

    #[test]
    fn test_decode_non_numeric_patient_count_defaults_to_zero() {
        let report = decode_report(&data(&["1,North,,,abc,3.1,101.6,,,"]));
        assert!(report.skipped.is_empty());
        assert_eq!(report.records.len(), 1);
        let record = &report.records[0];
        assert_eq!(record.id, 1);
        assert_eq!(record.zone, "North");
        assert_eq!(record.patient_count, 0);
        assert!((record.latitude - 3.1).abs() < f64::EPSILON);
    }

    #[test]
    fn test_decode_drops_short_line() {
        let report = decode_report(&data(&[
            "1,North,Gombak,Addr,3,3.1,101.6,Name",
            "2,South,Klang,Addr,3,3.0,101.4,,,",
        ]));
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].id, 2);
        assert_eq!(
            report.skipped,
            vec![SkippedLine {
                line: 2,
                reason: SkipReason::TooFewColumns { found: 8 },
            }]
        );
    }

    #[test]
    fn test_decode_drops_bad_id_and_coordinates() {
        let report = decode_report(&data(&[
            "x,North,R,A,1,3.1,101.6,,,",
            "0,North,R,A,1,3.1,101.6,,,",
            "3,North,R,A,1,north,101.6,,,",
            "4,North,R,A,1,3.1,,,,",
            "5,North,R,A,1,NaN,101.6,,,",
            "6,North,R,A,1,3.1,101.6,,,",
        ]));
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].id, 6);

        let reasons: Vec<_> = report.skipped.iter().map(|s| s.reason.clone()).collect();
        assert_eq!(
            reasons,
            vec![
                SkipReason::InvalidId("x".to_string()),
                SkipReason::InvalidId("0".to_string()),
                SkipReason::InvalidLatitude("north".to_string()),
                SkipReason::InvalidLongitude(String::new()),
                SkipReason::InvalidLatitude("NaN".to_string()),
            ]
        );
    }

    #[test]
    fn test_decode_skips_blank_lines_silently() {
        let report = decode_report(&data(&["", "   ", "7,Z,R,A,1,1,2,,,", ""]));
        assert_eq!(report.records.len(), 1);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_decode_trims_whitespace_outside_quotes_only() {
        let report = decode_report(&data(&["  8 , Zone A ,\"  padded  \" , A ,1, 1.5 ,2.5,,,"]));
        let record = &report.records[0];
        assert_eq!(record.id, 8);
        assert_eq!(record.zone, "Zone A");
        assert_eq!(record.region, "  padded  ");
        assert_eq!(record.address, "A");
    }

    #[test]
    fn test_decode_handles_crlf() {
        let text = format!("{HEADER}\r\n1,Z,R,A,2,1.5,2.5,n,p,s\r\n");
        let records = decode(&text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, "s");
    }

    #[test]
    fn test_decode_extra_columns_are_ignored() {
        let records = decode(&data(&["1,Z,R,A,2,1.5,2.5,n,p,s,extra,more"]));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, "s");
    }

    #[test]
    fn test_decode_quoted_newline_reports_start_line() {
        let report = decode_report(&data(&["1,\"multi\nline\",R,A", "2,Z,R,A,1,1,1,,,"]));
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.skipped[0].line, 2);
    }

    #[test]
    fn test_decode_stray_quote_only_loses_its_own_line() {
        let report = decode_report(&data(&[
            "1,North,R,5\" screen,1,3.1,101.6,,,",
            "2,North,R,A,1,3.1,101.6,,,",
            "3,South,R,A,1,3.0,101.5,,,",
            "4,East,R,A,1,3.2,101.7,,,",
        ]));

        let ids: Vec<_> = report.records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 3, 4]);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].line, 2);
    }

    #[test]
    fn test_decode_two_stray_quotes_do_not_swallow_rows_between() {
        let report = decode_report(&data(&[
            "1,North,R,5\" screen,1,3.1,101.6,,,",
            "2,North,R,A,1,3.1,101.6,,,",
            "3,South,R,A,1,3.0,101.5,,,",
            "4,East,R,7\" wall,1,3.2,101.7,,,",
            "5,West,R,A,1,3.3,101.8,,,",
        ]));

        let ids: Vec<_> = report.records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 3, 5]);
        let lines: Vec<_> = report.skipped.iter().map(|s| s.line).collect();
        assert_eq!(lines, vec![2, 5]);
    }

    #[test]
    fn test_decode_quoted_newline_in_middle_column() {
        let records = decode(&data(&[
            "1,North,R,\"ground floor\nblock B\",1,3.1,101.6,,,",
            "2,South,R,A,1,3.0,101.5,,,",
        ]));
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].address, "ground floor\nblock B");
    }

    #[test]
    fn test_decode_empty_input() {
        assert!(decode("").is_empty());
        assert!(decode(HEADER).is_empty());
    }

    #[test]
    fn test_skip_reason_display() {
        let reason = SkipReason::TooFewColumns { found: 8 };
        assert_eq!(reason.to_string(), "expected 10 columns, found 8");
        assert!(SkipReason::InvalidId("x".into()).to_string().contains("id"));
    }

    fn cell_text() -> impl Strategy<Value = String> {
        "[a-zA-Z ,\"\r\n]{0,16}".prop_map(|text| text.trim().to_string())
    }

    fn any_record() -> impl Strategy<Value = PatientLocation> {
        (
            (1..=LocationId::MAX, any::<u32>(), -90.0f64..90.0, -180.0f64..180.0),
            (cell_text(), cell_text(), cell_text()),
            (cell_text(), cell_text(), cell_text()),
        )
            .prop_map(
                |(
                    (id, patient_count, latitude, longitude),
                    (zone, region, address),
                    (contact_name, contact_phone, status),
                )| PatientLocation {
                    id,
                    zone,
                    region,
                    address,
                    patient_count,
                    latitude,
                    longitude,
                    contact_name,
                    contact_phone,
                    status,
                },
            )
    }

    proptest! {
        #[test]
        fn property_encode_then_decode_is_identity(
            records in prop::collection::vec(any_record(), 0..8)
        ) {
            let report = decode_report(&encode(&records));
            prop_assert!(report.skipped.is_empty(), "{:?}", report.skipped);
            prop_assert_eq!(report.records, records);
        }
    }
}
