use crate::error::{Result, TabularError};
use simlog_protocol::{Cell, TabularDataset};
use std::collections::HashSet;

pub const DEFAULT_DELIMITER: u8 = b',';

/// Parses delimited text with a header row into a dataset of text cells.
///
/// A leading UTF-8 byte order mark is ignored. Blank lines are skipped, quoted
/// fields may span lines, `""` inside quotes is a literal quote, and `\n`,
/// `\r\n` and `\r` terminators are all accepted. A resource with no data rows
/// yields an empty dataset.
pub fn parse_delimited(input: &[u8], delimiter: u8) -> Result<TabularDataset> {
    let input = skip_leading_blank_lines(strip_bom(input));
    check_quotes_terminated(input, delimiter)?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(input);

    let columns: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(str::to_string)
        .collect();
    if columns.is_empty() {
        return Ok(TabularDataset::empty());
    }
    reject_duplicate_columns(&columns)?;

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(csv_error)?;
        if record.len() != columns.len() {
            if record.len() == 1 && record[0].trim().is_empty() {
                continue;
            }
            let line = record.position().map_or(0, csv::Position::line);
            return Err(TabularError::parse(format!(
                "line {line}: expected {} fields, found {}",
                columns.len(),
                record.len()
            )));
        }
        rows.push(record.iter().map(Cell::from).collect());
    }

    if rows.is_empty() {
        return Ok(TabularDataset::empty());
    }
    Ok(TabularDataset::new(columns, rows))
}

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

fn strip_bom(input: &[u8]) -> &[u8] {
    input.strip_prefix(UTF8_BOM).unwrap_or(input)
}

/// Whitespace-only lines before the header are ignored like those between rows.
fn skip_leading_blank_lines(mut input: &[u8]) -> &[u8] {
    loop {
        let line_end = input
            .iter()
            .position(|&b| b == b'\n' || b == b'\r')
            .unwrap_or(input.len());
        if !input[..line_end].iter().all(u8::is_ascii_whitespace) {
            return input;
        }
        if line_end == input.len() {
            return &input[line_end..];
        }
        input = &input[line_end + 1..];
    }
}

fn reject_duplicate_columns(columns: &[String]) -> Result<()> {
    let mut seen = HashSet::with_capacity(columns.len());
    for name in columns {
        if !seen.insert(name.as_str()) {
            return Err(TabularError::parse(format!("duplicate column name `{name}`")));
        }
    }
    Ok(())
}

fn csv_error(err: csv::Error) -> TabularError {
    match err.position() {
        Some(pos) => TabularError::parse(format!("line {}: {err}", pos.line())),
        None => TabularError::parse(err.to_string()),
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum QuoteState {
    FieldStart,
    Unquoted,
    Quoted,
    QuoteInQuoted,
}

/// The csv reader silently closes a quoted field at end of input; reject that.
fn check_quotes_terminated(input: &[u8], delimiter: u8) -> Result<()> {
    let mut state = QuoteState::FieldStart;
    let mut line = 1u64;
    let mut opened_at = 0u64;
    let mut prev = 0u8;

    for &byte in input {
        let newline = (byte == b'\n' && prev != b'\r') || byte == b'\r';
        if newline {
            line += 1;
        }
        prev = byte;

        let boundary = byte == delimiter || byte == b'\n' || byte == b'\r';
        state = match state {
            QuoteState::FieldStart if byte == b'"' => {
                opened_at = line;
                QuoteState::Quoted
            }
            QuoteState::FieldStart | QuoteState::Unquoted | QuoteState::QuoteInQuoted
                if boundary =>
            {
                QuoteState::FieldStart
            }
            QuoteState::FieldStart | QuoteState::Unquoted => QuoteState::Unquoted,
            QuoteState::Quoted if byte == b'"' => QuoteState::QuoteInQuoted,
            QuoteState::Quoted => QuoteState::Quoted,
            QuoteState::QuoteInQuoted if byte == b'"' => QuoteState::Quoted,
            QuoteState::QuoteInQuoted => QuoteState::Unquoted,
        };
    }

    if state == QuoteState::Quoted {
        return Err(TabularError::parse(format!(
            "unterminated quoted field starting on line {opened_at}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text_rows(dataset: &TabularDataset) -> Vec<Vec<&str>> {
        dataset
            .rows
            .iter()
            .map(|row| row.iter().map(|cell| cell.as_text().unwrap()).collect())
            .collect()
    }

    #[test]
    fn parses_header_and_rows() {
        let dataset = parse_delimited(b"a,b\n1,2\n3,4\n", DEFAULT_DELIMITER).unwrap();
        assert_eq!(dataset.columns, vec!["a", "b"]);
        assert_eq!(text_rows(&dataset), vec![vec!["1", "2"], vec!["3", "4"]]);
        assert_eq!(dataset.row_count, 2);
        assert_eq!(dataset.col_count, 2);
    }

    #[test]
    fn empty_resource_yields_empty_dataset() {
        let dataset = parse_delimited(b"", DEFAULT_DELIMITER).unwrap();
        assert_eq!(dataset, TabularDataset::empty());
        assert_eq!((dataset.row_count, dataset.col_count), (0, 0));
        assert!(dataset.columns.is_empty());
    }

    #[test]
    fn header_without_rows_yields_empty_dataset() {
        let dataset = parse_delimited(b"time,queue_length\n\n", DEFAULT_DELIMITER).unwrap();
        assert_eq!(dataset, TabularDataset::empty());
    }

    #[test]
    fn quoted_fields_keep_delimiters_newlines_and_escaped_quotes() {
        let input = b"name,note\n\"Lift, A\",\"said \"\"up\"\"\nthen down\"\n";
        let dataset = parse_delimited(input, DEFAULT_DELIMITER).unwrap();
        assert_eq!(
            text_rows(&dataset),
            vec![vec!["Lift, A", "said \"up\"\nthen down"]]
        );
    }

    #[test]
    fn accepts_all_line_ending_styles_and_skips_blank_lines() {
        for input in [
            &b"a,b\r\n1,2\r\n\r\n3,4\r\n"[..],
            &b"a,b\r1,2\r\r3,4\r"[..],
            &b"\n\na,b\n1,2\n\n3,4"[..],
        ] {
            let dataset = parse_delimited(input, DEFAULT_DELIMITER).unwrap();
            assert_eq!(dataset.columns, vec!["a", "b"]);
            assert_eq!(text_rows(&dataset), vec![vec!["1", "2"], vec!["3", "4"]]);
        }
    }

    #[test]
    fn whitespace_only_lines_are_skipped() {
        let dataset = parse_delimited(b"a,b\n1,2\n   \n3,4\n", DEFAULT_DELIMITER).unwrap();
        assert_eq!(dataset.row_count, 2);
    }

    #[test]
    fn duplicate_header_is_a_parse_error() {
        let err = parse_delimited(b"time,time\n1,2\n", DEFAULT_DELIMITER).unwrap_err();
        assert!(matches!(err, TabularError::ParseError(_)));
        assert!(err.to_string().contains("duplicate column name `time`"));
    }

    #[test]
    fn unterminated_quote_is_a_parse_error() {
        let err = parse_delimited(b"a,b\n1,\"open\n3,4\n", DEFAULT_DELIMITER).unwrap_err();
        assert!(matches!(err, TabularError::ParseError(_)));
        assert!(err.to_string().contains("line 2"), "{err}");
    }

    #[test]
    fn byte_order_mark_does_not_hide_unterminated_quote() {
        let err = parse_delimited(b"\xEF\xBB\xBF\"a,b\n1,2\n", DEFAULT_DELIMITER).unwrap_err();
        assert!(matches!(err, TabularError::ParseError(_)), "{err}");

        let dataset = parse_delimited(b"\xEF\xBB\xBFa,b\n1,2\n", DEFAULT_DELIMITER).unwrap();
        assert_eq!(dataset.columns, vec!["a", "b"]);
        assert_eq!(text_rows(&dataset), vec![vec!["1", "2"]]);
    }

    #[test]
    fn whitespace_only_lines_before_header_are_skipped() {
        for input in [&b"   \na,b\n1,2\n"[..], &b" \t\r\n\r\na,b\n1,2\n"[..]] {
            let dataset = parse_delimited(input, DEFAULT_DELIMITER).unwrap();
            assert_eq!(dataset.columns, vec!["a", "b"]);
            assert_eq!(text_rows(&dataset), vec![vec!["1", "2"]]);
        }
        assert_eq!(
            parse_delimited(b"  \n \n", DEFAULT_DELIMITER).unwrap(),
            TabularDataset::empty()
        );
    }

    #[test]
    fn stray_quote_inside_unquoted_field_is_literal() {
        let dataset = parse_delimited(b"size\n5\"\n", DEFAULT_DELIMITER).unwrap();
        assert_eq!(text_rows(&dataset), vec![vec!["5\""]]);
    }

    #[test]
    fn ragged_record_is_a_parse_error() {
        let err = parse_delimited(b"a,b\n1,2,3\n", DEFAULT_DELIMITER).unwrap_err();
        assert!(err.to_string().contains("expected 2 fields, found 3"), "{err}");
    }

    #[test]
    fn custom_delimiter() {
        let dataset = parse_delimited(b"a;b\n1;2\n", b';').unwrap();
        assert_eq!(dataset.columns, vec!["a", "b"]);
        assert_eq!(text_rows(&dataset), vec![vec!["1", "2"]]);
    }
}
