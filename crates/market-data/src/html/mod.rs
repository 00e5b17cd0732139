//! Streaming extraction of `<table>` data from markup.
//!
//! This module provides:
//! - [`TableExtractor`]: push-based state machine turning markup chunks into [`Table`]s
//! - [`extract_tables`]: one-shot extraction from an in-memory document
//! - [`extract_tables_from_stream`]: extraction from an async byte stream, such as
//!   a response body, without buffering the whole document
//!
//! Only `table`, `tr`, `td` and `th` tags are significant. Text inside a cell
//! is concatenated across any other nested tags and trimmed once when the
//! cell closes. The result holds every table closed before input ended, in
//! the order each was closed.

mod extractor;

pub use extractor::{ExtractorState, TableExtractor};

use futures::{Stream, StreamExt};
use log::warn;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Chunks buffered between the body reader and the extraction worker.
const STREAM_BUFFER: usize = 16;

/// Trimmed text content of one table cell.
pub type Cell = String;

/// Cells of one table row, in document order.
pub type Row = Vec<Cell>;

/// A fully closed `<table>`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Rows in document order
    pub rows: Vec<Row>,
}

/// Extract every table from an in-memory document.
pub fn extract_tables(markup: &str) -> Vec<Table> {
    let mut extractor = TableExtractor::new();
    extractor.push(markup.as_bytes());
    extractor.finish()
}

/// Extract every table from a stream of byte chunks.
///
/// The tokenizer state is not `Send`, so it lives on a blocking worker that
/// receives chunks as they arrive; the returned future stays `Send`.
/// Running out of input is the normal end of extraction; only an error
/// yielded by the stream itself is returned as `Err`.
pub async fn extract_tables_from_stream<S, B, E>(stream: S) -> Result<Vec<Table>, E>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    let (chunks, mut received) = mpsc::channel::<Vec<u8>>(STREAM_BUFFER);
    let worker = tokio::task::spawn_blocking(move || {
        let mut extractor = TableExtractor::new();
        while let Some(chunk) = received.blocking_recv() {
            extractor.push(&chunk);
        }
        extractor.finish()
    });

    let mut stream = std::pin::pin!(stream);
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if chunks.send(chunk.as_ref().to_vec()).await.is_err() {
            break;
        }
    }
    drop(chunks);

    match worker.await {
        Ok(tables) => Ok(tables),
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => {
            warn!("Table extraction worker did not finish: {}", e);
            Ok(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_GRID: &str = r#"
<html>
<table>
  <tr>
    <td>A</td>
    <td>B</td>
  </tr>
  <tr>
    <td>C</td>
    <td>D</td>
  </tr>
</table>
</html>
"#;

    const SAMPLE_HOLDER_ROWS: &str = r#"
<html>
  <table>
  <thead data-reactid="45">
    <tr>
      <th>
        <span data-reactid="48">Holder</span>
      </th>
      <th>
        <span data-reactid="50">Shares</span>
      </th>
      <th>
        <span data-reactid="52">Date Reported</span>
      </th>
      <th>
        <span data-reactid="54">% Out</span>
      </th>
      <th>
        <span data-reactid="56">Value</span>
      </th>
    </tr>
  </thead>
  <tbody data-reactid="57">
    <tr>
      <td>FMR, LLC</td>
      <td>9,276,087</td>
      <td>
        <span data-reactid="62">Dec 30, 2020</span>
      </td>
      <td>13.26%</td>
      <td>174,761,479</td>
    </tr>
    <tr>
      <td>Blackrock Inc.</td>
      <td>9,217,335</td>
      <td>
        <span data-reactid="69">Dec 30, 2020</span>
      </td>
      <td>13.18%</td>
      <td>173,654,591</td>
    </tr>
  </tbody>
</table>
"#;

    fn strings(values: &[&str]) -> Row {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_single_grid() {
        let tables = extract_tables(SAMPLE_GRID);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows, vec![strings(&["A", "B"]), strings(&["C", "D"])]);
    }

    #[test]
    fn test_compact_grid() {
        let tables = extract_tables(
            "<table><tr><td>A</td><td>B</td></tr><tr><td>C</td><td>D</td></tr></table>",
        );
        assert_eq!(tables, vec![Table {
            rows: vec![strings(&["A", "B"]), strings(&["C", "D"])],
        }]);
    }

    #[test]
    fn test_no_table() {
        assert!(extract_tables("<html>\n</html>\n").is_empty());
        assert!(extract_tables("").is_empty());
    }

    #[test]
    fn test_empty_table() {
        let tables = extract_tables("<html>\n<table>\n</table>\n</html>\n");
        assert_eq!(tables.len(), 1);
        assert!(tables[0].rows.is_empty());
    }

    #[test]
    fn test_sibling_tables_in_document_order() {
        let tables = extract_tables(
            "<table><tr><td>One</td></tr></table>\n<table><tr><td>Two</td></tr></table>",
        );
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].rows, vec![strings(&["One"])]);
        assert_eq!(tables[1].rows, vec![strings(&["Two"])]);
    }

    #[test]
    fn test_header_and_body_rows() {
        let tables = extract_tables(SAMPLE_HOLDER_ROWS);
        assert_eq!(tables.len(), 1);

        let rows = &tables[0].rows;
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|row| row.len() == 5));
        assert_eq!(
            rows[0],
            strings(&["Holder", "Shares", "Date Reported", "% Out", "Value"])
        );
        assert_eq!(
            rows[1],
            strings(&["FMR, LLC", "9,276,087", "Dec 30, 2020", "13.26%", "174,761,479"])
        );
        assert_eq!(
            rows[2],
            strings(&["Blackrock Inc.", "9,217,335", "Dec 30, 2020", "13.18%", "173,654,591"])
        );
    }

    #[test]
    fn test_nested_inline_markup_is_concatenated_and_trimmed() {
        let tables = extract_tables("<table><tr><td>  <b>Big</b> <i>Co</i>\n </td></tr></table>");
        assert_eq!(tables[0].rows, vec![strings(&["Big Co"])]);
    }

    #[test]
    fn test_extraction_is_idempotent() {
        assert_eq!(extract_tables(SAMPLE_HOLDER_ROWS), extract_tables(SAMPLE_HOLDER_ROWS));
    }

    #[test]
    fn test_unclosed_table_is_dropped() {
        let tables = extract_tables(
            "<table><tr><td>kept</td></tr></table><table><tr><td>lost</td></tr>",
        );
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows, vec![strings(&["kept"])]);
    }

    #[test]
    fn test_uppercase_tags() {
        let tables = extract_tables("<TABLE><TR><TH>h</TH></TR><TR><TD>v</TD></TR></TABLE>");
        assert_eq!(tables[0].rows, vec![strings(&["h"]), strings(&["v"])]);
    }

    #[test]
    fn test_named_and_numeric_references_are_decoded() {
        let tables = extract_tables(
            "<table><tr>\
             <td>Soci&eacute;t&eacute; G&eacute;n&eacute;rale</td>\
             <td>T. Rowe Price&rsquo;s Fund</td>\
             <td>A&amp B</td>\
             <td>x&mdash;y</td>\
             <td>&#65;&#x42;&nbsp;</td>\
             </tr></table>",
        );
        assert_eq!(
            tables[0].rows,
            vec![strings(&[
                "Soci\u{e9}t\u{e9} G\u{e9}n\u{e9}rale",
                "T. Rowe Price\u{2019}s Fund",
                "A& B",
                "x\u{2014}y",
                "AB",
            ])]
        );
    }

    #[test]
    fn test_unknown_reference_is_kept_verbatim() {
        let tables = extract_tables("<table><tr><td>AT&T &bogus; co</td></tr></table>");
        assert_eq!(tables[0].rows, vec![strings(&["AT&T &bogus; co"])]);
    }

    #[test]
    fn test_comments_hide_nothing_after_them() {
        let tables = extract_tables(
            "<!--><table><tr><td>kept</td></tr></table>\
             <!----><table><tr><td><!-- <td>no --></td></tr></table>",
        );
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].rows, vec![strings(&["kept"])]);
        assert_eq!(tables[1].rows, vec![strings(&[""])]);
    }

    #[test]
    fn test_literal_less_than_stays_in_cell() {
        let tables = extract_tables("<table><tr><td>a < b</td><td>1 <2</td></tr></table>");
        assert_eq!(tables[0].rows, vec![strings(&["a < b", "1 <2"])]);
    }

    #[test]
    fn test_script_and_style_bodies_are_not_markup() {
        let tables = extract_tables(
            "<script>var s = '<table><tr><td>fake</td></tr></table>';</script>\
             <style>td::after { content: '</table>'; }</style>\
             <table><tr><td>real</td></tr></table>",
        );
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows, vec![strings(&["real"])]);
    }

    #[test]
    fn test_chunks_split_inside_references_and_characters() {
        let markup = "<table><tr><td>Soci&eacute;t\u{e9} &amp; \u{65e5}\u{672c}</td></tr></table>";
        let expected = extract_tables(markup);
        assert_eq!(expected[0].rows, vec![strings(&["Soci\u{e9}t\u{e9} & \u{65e5}\u{672c}"])]);

        for size in 1..=5 {
            let mut extractor = TableExtractor::new();
            for chunk in markup.as_bytes().chunks(size) {
                extractor.push(chunk);
            }
            assert_eq!(extractor.finish(), expected, "chunk size {}", size);
        }
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut extractor = TableExtractor::new();
        extractor.push(b"<table><tr><td>a\xffb</td></tr></table>");
        let tables = extractor.finish();
        assert_eq!(tables[0].rows, vec![strings(&["a\u{fffd}b"])]);
    }

    #[tokio::test]
    async fn test_stream_with_tiny_chunks() {
        let chunks: Vec<Result<Vec<u8>, std::io::Error>> = SAMPLE_HOLDER_ROWS
            .as_bytes()
            .chunks(7)
            .map(|chunk| Ok(chunk.to_vec()))
            .collect();

        let tables = extract_tables_from_stream(futures::stream::iter(chunks))
            .await
            .unwrap();
        assert_eq!(tables, extract_tables(SAMPLE_HOLDER_ROWS));
    }

    #[tokio::test]
    async fn test_stream_error_is_returned() {
        let chunks: Vec<Result<&[u8], String>> = vec![
            Ok(&b"<table><tr><td>x</td></tr></table>"[..]),
            Err("connection reset".to_string()),
        ];

        let result = extract_tables_from_stream(futures::stream::iter(chunks)).await;
        assert_eq!(result, Err("connection reset".to_string()));
    }
}
