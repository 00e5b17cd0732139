use std::cell::RefCell;
use std::rc::Rc;

use html5ever::tendril::StrTendril;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use log::debug;

use super::{Row, Table};

/// Position of the extractor in the table grammar.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ExtractorState {
    /// Outside any table.
    #[default]
    Idle,
    /// Inside `<table>`, outside any row.
    InTable,
    /// Inside `<tr>`, outside any cell.
    InRow,
    /// Inside `<td>` or `<th>`.
    InCell,
}

/// The partially built table, row and cell.
#[derive(Debug, Default)]
struct ParserContext {
    table: Table,
    row: Row,
    cell: String,
}

impl ParserContext {
    fn finish_cell(&mut self) {
        let text = std::mem::take(&mut self.cell);
        self.row.push(text.trim().to_string());
    }

    fn finish_row(&mut self) {
        let row = std::mem::take(&mut self.row);
        self.table.rows.push(row);
    }

    fn take_table(&mut self) -> Table {
        std::mem::take(self).table
    }
}

/// The table grammar driven by tag and text tokens.
#[derive(Debug, Default)]
struct TableGrammar {
    state: ExtractorState,
    context: ParserContext,
    tables: Vec<Table>,
    discarded: usize,
}

impl TableGrammar {
    fn start_tag(&mut self, name: &str) {
        use ExtractorState::*;

        match name {
            "table" => {
                if self.state != Idle {
                    self.discarded += 1;
                    debug!(
                        "Nested table opened; discarding enclosing table with {} rows",
                        self.context.table.rows.len()
                    );
                }
                self.context = ParserContext::default();
                self.state = InTable;
            }
            "tr" => match self.state {
                Idle => {}
                InTable => self.state = InRow,
                InRow => self.context.finish_row(),
                InCell => {
                    self.context.finish_cell();
                    self.context.finish_row();
                    self.state = InRow;
                }
            },
            "td" | "th" => match self.state {
                Idle | InTable => {}
                InRow => self.state = InCell,
                InCell => self.context.finish_cell(),
            },
            _ => {}
        }
    }

    fn end_tag(&mut self, name: &str) {
        use ExtractorState::*;

        match name {
            "table" => match self.state {
                Idle => {}
                state => {
                    if state == InCell {
                        self.context.finish_cell();
                    }
                    if state != InTable {
                        self.context.finish_row();
                    }
                    self.tables.push(self.context.take_table());
                    self.state = Idle;
                }
            },
            "tr" => match self.state {
                Idle | InTable => {}
                state => {
                    if state == InCell {
                        self.context.finish_cell();
                    }
                    self.context.finish_row();
                    self.state = InTable;
                }
            },
            "td" | "th" => {
                if self.state == InCell {
                    self.context.finish_cell();
                    self.state = InRow;
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if self.state == ExtractorState::InCell {
            self.context.cell.push_str(text);
        }
    }
}

/// Forwards html5ever tokens into the shared grammar.
struct TableSink {
    grammar: Rc<RefCell<TableGrammar>>,
}

impl TokenSink for TableSink {
    type Handle = ();

    fn process_token(&self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        let mut grammar = self.grammar.borrow_mut();
        match token {
            Token::TagToken(tag) => match tag.kind {
                TagKind::StartTag => {
                    grammar.start_tag(&tag.name);
                    // Without a tree builder the tokenizer relies on the sink
                    // to switch it into raw text for these elements.
                    match &*tag.name {
                        "script" => return TokenSinkResult::RawData(RawKind::ScriptData),
                        "style" | "xmp" | "iframe" | "noembed" | "noframes" => {
                            return TokenSinkResult::RawData(RawKind::Rawtext)
                        }
                        "title" | "textarea" => return TokenSinkResult::RawData(RawKind::Rcdata),
                        _ => {}
                    }
                }
                TagKind::EndTag => grammar.end_tag(&tag.name),
            },
            Token::CharacterTokens(text) => grammar.text(&text),
            _ => {}
        }
        TokenSinkResult::Continue
    }
}

/// Length of the prefix of `bytes` that holds no truncated UTF-8 sequence.
fn complete_utf8_len(bytes: &[u8]) -> usize {
    let len = bytes.len();
    for back in 1..=len.min(4) {
        let byte = bytes[len - back];
        if byte & 0xC0 == 0x80 {
            continue;
        }
        let width = match byte {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => 1,
        };
        return if width > back { len - back } else { len };
    }
    len
}

/// Streaming extractor for `<table>` contents.
///
/// Feed markup with [`push`](Self::push) in chunks of any size, then call
/// [`finish`](Self::finish) to obtain every completed table in document
/// order. Tokenizing, including character references and comments, is done
/// by html5ever; no document tree is built.
///
/// Omitted `</td>`, `</th>` and `</tr>` tags are closed implicitly by the
/// next cell, row or table end. A `<table>` opened while another is in
/// progress discards the outer one and starts over; the inner table is kept
/// and the outer `</table>` then has nothing to close. A table that is still
/// open at end of input is dropped.
pub struct TableExtractor {
    tokenizer: Tokenizer<TableSink>,
    input: BufferQueue,
    /// Trailing bytes of a UTF-8 sequence split across chunks.
    pending: Vec<u8>,
    grammar: Rc<RefCell<TableGrammar>>,
}

impl Default for TableExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TableExtractor {
    pub fn new() -> Self {
        let grammar = Rc::new(RefCell::new(TableGrammar::default()));
        let sink = TableSink {
            grammar: Rc::clone(&grammar),
        };
        Self {
            tokenizer: Tokenizer::new(sink, TokenizerOpts::default()),
            input: BufferQueue::default(),
            pending: Vec::new(),
            grammar,
        }
    }

    /// Consume the next chunk of markup.
    ///
    /// Invalid UTF-8 is replaced with U+FFFD.
    pub fn push(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
        let complete = complete_utf8_len(&self.pending);
        if complete == 0 {
            return;
        }

        let text = String::from_utf8_lossy(&self.pending[..complete]).into_owned();
        self.pending.drain(..complete);
        self.feed(text);
    }

    fn feed(&mut self, text: String) {
        self.input.push_back(StrTendril::from(text));
        let _ = self.tokenizer.feed(&self.input);
    }

    /// Signal end of input and return the completed tables.
    pub fn finish(mut self) -> Vec<Table> {
        if !self.pending.is_empty() {
            let rest = String::from_utf8_lossy(&self.pending).into_owned();
            self.pending.clear();
            self.feed(rest);
        }
        self.tokenizer.end();

        let grammar = std::mem::take(&mut *self.grammar.borrow_mut());
        if grammar.state != ExtractorState::Idle {
            debug!(
                "Dropping unterminated table with {} rows at end of input",
                grammar.context.table.rows.len()
            );
        }
        if grammar.discarded > 0 {
            debug!("Discarded {} tables interrupted by a nested table", grammar.discarded);
        }
        grammar.tables
    }

    /// Current grammar position.
    pub fn state(&self) -> ExtractorState {
        self.grammar.borrow().state
    }

    /// Number of tables completed so far.
    pub fn completed_tables(&self) -> usize {
        self.grammar.borrow().tables.len()
    }

    /// Number of in-progress tables replaced by a nested `<table>`.
    pub fn discarded_tables(&self) -> usize {
        self.grammar.borrow().discarded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(input: &str) -> TableExtractor {
        let mut extractor = TableExtractor::new();
        extractor.push(input.as_bytes());
        extractor
    }

    #[test]
    fn test_state_follows_tags() {
        let mut extractor = TableExtractor::new();
        assert_eq!(extractor.state(), ExtractorState::Idle);

        extractor.push(b"<table>");
        assert_eq!(extractor.state(), ExtractorState::InTable);

        extractor.push(b"<tr>");
        assert_eq!(extractor.state(), ExtractorState::InRow);

        extractor.push(b"<td>x");
        assert_eq!(extractor.state(), ExtractorState::InCell);

        extractor.push(b"</td></tr>");
        assert_eq!(extractor.state(), ExtractorState::InTable);

        extractor.push(b"</table>");
        assert_eq!(extractor.state(), ExtractorState::Idle);
        assert_eq!(extractor.completed_tables(), 1);
    }

    #[test]
    fn test_text_outside_cells_is_ignored() {
        let tables = run("<table>caption<tr>gap<td>v</td>tail</tr></table>").finish();
        assert_eq!(tables[0].rows, vec![vec!["v".to_string()]]);
    }

    #[test]
    fn test_implicitly_closed_cells_and_rows() {
        let tables = run("<table><tr><td>a<td>b<tr><th>c</table>").finish();
        assert_eq!(
            tables[0].rows,
            vec![
                vec!["a".to_string(), "b".to_string()],
                vec!["c".to_string()],
            ]
        );
    }

    #[test]
    fn test_nested_table_replaces_enclosing_one() {
        let extractor = run(
            "<table><tr><td>outer<table><tr><td>inner</td></tr></table></td></tr></table>",
        );
        assert_eq!(extractor.discarded_tables(), 1);

        let tables = extractor.finish();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows, vec![vec!["inner".to_string()]]);
    }

    #[test]
    fn test_cell_outside_row_is_ignored() {
        let tables = run("<table><td>stray</td><tr><td>ok</td></tr></table>").finish();
        assert_eq!(tables[0].rows, vec![vec!["ok".to_string()]]);
    }
}
