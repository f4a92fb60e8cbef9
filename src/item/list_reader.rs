use std::rc::Rc;

use log::trace;

use crate::{
    core::item::{ItemReader, ItemReaderResult},
    error::BatchError,
    item::line::Row,
};

/// Per-row transform. Returning `None` drops the row.
pub type RowHandler = Rc<dyn Fn(Row) -> Option<Row>>;

#[derive(Clone, Copy, Debug, PartialEq)]
enum TrimMode {
    Keep,
    Leading,
    Trailing,
    Both,
}

impl TrimMode {
    fn new(leading_ws: bool, trailing_ws: bool) -> Self {
        match (leading_ws, trailing_ws) {
            (true, true) => TrimMode::Keep,
            (false, true) => TrimMode::Leading,
            (true, false) => TrimMode::Trailing,
            (false, false) => TrimMode::Both,
        }
    }

    fn apply(self, field: &mut String) {
        let trimmed = match self {
            TrimMode::Keep => return,
            TrimMode::Leading => field.trim_start(),
            TrimMode::Trailing => field.trim_end(),
            TrimMode::Both => field.trim(),
        };
        if trimmed.len() != field.len() {
            *field = trimmed.to_string();
        }
    }
}

/// The cleaning stages shared by every reader, applied in a fixed order:
/// whitespace trim, blank skip, sentinel skip, handler.
#[derive(Clone)]
pub(crate) struct Normalizer {
    trim: TrimMode,
    ignore_blanks: bool,
    pub(crate) ignore: Option<Vec<String>>,
    handler: Option<RowHandler>,
}

impl Normalizer {
    pub(crate) fn new(
        leading_ws: bool,
        trailing_ws: bool,
        ignore_blanks: bool,
        ignore: Option<Vec<String>>,
        handler: Option<RowHandler>,
    ) -> Self {
        Self {
            trim: TrimMode::new(leading_ws, trailing_ws),
            ignore_blanks,
            ignore,
            handler,
        }
    }

    pub(crate) fn apply(&self, mut row: Row) -> Option<Row> {
        for field in row.iter_mut() {
            self.trim.apply(field);
        }

        if self.ignore_blanks && row.iter().all(String::is_empty) {
            trace!("Skipping blank row at line {}", row.line_num);
            return None;
        }

        if self.ignore.as_deref() == Some(row.as_slice()) {
            trace!("Skipping ignored row at line {}", row.line_num);
            return None;
        }

        match &self.handler {
            Some(handler) => {
                let line_num = row.line_num;
                let row = handler(row);
                if row.is_none() {
                    trace!("Handler rejected row at line {}", line_num);
                }
                row
            }
            None => Some(row),
        }
    }
}

/// Wraps a raw row source with the common cleaning stages.
///
/// The reader is lazy and single pass: each call to [`ItemReader::read`] pulls
/// from the source until a row survives every stage. Errors from the source
/// are returned unchanged.
///
/// ```
/// use rdr_wrtr::item::{iter::IterItemReader, list_reader::ListItemReaderBuilder};
///
/// let source = IterItemReader::rows(vec![vec![" a ", "b "], vec!["", " "], vec!["c", "d"]]);
/// let reader = ListItemReaderBuilder::new()
///     .trailing_ws(false)
///     .from_source(source);
///
/// let rows: Vec<_> = reader.map(Result::unwrap).collect();
/// assert_eq!(rows.len(), 2);
/// assert_eq!(*rows[0], vec![" a", "b"]);
/// assert_eq!(rows[1].line_num, 3);
/// ```
pub struct ListItemReader<S> {
    source: S,
    pub(crate) normalizer: Normalizer,
}

impl<S: ItemReader<Row>> ListItemReader<S> {
    pub(crate) fn new(source: S, normalizer: Normalizer) -> Self {
        Self { source, normalizer }
    }

    fn next_row(&self) -> ItemReaderResult<Row> {
        while let Some(row) = self.source.read()? {
            if let Some(row) = self.normalizer.apply(row) {
                return Ok(Some(row));
            }
        }
        Ok(None)
    }
}

impl<S: ItemReader<Row>> ItemReader<Row> for ListItemReader<S> {
    fn read(&self) -> ItemReaderResult<Row> {
        self.next_row()
    }
}

impl<S: ItemReader<Row>> Iterator for ListItemReader<S> {
    type Item = Result<Row, BatchError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row().transpose()
    }
}

/// A builder for [`ListItemReader`].
///
/// # Default Configuration
///
/// - Leading whitespace: kept
/// - Trailing whitespace: kept
/// - Blank rows: skipped
/// - Ignored row: none
/// - Handler: none
pub struct ListItemReaderBuilder {
    leading_ws: bool,
    trailing_ws: bool,
    ignore_blanks: bool,
    ignore: Option<Vec<String>>,
    handler: Option<RowHandler>,
}

impl Default for ListItemReaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ListItemReaderBuilder {
    pub fn new() -> Self {
        Self {
            leading_ws: true,
            trailing_ws: true,
            ignore_blanks: true,
            ignore: None,
            handler: None,
        }
    }

    /// Keep leading whitespace of every field (`false` strips it).
    pub fn leading_ws(mut self, keep: bool) -> Self {
        self.leading_ws = keep;
        self
    }

    /// Keep trailing whitespace of every field (`false` strips it).
    pub fn trailing_ws(mut self, keep: bool) -> Self {
        self.trailing_ws = keep;
        self
    }

    /// Skip rows that are empty or whose fields are all empty after trimming.
    pub fn ignore_blanks(mut self, yes: bool) -> Self {
        self.ignore_blanks = yes;
        self
    }

    /// Skip rows whose fields are exactly `row`.
    pub fn ignore<I, S>(mut self, row: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore = Some(row.into_iter().map(Into::into).collect());
        self
    }

    pub fn handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(Row) -> Option<Row> + 'static,
    {
        self.handler = Some(Rc::new(handler));
        self
    }

    pub fn from_source<S: ItemReader<Row>>(self, source: S) -> ListItemReader<S> {
        ListItemReader::new(
            source,
            Normalizer::new(
                self.leading_ws,
                self.trailing_ws,
                self.ignore_blanks,
                self.ignore,
                self.handler,
            ),
        )
    }
}

/// Shorthand for a [`ListItemReader`] with the default configuration.
pub fn list_reader<S: ItemReader<Row>>(source: S) -> ListItemReader<S> {
    ListItemReaderBuilder::new().from_source(source)
}
