use std::{
    cell::{Cell, RefCell},
    fs::File,
    io::{Seek, SeekFrom},
};

use csv::{ReaderBuilder, Writer, WriterBuilder};
use log::{debug, error};

use crate::{
    core::item::{ItemWriter, ItemWriterResult},
    error::BatchError,
    item::{
        fields::{FieldName, field_names},
        flatten::{DictFlattener, ExtrasAction, Fields, Flattener, MapRecord, ObjFlattener},
        object::FieldGetters,
    },
};

/// Per-row transform applied before writing. Returning `None` suppresses the
/// row; the returned row must keep its length.
pub type WriteHandler = Box<dyn Fn(Vec<String>) -> Option<Vec<String>>>;

const BUFFER_DELIMITER: u8 = b'|';

#[derive(Clone, Copy, Debug, PartialEq)]
enum Mode {
    Headerless,
    Header,
    Minimized,
}

/// Rows held back until close, with the fields that received a non-blank value.
struct MinimizeBuffer {
    writer: Writer<File>,
    used: Vec<bool>,
}

impl MinimizeBuffer {
    fn new(fields: &[String]) -> Result<Self, BatchError> {
        let mut writer = WriterBuilder::new()
            .delimiter(BUFFER_DELIMITER)
            .flexible(true)
            .from_writer(tempfile::tempfile()?);
        writer.write_record(fields)?;
        Ok(Self {
            writer,
            used: vec![false; fields.len()],
        })
    }

    fn push(&mut self, row: &[String]) -> Result<(), BatchError> {
        for (used, value) in self.used.iter_mut().zip(row) {
            if !value.trim().is_empty() {
                *used = true;
            }
        }
        self.writer.write_record(row)?;
        Ok(())
    }

    /// Writes the narrowed header then every buffered row restricted to it.
    fn replay<W: ItemWriter<[String]>>(
        self,
        fields: &[String],
        sink: &W,
    ) -> Result<(), BatchError> {
        let mut keep: Vec<usize> = (0..fields.len()).filter(|idx| self.used[*idx]).collect();
        if keep.is_empty() {
            keep = (0..fields.len()).collect();
        }

        let mut file = self
            .writer
            .into_inner()
            .map_err(|error| BatchError::Io(error.into_error()))?;
        file.seek(SeekFrom::Start(0))?;

        let header: Vec<String> = keep.iter().map(|idx| fields[*idx].clone()).collect();
        debug!(
            "Writing minimized header {:?} ({} of {} fields)",
            header,
            header.len(),
            fields.len()
        );
        sink.write(&header)?;

        let mut reader = ReaderBuilder::new()
            .delimiter(BUFFER_DELIMITER)
            .has_headers(true)
            .flexible(true)
            .from_reader(file);
        for record in reader.records() {
            let record = record?;
            let row: Vec<String> = keep
                .iter()
                .map(|idx| record.get(*idx).unwrap_or_default().to_string())
                .collect();
            sink.write(&row)?;
        }
        Ok(())
    }
}

/// Flattens records into rows and writes them to a row sink.
///
/// The flattening strategy `F` is chosen at construction: a [`DictFlattener`]
/// for map-like records, an [`ObjFlattener`] for objects, or any custom
/// [`Flattener`]. The output mode is chosen by the builder:
///
/// - headerless: rows are written verbatim
/// - header: [`write_header`](Self::write_header) (or `open`) writes the
///   fields, then each row goes through the optional handler
/// - minimized: rows are buffered in a temporary file; on close, only the
///   fields that received a non-blank value are written as the header,
///   followed by the buffered rows restricted to those fields
///
/// Closing is idempotent and also happens on drop. The sink is closed exactly
/// once.
///
/// ```
/// use indexmap::IndexMap;
/// use rdr_wrtr::core::item::ItemWriter;
/// use rdr_wrtr::item::csv::csv_writer::CsvRowWriterBuilder;
/// use rdr_wrtr::item::writer::RecordItemWriterBuilder;
///
/// let sink = CsvRowWriterBuilder::new().from_writer(vec![]);
/// {
///     let writer = RecordItemWriterBuilder::new()
///         .fields(["city", "state", "pop"])
///         .rest_val("")
///         .minimize(true)
///         .dict_from_writer(&sink)
///         .unwrap();
///
///     let mut record = IndexMap::new();
///     record.insert("city".to_string(), "Boston".to_string());
///     record.insert("pop".to_string(), "4628910".to_string());
///     writer.write(&record).unwrap();
///     ItemWriter::<IndexMap<String, String>>::close(&writer).unwrap();
/// }
///
/// let data = String::from_utf8(sink.into_inner().unwrap()).unwrap();
/// assert_eq!(data, "city,pop\nBoston,4628910\n");
/// ```
pub struct RecordItemWriter<W: ItemWriter<[String]>, F> {
    sink: RefCell<Option<W>>,
    fields: Vec<String>,
    flattener: F,
    handler: Option<WriteHandler>,
    mode: Mode,
    buffer: RefCell<Option<MinimizeBuffer>>,
    closed: Cell<bool>,
}

impl<W: ItemWriter<[String]>, F> RecordItemWriter<W, F> {
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }

    /// Writes the field list. Not available when headerless or minimizing.
    pub fn write_header(&self) -> ItemWriterResult {
        match self.mode {
            Mode::Header => self.with_sink(|sink| sink.write(&self.fields)),
            Mode::Headerless => Err(BatchError::UnsupportedOperation(
                "write_header on a headerless writer",
            )),
            Mode::Minimized => Err(BatchError::UnsupportedOperation(
                "write_header on a minimizing writer",
            )),
        }
    }

    /// Writes an already flattened row.
    pub fn write_row(&self, row: Vec<String>) -> ItemWriterResult {
        if self.mode == Mode::Headerless {
            return self.with_sink(|sink| sink.write(&row));
        }

        let data = match &self.handler {
            Some(handler) => {
                let expected = row.len();
                let Some(data) = handler(row) else {
                    return Ok(());
                };
                if data.len() != expected {
                    return Err(BatchError::HandlerChangedLength {
                        expected,
                        found: data.len(),
                    });
                }
                data
            }
            None => row,
        };

        match self.buffer.borrow_mut().as_mut() {
            Some(buffer) => buffer.push(&data),
            None => self.with_sink(|sink| sink.write(&data)),
        }
    }

    /// Releases the sink, replaying buffered rows first when minimizing.
    ///
    /// Only the first call does anything. The sink is closed even if the
    /// replay fails; the replay error is returned in that case.
    pub fn finish(&self) -> ItemWriterResult {
        if self.closed.replace(true) {
            return Ok(());
        }
        let Some(sink) = self.sink.borrow_mut().take() else {
            return Ok(());
        };

        let replayed = match self.buffer.borrow_mut().take() {
            Some(buffer) => buffer.replay(&self.fields, &sink),
            None => Ok(()),
        };
        let closed = sink.close();
        replayed.and(closed)
    }

    fn with_sink(&self, f: impl FnOnce(&W) -> ItemWriterResult) -> ItemWriterResult {
        match self.sink.borrow().as_ref() {
            Some(sink) => f(sink),
            None => Err(BatchError::ItemWriter("writer is closed".to_string())),
        }
    }
}

impl<T, W, F> ItemWriter<T> for RecordItemWriter<W, F>
where
    T: ?Sized,
    W: ItemWriter<[String]>,
    F: Flattener<T>,
{
    fn write(&self, item: &T) -> ItemWriterResult {
        if self.closed.get() {
            return Err(BatchError::ItemWriter("writer is closed".to_string()));
        }
        let row = self.flattener.flatten(item)?;
        self.write_row(row)
    }

    fn flush(&self) -> ItemWriterResult {
        if let Some(buffer) = self.buffer.borrow_mut().as_mut() {
            buffer.writer.flush()?;
        }
        self.with_sink(|sink| sink.flush())
    }

    fn open(&self) -> ItemWriterResult {
        match self.mode {
            Mode::Header => self.write_header(),
            Mode::Headerless | Mode::Minimized => Ok(()),
        }
    }

    fn close(&self) -> ItemWriterResult {
        self.finish()
    }
}

impl<W: ItemWriter<[String]>, F> Drop for RecordItemWriter<W, F> {
    fn drop(&mut self) {
        if let Err(err) = self.finish() {
            error!("Failed to close record writer: {}", err);
        }
    }
}

/// A builder for [`RecordItemWriter`].
///
/// # Default Configuration
///
/// - Headers: enabled, not minimized
/// - Missing keys: fail
/// - Extra keys: fail
/// - Handler: none
pub struct RecordItemWriterBuilder {
    fields: Option<Vec<String>>,
    has_headers: bool,
    minimize: bool,
    rest_val: Option<String>,
    extras_action: ExtrasAction,
    handler: Option<WriteHandler>,
}

impl Default for RecordItemWriterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordItemWriterBuilder {
    pub fn new() -> Self {
        Self {
            fields: None,
            has_headers: true,
            minimize: false,
            rest_val: None,
            extras_action: ExtrasAction::Raise,
            handler: None,
        }
    }

    pub fn fields<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator,
        I::Item: FieldName,
    {
        self.fields = Some(field_names(fields));
        self
    }

    pub fn has_headers(mut self, yes: bool) -> Self {
        self.has_headers = yes;
        self
    }

    /// Narrow the header to the fields actually used. Requires headers.
    pub fn minimize(mut self, yes: bool) -> Self {
        self.minimize = yes;
        self
    }

    /// Value written for fields missing from a record.
    pub fn rest_val(mut self, rest_val: impl Into<String>) -> Self {
        self.rest_val = Some(rest_val.into());
        self
    }

    pub fn extras_action(mut self, action: ExtrasAction) -> Self {
        self.extras_action = action;
        self
    }

    /// Row handler, only available with headers.
    pub fn handler<H>(mut self, handler: H) -> Self
    where
        H: Fn(Vec<String>) -> Option<Vec<String>> + 'static,
    {
        self.handler = Some(Box::new(handler));
        self
    }

    fn take_fields(&mut self) -> Result<Vec<String>, BatchError> {
        self.fields.take().ok_or(BatchError::NoFields)
    }

    /// Writer for map-like records ([`MapRecord`]).
    pub fn dict_from_writer<W: ItemWriter<[String]>>(
        mut self,
        sink: W,
    ) -> Result<RecordItemWriter<W, DictFlattener>, BatchError> {
        let fields = self.take_fields()?;
        let flattener =
            DictFlattener::new(fields, self.rest_val.clone(), self.extras_action.clone())?;
        self.from_writer(sink, flattener)
    }

    /// Writer for objects read through a [`FieldGetters`] table.
    pub fn obj_from_writer<W: ItemWriter<[String]>, T>(
        mut self,
        sink: W,
        getters: FieldGetters<T>,
    ) -> Result<RecordItemWriter<W, ObjFlattener<T>>, BatchError> {
        let fields = self.take_fields()?;
        let flattener = ObjFlattener::new(fields, getters, self.rest_val.clone())?;
        self.from_writer(sink, flattener)
    }

    /// Writer with a custom flattening strategy; its fields are the writer's.
    pub fn from_writer<W, F>(
        self,
        sink: W,
        flattener: F,
    ) -> Result<RecordItemWriter<W, F>, BatchError>
    where
        W: ItemWriter<[String]>,
        F: Fields,
    {
        let mode = match (self.has_headers, self.minimize) {
            (true, false) => Mode::Header,
            (true, true) => Mode::Minimized,
            (false, true) => {
                return Err(BatchError::Configuration(
                    "minimize requires headers".to_string(),
                ));
            }
            (false, false) => Mode::Headerless,
        };
        if mode == Mode::Headerless && self.handler.is_some() {
            return Err(BatchError::Configuration(
                "handler requires headers".to_string(),
            ));
        }

        let fields = flattener.fields().to_vec();
        let buffer = match mode {
            Mode::Minimized => Some(MinimizeBuffer::new(&fields)?),
            Mode::Header | Mode::Headerless => None,
        };
        debug!("Record writer ({:?}) over fields {:?}", mode, fields);

        Ok(RecordItemWriter {
            sink: RefCell::new(Some(sink)),
            fields,
            flattener,
            handler: self.handler,
            mode,
            buffer: RefCell::new(buffer),
            closed: Cell::new(false),
        })
    }
}

/// Flattens records using the given fields only, for callers that want the
/// row without a writer.
pub fn flatten_dict<T: MapRecord + ?Sized>(
    item: &T,
    fields: &[String],
    rest_val: Option<&str>,
    extras_action: ExtrasAction,
) -> Result<Vec<String>, BatchError> {
    DictFlattener::new(fields.to_vec(), rest_val.map(str::to_string), extras_action)?.flatten(item)
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use indexmap::IndexMap;

    use super::{RecordItemWriterBuilder, flatten_dict};
    use crate::{
        BatchError,
        core::item::{ItemWriter, ItemWriterResult},
        item::flatten::ExtrasAction,
    };

    /// Sink recording every row and how many times it was closed.
    #[derive(Default, Clone)]
    struct RowLog {
        rows: Rc<RefCell<Vec<Vec<String>>>>,
        closes: Rc<RefCell<usize>>,
    }

    impl ItemWriter<[String]> for RowLog {
        fn write(&self, item: &[String]) -> ItemWriterResult {
            self.rows.borrow_mut().push(item.to_vec());
            Ok(())
        }

        fn flush(&self) -> ItemWriterResult {
            Ok(())
        }

        fn close(&self) -> ItemWriterResult {
            *self.closes.borrow_mut() += 1;
            Ok(())
        }
    }

    fn record(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn header_writer_should_write_header_then_rows() -> Result<(), BatchError> {
        let log = RowLog::default();
        let writer = RecordItemWriterBuilder::new()
            .fields(["a", "b"])
            .dict_from_writer(log.clone())?;

        writer.write_header()?;
        writer.write(&record(&[("b", "2"), ("a", "1")]))?;
        writer.finish()?;

        assert_eq!(*log.rows.borrow(), vec![vec!["a", "b"], vec!["1", "2"]]);
        Ok(())
    }

    #[test]
    fn open_should_write_header_only_in_header_mode() -> Result<(), BatchError> {
        let log = RowLog::default();
        let writer = RecordItemWriterBuilder::new()
            .fields(["a"])
            .has_headers(false)
            .dict_from_writer(log.clone())?;
        ItemWriter::<IndexMap<String, String>>::open(&writer)?;
        assert!(log.rows.borrow().is_empty());
        assert!(matches!(
            writer.write_header(),
            Err(BatchError::UnsupportedOperation(_))
        ));
        Ok(())
    }

    #[test]
    fn handler_may_suppress_rows_but_not_change_length() -> Result<(), BatchError> {
        let log = RowLog::default();
        let writer = RecordItemWriterBuilder::new()
            .fields(["a", "b"])
            .handler(|row| match row[0].as_str() {
                "skip" => None,
                "grow" => Some(vec![row[0].clone(); 3]),
                _ => Some(row.into_iter().map(|v| v.to_uppercase()).collect()),
            })
            .dict_from_writer(log.clone())?;

        writer.write(&record(&[("a", "x"), ("b", "y")]))?;
        writer.write(&record(&[("a", "skip"), ("b", "y")]))?;
        assert!(matches!(
            writer.write(&record(&[("a", "grow"), ("b", "y")])),
            Err(BatchError::HandlerChangedLength {
                expected: 2,
                found: 3
            })
        ));
        assert_eq!(*log.rows.borrow(), vec![vec!["X", "Y"]]);
        Ok(())
    }

    #[test]
    fn minimized_writer_should_drop_always_blank_fields() -> Result<(), BatchError> {
        let log = RowLog::default();
        let writer = RecordItemWriterBuilder::new()
            .fields(["a", "b", "c"])
            .rest_val("")
            .minimize(true)
            .dict_from_writer(log.clone())?;

        writer.write(&record(&[("a", "1"), ("c", " ")]))?;
        writer.write(&record(&[("b", "2"), ("c", "")]))?;
        writer.write(&record(&[("a", "a|b"), ("b", "\"q\"")]))?;
        assert!(log.rows.borrow().is_empty());
        writer.finish()?;

        assert_eq!(
            *log.rows.borrow(),
            vec![
                vec!["a", "b"],
                vec!["1", ""],
                vec!["", "2"],
                vec!["a|b", "\"q\""],
            ]
        );
        Ok(())
    }

    #[test]
    fn minimized_writer_without_values_should_keep_all_fields() -> Result<(), BatchError> {
        let log = RowLog::default();
        let writer = RecordItemWriterBuilder::new()
            .fields(["a", "b"])
            .rest_val("")
            .minimize(true)
            .dict_from_writer(log.clone())?;
        writer.write(&record(&[]))?;
        drop(writer);

        assert_eq!(*log.rows.borrow(), vec![vec!["a", "b"], vec!["", ""]]);
        assert_eq!(*log.closes.borrow(), 1);
        Ok(())
    }

    #[test]
    fn minimized_writer_should_refuse_explicit_header() -> Result<(), BatchError> {
        let writer = RecordItemWriterBuilder::new()
            .fields(["a"])
            .minimize(true)
            .dict_from_writer(RowLog::default())?;
        assert!(matches!(
            writer.write_header(),
            Err(BatchError::UnsupportedOperation(_))
        ));
        Ok(())
    }

    #[test]
    fn close_should_be_idempotent_and_writes_after_close_should_fail() -> Result<(), BatchError> {
        let log = RowLog::default();
        let writer = RecordItemWriterBuilder::new()
            .fields(["a"])
            .has_headers(false)
            .dict_from_writer(log.clone())?;
        writer.write(&record(&[("a", "1")]))?;
        writer.finish()?;
        writer.finish()?;
        assert!(writer.is_closed());
        assert!(matches!(
            writer.write(&record(&[("a", "2")])),
            Err(BatchError::ItemWriter(_))
        ));
        drop(writer);
        assert_eq!(*log.closes.borrow(), 1);
        Ok(())
    }

    #[test]
    fn invalid_mode_combinations_should_not_build() {
        let result = RecordItemWriterBuilder::new()
            .fields(["a"])
            .has_headers(false)
            .minimize(true)
            .dict_from_writer(RowLog::default());
        assert!(matches!(result, Err(BatchError::Configuration(_))));

        let result = RecordItemWriterBuilder::new()
            .fields(["a"])
            .has_headers(false)
            .handler(Some)
            .dict_from_writer(RowLog::default());
        assert!(matches!(result, Err(BatchError::Configuration(_))));

        let result = RecordItemWriterBuilder::new().dict_from_writer(RowLog::default());
        assert!(matches!(result, Err(BatchError::NoFields)));
    }

    #[test]
    fn flatten_dict_should_ignore_extras_when_asked() -> Result<(), BatchError> {
        let fields = vec!["a".to_string()];
        let row = flatten_dict(
            &record(&[("a", "1"), ("b", "2")]),
            &fields,
            None,
            ExtrasAction::Ignore,
        )?;
        assert_eq!(row, vec!["1"]);
        Ok(())
    }
}
