use csv::{ReaderBuilder, StringRecordsIntoIter, Terminator, Trim};
use std::{
    cell::RefCell,
    collections::VecDeque,
    fs::File,
    io::{self, Read},
    path::Path,
};

use crate::{
    core::item::{ItemReader, ItemReaderResult},
    error::BatchError,
    item::line::Row,
};

/// Records the byte offset of every `\n` passing through, so a byte offset
/// can be turned back into a physical line number.
///
/// The `csv` parser skips empty lines without counting them in its own
/// positions, so line numbers are taken from here instead.
struct LineCounter<R> {
    inner: R,
    consumed: u64,
    newlines: VecDeque<u64>,
    lines_before: u64,
}

impl<R> LineCounter<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            consumed: 0,
            newlines: VecDeque::new(),
            lines_before: 0,
        }
    }

    /// Line (counted from 1) holding `byte`. Offsets must be asked for in
    /// increasing order; newlines already passed are dropped.
    fn line_at(&mut self, byte: u64) -> u64 {
        while self.newlines.front().is_some_and(|&offset| offset < byte) {
            self.newlines.pop_front();
            self.lines_before += 1;
        }
        self.lines_before + 1
    }
}

impl<R: Read> Read for LineCounter<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.inner.read(buf)?;
        let start = self.consumed;
        self.newlines.extend(
            buf[..read]
                .iter()
                .enumerate()
                .filter(|(_, byte)| **byte == b'\n')
                .map(|(idx, _)| start + idx as u64),
        );
        self.consumed += read as u64;
        Ok(read)
    }
}

/// A raw row source over CSV data.
///
/// This reader only splits the input into fields: quoting and escaping are
/// handled by the `csv` crate, while trimming, blank skipping and header
/// handling are left to the readers in [`crate::item`]. Records may have any
/// number of fields. Each row carries the physical line on which its record
/// starts, counting `\n`-terminated lines and including skipped empty ones.
///
/// # Examples
///
/// ```
/// use rdr_wrtr::item::csv::csv_reader::CsvRowReaderBuilder;
/// use rdr_wrtr::item::map_reader::MapReaderBuilder;
/// use rdr_wrtr::core::item::ItemReader;
///
/// let data = "\
/// city,country
/// Boston, United States
///
/// Concord,\"United States\"
/// ";
///
/// let source = CsvRowReaderBuilder::new().from_reader(data.as_bytes());
/// let reader = MapReaderBuilder::new()
///     .leading_ws(false)
///     .dict_from_source(source)
///     .unwrap();
///
/// let boston = reader.read().unwrap().unwrap();
/// assert_eq!(boston["country"], "United States");
/// assert_eq!(boston.line_num, 2);
///
/// let concord = reader.read().unwrap().unwrap();
/// assert_eq!(concord.line_num, 4);
/// ```
pub struct CsvRowReader<R> {
    /// Iterator over the CSV records
    ///
    /// Uses `RefCell` to provide interior mutability so we can iterate
    /// through records while keeping the `read` method signature compatible
    /// with the `ItemReader` trait.
    records: RefCell<StringRecordsIntoIter<LineCounter<R>>>,
}

impl<R: Read> CsvRowReader<R> {
    fn next_row(&self) -> ItemReaderResult<Row> {
        let mut records = self.records.borrow_mut();
        match records.next() {
            Some(Ok(record)) => {
                // The parser's position sits after the record, so count back
                // over newlines kept inside quoted fields.
                let embedded: u64 = record
                    .iter()
                    .map(|field| field.matches('\n').count() as u64)
                    .sum();
                let reader = records.reader_mut();
                let end = reader.position().byte();
                let last_line = reader.get_mut().line_at(end.saturating_sub(1));
                let line_num = last_line.saturating_sub(embedded).max(1);
                let fields = record.iter().map(str::to_string).collect();
                Ok(Some(Row::new(fields, line_num)))
            }
            Some(Err(error)) => Err(BatchError::ItemReader(error.to_string())),
            None => Ok(None),
        }
    }
}

impl<R: Read> ItemReader<Row> for CsvRowReader<R> {
    fn read(&self) -> ItemReaderResult<Row> {
        self.next_row()
    }
}

impl<R: Read> Iterator for CsvRowReader<R> {
    type Item = Result<Row, BatchError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row().transpose()
    }
}

/// A builder for configuring CSV row reading.
///
/// # Default Configuration
///
/// - Delimiter: comma (,)
/// - Terminator: CRLF (either `\r`, `\n` or `\r\n`)
/// - Quote: double quote (")
pub struct CsvRowReaderBuilder {
    /// The delimiter character (default: comma ',')
    delimiter: u8,
    /// The line terminator (default: CRLF)
    terminator: Terminator,
    quote: u8,
}

impl Default for CsvRowReaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvRowReaderBuilder {
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            terminator: Terminator::CRLF,
            quote: b'"',
        }
    }

    /// Sets the delimiter character for the CSV parsing.
    ///
    /// ```
    /// use rdr_wrtr::item::csv::csv_reader::CsvRowReaderBuilder;
    ///
    /// // Use tab as delimiter
    /// let builder = CsvRowReaderBuilder::new().delimiter(b'\t');
    /// ```
    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Sets the line terminator for the CSV parsing.
    ///
    /// - `Terminator::CRLF`: any of `\r`, `\n`, `\r\n` (default)
    /// - `Terminator::Any(byte)`: a single custom terminator
    pub fn terminator(mut self, terminator: Terminator) -> Self {
        self.terminator = terminator;
        self
    }

    pub fn quote(mut self, quote: u8) -> Self {
        self.quote = quote;
        self
    }

    fn csv_builder(&self) -> ReaderBuilder {
        let mut builder = ReaderBuilder::new();
        builder
            .trim(Trim::None)
            .delimiter(self.delimiter)
            .terminator(self.terminator)
            .quote(self.quote)
            .has_headers(false)
            .flexible(true);
        builder
    }

    /// Creates a `CsvRowReader` from any source implementing `Read`.
    pub fn from_reader<R: Read>(self, rdr: R) -> CsvRowReader<R> {
        let records = self
            .csv_builder()
            .from_reader(LineCounter::new(rdr))
            .into_records();

        CsvRowReader {
            records: RefCell::new(records),
        }
    }

    /// Creates a `CsvRowReader` from a file path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened.
    pub fn from_path<P: AsRef<Path>>(self, path: P) -> Result<CsvRowReader<File>, BatchError> {
        Ok(self.from_reader(File::open(path)?))
    }
}

#[cfg(test)]
mod tests {
    use std::{error::Error, io::Write};

    use csv::Terminator;

    use crate::{BatchError, core::item::ItemReader, item::csv::csv_reader::CsvRowReaderBuilder};

    #[test]
    fn rows_should_keep_raw_fields_and_line_numbers() -> Result<(), Box<dyn Error>> {
        let data = "city, country\n\"Boston\",\" United States\"\n\n  Concord ,United States,NH\n";

        let reader = CsvRowReaderBuilder::new().from_reader(data.as_bytes());
        let rows: Vec<(u64, Vec<String>)> = reader
            .map(|row| row.map(|row| (row.line_num, row.into_inner())))
            .collect::<Result<_, BatchError>>()?;

        assert_eq!(
            rows,
            vec![
                (1, vec!["city".to_string(), " country".to_string()]),
                (2, vec!["Boston".to_string(), " United States".to_string()]),
                (
                    4,
                    vec![
                        "  Concord ".to_string(),
                        "United States".to_string(),
                        "NH".to_string()
                    ]
                ),
            ]
        );
        Ok(())
    }

    #[test]
    fn line_numbers_should_count_every_skipped_line() -> Result<(), BatchError> {
        let data = "a,b\r\n\r\n\r\n1,\"two\nlines\"\n\n\n3,4\n5,6";

        let reader = CsvRowReaderBuilder::new().from_reader(data.as_bytes());
        let lines: Vec<u64> = reader
            .map(|row| row.map(|row| row.line_num))
            .collect::<Result<_, BatchError>>()?;

        assert_eq!(lines, vec![1, 4, 8, 9]);
        Ok(())
    }

    #[test]
    fn custom_delimiter_and_terminator_should_apply() -> Result<(), BatchError> {
        let reader = CsvRowReaderBuilder::new()
            .delimiter(b';')
            .terminator(Terminator::Any(b'|'))
            .from_reader("a;b|c;d".as_bytes());

        assert_eq!(reader.read()?.unwrap().into_inner(), vec!["a", "b"]);
        assert_eq!(reader.read()?.unwrap().into_inner(), vec!["c", "d"]);
        assert!(reader.read()?.is_none());
        Ok(())
    }

    #[test]
    fn rows_should_be_read_from_path() -> Result<(), Box<dyn Error>> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(b"a,b\n1,2\n")?;

        let reader = CsvRowReaderBuilder::new().from_path(file.path())?;
        assert_eq!(reader.count(), 2);
        Ok(())
    }

    #[test]
    fn missing_file_should_fail() {
        let result = CsvRowReaderBuilder::new().from_path("/definitely/not/here.csv");
        assert!(result.is_err());
    }
}
