use std::{
    cell::RefCell,
    fs::File,
    io::{self, Write},
    path::Path,
    result,
};

use csv::{Terminator, Writer, WriterBuilder};

use crate::{BatchError, core::item::ItemWriter};

/// A raw row sink writing CSV data.
///
/// Quoting is handled by the `csv` crate. Rows may have any number of fields,
/// so headers and records of different widths can share one output.
pub struct CsvRowWriter<T: Write> {
    wrapper: RefCell<Writer<T>>,
}

impl<T: Write> ItemWriter<[String]> for CsvRowWriter<T> {
    fn write(&self, item: &[String]) -> Result<(), BatchError> {
        let result = self.wrapper.borrow_mut().write_record(item);
        match result {
            Ok(()) => Ok(()),
            Err(error) => Err(BatchError::ItemWriter(error.to_string())),
        }
    }

    /// Flush the contents of the internal buffer to the underlying writer.
    ///
    /// Note that this also flushes the underlying writer.
    fn flush(&self) -> Result<(), BatchError> {
        let result = self.wrapper.borrow_mut().flush();
        match result {
            Ok(()) => Ok(()),
            Err(error) => Err(BatchError::ItemWriter(error.to_string())),
        }
    }

    fn close(&self) -> Result<(), BatchError> {
        self.flush()
    }
}

impl<T: Write> CsvRowWriter<T> {
    /// Flushes and returns the underlying writer.
    pub fn into_inner(self) -> result::Result<T, BatchError> {
        let result = self.wrapper.into_inner().into_inner();
        match result {
            Ok(inner) => Ok(inner),
            Err(error) => Err(BatchError::ItemWriter(error.to_string())),
        }
    }
}

/// A builder for [`CsvRowWriter`].
///
/// # Default Configuration
///
/// - Delimiter: comma (,)
/// - Terminator: `\n`
pub struct CsvRowWriterBuilder {
    delimiter: u8,
    terminator: Terminator,
}

impl Default for CsvRowWriterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvRowWriterBuilder {
    pub fn new() -> CsvRowWriterBuilder {
        CsvRowWriterBuilder {
            delimiter: b',',
            terminator: Terminator::Any(b'\n'),
        }
    }

    pub fn delimiter(mut self, delimiter: u8) -> CsvRowWriterBuilder {
        self.delimiter = delimiter;
        self
    }

    /// `Terminator::CRLF` writes `\r\n`.
    pub fn terminator(mut self, terminator: Terminator) -> CsvRowWriterBuilder {
        self.terminator = terminator;
        self
    }

    fn csv_builder(&self) -> WriterBuilder {
        let mut builder = WriterBuilder::new();
        builder
            .delimiter(self.delimiter)
            .terminator(self.terminator)
            .has_headers(false)
            .flexible(true);
        builder
    }

    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn from_path<R: AsRef<Path>>(self, path: R) -> Result<CsvRowWriter<File>, BatchError> {
        let wtr = self.csv_builder().from_path(path)?;

        Ok(CsvRowWriter {
            wrapper: RefCell::new(wtr),
        })
    }

    /// Writes rows to any `io::Write` destination.
    ///
    /// ```
    /// # use std::error::Error;
    /// # use rdr_wrtr::{item::csv::csv_writer::CsvRowWriterBuilder, core::item::ItemWriter};
    /// # fn main() { example().unwrap(); }
    /// fn example() -> Result<(), Box<dyn Error>> {
    ///     let wtr = CsvRowWriterBuilder::new().from_writer(vec![]);
    ///
    ///     let header = vec!["city".to_string(), "country".to_string()];
    ///     let row = vec!["Concord".to_string(), "United States, NH".to_string()];
    ///     wtr.write(header.as_slice())?;
    ///     wtr.write(row.as_slice())?;
    ///
    ///     let data = String::from_utf8(wtr.into_inner()?)?;
    ///     assert_eq!(data, "\
    /// city,country
    /// Concord,\"United States, NH\"
    /// ");
    ///     Ok(())
    /// }
    /// ```
    pub fn from_writer<W: io::Write>(self, wtr: W) -> CsvRowWriter<W> {
        let wtr = self.csv_builder().from_writer(wtr);

        CsvRowWriter {
            wrapper: RefCell::new(wtr),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{error::Error, fs};

    use csv::Terminator;

    use crate::{core::item::ItemWriter, item::csv::csv_writer::CsvRowWriterBuilder};

    fn row(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn rows_of_any_width_should_be_written() -> Result<(), Box<dyn Error>> {
        let wtr = CsvRowWriterBuilder::new()
            .delimiter(b';')
            .terminator(Terminator::CRLF)
            .from_writer(vec![]);

        wtr.write(row(&["a", "b"]).as_slice())?;
        wtr.write(row(&["1", "2", "x;y"]).as_slice())?;

        let data = String::from_utf8(wtr.into_inner()?)?;
        assert_eq!(data, "a;b\r\n1;2;\"x;y\"\r\n");
        Ok(())
    }

    #[test]
    fn close_should_flush_to_file() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("out.csv");

        let wtr = CsvRowWriterBuilder::new().from_path(&path)?;
        wtr.write(row(&["Boston", "United States"]).as_slice())?;
        ItemWriter::<[String]>::close(&wtr)?;

        assert_eq!(fs::read_to_string(&path)?, "Boston,United States\n");
        Ok(())
    }

    #[test]
    fn unwritable_path_should_fail() {
        let result = CsvRowWriterBuilder::new().from_path("/definitely/not/here/out.csv");
        assert!(result.is_err());
    }
}
