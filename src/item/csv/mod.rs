//! CSV row sources and sinks.
//!
//! These adapters sit at both ends of the record readers and writers: a
//! [`CsvRowReader`](csv_reader::CsvRowReader) splits CSV input into raw rows
//! numbered by line, and a [`CsvRowWriter`](csv_writer::CsvRowWriter) writes
//! rows back out. Neither trims, skips nor interprets headers; that is left to
//! [`list_reader`](crate::item::list_reader),
//! [`map_reader`](crate::item::map_reader) and
//! [`writer`](crate::item::writer).
//!
//! # Examples
//!
//! ## Reading and writing records
//!
//! ```
//! use indexmap::IndexMap;
//! use rdr_wrtr::core::item::{ItemReader, ItemWriter};
//! use rdr_wrtr::item::csv::csv_reader::CsvRowReaderBuilder;
//! use rdr_wrtr::item::csv::csv_writer::CsvRowWriterBuilder;
//! use rdr_wrtr::item::map_reader::MapReaderBuilder;
//! use rdr_wrtr::item::writer::RecordItemWriterBuilder;
//!
//! let csv_data = "\
//! city,country,pop
//! Boston,United States,4628910
//! Concord,United States,42695
//! ";
//!
//! let reader = MapReaderBuilder::new()
//!     .dict_from_source(CsvRowReaderBuilder::new().from_reader(csv_data.as_bytes()))
//!     .unwrap();
//!
//! let sink = CsvRowWriterBuilder::new().delimiter(b';').from_writer(vec![]);
//! {
//!     let writer = RecordItemWriterBuilder::new()
//!         .fields(["city", "pop"])
//!         .extras_action(rdr_wrtr::item::flatten::ExtrasAction::Ignore)
//!         .dict_from_writer(&sink)
//!         .unwrap();
//!     ItemWriter::<IndexMap<String, String>>::open(&writer).unwrap();
//!
//!     while let Some(city) = reader.read().unwrap() {
//!         writer.write(&city).unwrap();
//!     }
//! }
//!
//! let data = String::from_utf8(sink.into_inner().unwrap()).unwrap();
//! assert_eq!(data, "city;pop\nBoston;4628910\nConcord;42695\n");
//! ```

/// A module providing facilities for reading CSV rows.
pub mod csv_reader;

/// A module providing facilities for writing CSV rows.
pub mod csv_writer;
