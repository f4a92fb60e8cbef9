#![cfg_attr(docsrs, feature(doc_cfg))]
//#![warn(missing_docs)]

/*!
 # rdr-wrtr

 Composable building blocks for delimited-text readers and writers.

 A row source (for example a CSV parser) yields raw rows of string fields. The readers in this
 crate clean those rows up and map them to dictionaries or objects keyed by field name. The
 writers go the other way: they flatten dictionaries or objects back into rows for a row sink,
 optionally narrowing the header to the fields that were actually used.

 ## Core Concepts

- **Row:** an ordered list of string fields tagged with the line it came from ([`item::line::Row`]).
- **ItemReader:** pulls one item at a time. Every reader in this crate is also an `Iterator`.
- **ItemWriter:** receives one item at a time, then is closed exactly once.
- **Normalizer:** trims whitespace, skips blank rows, skips the header row if it shows up again, then applies an optional handler ([`item::list_reader`]).
- **Field list:** unique, non-blank names, given explicitly or read from the header row ([`item::fields`]).
- **Flattener:** the strategy a writer uses to turn a record into a row ([`item::flatten`]).
- **Step:** drains a reader through a processor into a writer ([`core::step`]).

 ## Features

| **Feature**   | **Description**                                               |
|---------------|---------------------------------------------------------------|
| logger        | Enables a logger row sink, useful for debugging purposes      |
| full          | Enables all available features                                |

 ## Getting Started

```rust
# use indexmap::IndexMap;
# use rdr_wrtr::{
#     core::item::{ItemReader, ItemWriter},
#     error::BatchError,
#     item::{
#         csv::{csv_reader::CsvRowReaderBuilder, csv_writer::CsvRowWriterBuilder},
#         map_reader::MapReaderBuilder,
#         writer::RecordItemWriterBuilder,
#     },
# };
fn main() -> Result<(), BatchError> {
    let csv = "year,make,model
   1948,Porsche,356

   1995,Peugeot,205
   2021,Mazda,CX-30";

    let reader = MapReaderBuilder::new()
        .leading_ws(false)
        .handler(|row| (row[0] != "1948").then_some(row))
        .dict_from_source(CsvRowReaderBuilder::new().from_reader(csv.as_bytes()))?;

    let sink = CsvRowWriterBuilder::new().from_writer(vec![]);
    {
        let writer = RecordItemWriterBuilder::new()
            .fields(["make", "model", "year", "color"])
            .rest_val("")
            .minimize(true)
            .dict_from_writer(&sink)?;

        for car in reader {
            let car = car?;
            writer.write(&car)?;
        }
        ItemWriter::<IndexMap<String, String>>::close(&writer)?;
    }

    let output = String::from_utf8(sink.into_inner()?).unwrap_or_default();
    assert_eq!(
        output,
        "make,model,year\nPeugeot,205,1995\nMazda,CX-30,2021\n"
    );
    Ok(())
}
```

 ## License
 Licensed under either of

 -   Apache License, Version 2.0
     ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
 -   MIT license
     ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)

 at your option.

 ## Contribution
 Unless you explicitly state otherwise, any contribution intentionally submitted
 for inclusion in the work by you, as defined in the Apache-2.0 license, shall be
 dual licensed as above, without any additional terms or conditions

 */

/// Core traits and the step runner
pub mod core;

/// Error types for reading and writing
pub mod error;

#[doc(inline)]
pub use error::*;

/// Row readers, record readers and writers (for exemple: csv rows in, dictionaries out)
pub mod item;
