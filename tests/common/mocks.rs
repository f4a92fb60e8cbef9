//! Mock row sink.
use mockall::mock;

use rdr_wrtr::core::item::{ItemWriter, ItemWriterResult};

mock! {
    pub RowSink {}
    impl ItemWriter<[String]> for RowSink {
        fn write(&self, item: &[String]) -> ItemWriterResult;
        fn flush(&self) -> ItemWriterResult;
        fn open(&self) -> ItemWriterResult;
        fn close(&self) -> ItemWriterResult;
    }
}
