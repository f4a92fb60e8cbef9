use std::cell::Cell;

use log::info;

use crate::{BatchError, core::item::ItemWriter};

/// A sink that logs every row it receives at `info` level.
#[derive(Default)]
pub struct LoggerWriter {
    count: Cell<usize>,
}

impl LoggerWriter {
    /// Rows logged so far.
    pub fn count(&self) -> usize {
        self.count.get()
    }
}

impl ItemWriter<[String]> for LoggerWriter {
    fn write(&self, item: &[String]) -> Result<(), BatchError> {
        let count = self.count.get() + 1;
        self.count.set(count);
        info!("Row {}: {:?}", count, item);
        Ok(())
    }

    fn flush(&self) -> Result<(), BatchError> {
        Ok(())
    }

    fn close(&self) -> Result<(), BatchError> {
        info!("Logged {} rows", self.count.get());
        Ok(())
    }
}
