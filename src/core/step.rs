use std::time::{Duration, Instant};

use log::{debug, error};

use crate::BatchError;

use super::item::{DefaultProcessor, ItemProcessor, ItemReader, ItemWriter};

#[derive(Debug, PartialEq)]
pub enum StepStatus {
    Error,
    Success,
}

#[derive(Debug)]
pub struct StepResult {
    pub start: Instant,
    pub end: Instant,
    pub duration: Duration,
    pub status: StepStatus,
    pub read_count: usize,
    pub filter_count: usize,
    pub write_count: usize,
    /// First error that stopped the step, if any.
    pub error: Option<BatchError>,
}

/// Drains a reader through a processor into a writer, one item at a time.
///
/// The writer is opened before the first read and closed once the reader is
/// exhausted or the first error occurs. There is no skip policy: any read,
/// process or write error ends the step with [`StepStatus::Error`].
pub struct Step<'a, R, W> {
    reader: &'a dyn ItemReader<R>,
    processor: &'a dyn ItemProcessor<R, W>,
    writer: &'a dyn ItemWriter<W>,
}

impl<R, W> Step<'_, R, W> {
    pub fn execute(&self) -> StepResult {
        let start = Instant::now();
        let mut counts = Counts::default();

        debug!("Start of step");

        let outcome = self
            .writer
            .open()
            .and_then(|()| self._run(&mut counts));
        let closed = self.writer.close();

        let error = match (outcome, closed) {
            (Err(err), _) | (Ok(()), Err(err)) => {
                error!("Step failed after {} items read: {}", counts.read, err);
                Some(err)
            }
            (Ok(()), Ok(())) => None,
        };

        debug!("End of step");

        StepResult {
            start,
            end: Instant::now(),
            duration: start.elapsed(),
            status: if error.is_some() {
                StepStatus::Error
            } else {
                StepStatus::Success
            },
            read_count: counts.read,
            filter_count: counts.filtered,
            write_count: counts.written,
            error,
        }
    }

    fn _run(&self, counts: &mut Counts) -> Result<(), BatchError> {
        while let Some(item) = self.reader.read()? {
            counts.read += 1;
            match self.processor.process(item)? {
                Some(processed) => {
                    self.writer.write(&processed)?;
                    counts.written += 1;
                }
                None => counts.filtered += 1,
            }
        }
        self.writer.flush()
    }
}

#[derive(Default)]
struct Counts {
    read: usize,
    filtered: usize,
    written: usize,
}

pub struct StepBuilder<'a, R, W> {
    reader: Option<&'a dyn ItemReader<R>>,
    processor: Option<&'a dyn ItemProcessor<R, W>>,
    writer: Option<&'a dyn ItemWriter<W>>,
}

impl<R, W> Default for StepBuilder<'_, R, W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, R, W> StepBuilder<'a, R, W> {
    pub fn new() -> StepBuilder<'a, R, W> {
        Self {
            reader: None,
            processor: None,
            writer: None,
        }
    }

    pub fn reader(mut self, reader: &'a impl ItemReader<R>) -> StepBuilder<'a, R, W> {
        self.reader = Some(reader);
        self
    }

    pub fn processor(mut self, processor: &'a impl ItemProcessor<R, W>) -> StepBuilder<'a, R, W> {
        self.processor = Some(processor);
        self
    }

    pub fn writer(mut self, writer: &'a impl ItemWriter<W>) -> StepBuilder<'a, R, W> {
        self.writer = Some(writer);
        self
    }

    /// Builds the step. Without a processor, items pass through unchanged.
    pub fn build(self) -> Result<Step<'a, R, W>, BatchError>
    where
        DefaultProcessor: ItemProcessor<R, W>,
    {
        static DEFAULT_PROCESSOR: DefaultProcessor = DefaultProcessor {};
        let reader = self
            .reader
            .ok_or_else(|| BatchError::Configuration("step requires a reader".to_string()))?;
        let writer = self
            .writer
            .ok_or_else(|| BatchError::Configuration("step requires a writer".to_string()))?;
        Ok(Step {
            reader,
            processor: self.processor.unwrap_or(&DEFAULT_PROCESSOR),
            writer,
        })
    }
}
