use crate::error::BatchError;

/// Result of a single read: `Ok(None)` once the source is exhausted.
pub type ItemReaderResult<R> = Result<Option<R>, BatchError>;

pub type ItemWriterResult = Result<(), BatchError>;

/// Pulls items one at a time.
///
/// Readers take `&self` and keep their cursor behind interior mutability, so a
/// reader can be shared by reference with a [`Step`](crate::core::step::Step).
pub trait ItemReader<R> {
    fn read(&self) -> ItemReaderResult<R>;
}

/// Transforms an item read into an item to write. `None` filters it out.
pub trait ItemProcessor<R, W> {
    fn process(&self, item: R) -> Result<Option<W>, BatchError>;
}

pub trait ItemWriter<W: ?Sized> {
    fn write(&self, item: &W) -> ItemWriterResult;
    fn flush(&self) -> ItemWriterResult;
    fn open(&self) -> ItemWriterResult {
        Ok(())
    }
    fn close(&self) -> ItemWriterResult {
        Ok(())
    }
}

impl<R, T: ItemReader<R> + ?Sized> ItemReader<R> for &T {
    fn read(&self) -> ItemReaderResult<R> {
        (**self).read()
    }
}

impl<R, T: ItemReader<R> + ?Sized> ItemReader<R> for Box<T> {
    fn read(&self) -> ItemReaderResult<R> {
        (**self).read()
    }
}

impl<W: ?Sized, T: ItemWriter<W> + ?Sized> ItemWriter<W> for &T {
    fn write(&self, item: &W) -> ItemWriterResult {
        (**self).write(item)
    }
    fn flush(&self) -> ItemWriterResult {
        (**self).flush()
    }
    fn open(&self) -> ItemWriterResult {
        (**self).open()
    }
    fn close(&self) -> ItemWriterResult {
        (**self).close()
    }
}

#[derive(Default)]
pub struct DefaultProcessor {}

impl<R> ItemProcessor<R, R> for DefaultProcessor {
    fn process(&self, item: R) -> Result<Option<R>, BatchError> {
        Ok(Some(item))
    }
}
