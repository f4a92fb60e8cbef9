use std::cell::RefCell;

use crate::{
    core::item::{ItemReader, ItemReaderResult},
    error::BatchError,
    item::line::Row,
};

/// An [`ItemReader`] over an in-memory sequence.
///
/// Handy as a row source when rows are produced by something other than the
/// CSV adapter, and in tests.
///
/// ```
/// use rdr_wrtr::core::item::ItemReader;
/// use rdr_wrtr::item::iter::IterItemReader;
///
/// let reader = IterItemReader::rows(vec![vec!["a", "b"], vec!["1", "2"]]);
/// let first = reader.read().unwrap().unwrap();
/// assert_eq!(first.line_num, 1);
/// assert_eq!(*first, vec!["a", "b"]);
/// ```
pub struct IterItemReader<'a, R> {
    items: RefCell<Box<dyn Iterator<Item = Result<R, BatchError>> + 'a>>,
}

impl<'a, R: 'a> IterItemReader<'a, R> {
    pub fn new<I>(items: I) -> Self
    where
        I: IntoIterator<Item = R>,
        I::IntoIter: 'a,
    {
        Self::from_results(items.into_iter().map(Ok))
    }

    /// Reader that also replays errors, as a failing source would.
    pub fn from_results<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Result<R, BatchError>>,
        I::IntoIter: 'a,
    {
        Self {
            items: RefCell::new(Box::new(items.into_iter())),
        }
    }
}

impl<'a> IterItemReader<'a, Row> {
    /// Rows numbered from 1 in sequence order.
    pub fn rows<I, F, S>(rows: I) -> Self
    where
        I: IntoIterator<Item = F> + 'a,
        I::IntoIter: 'a,
        F: IntoIterator<Item = S> + 'a,
        S: Into<String> + 'a,
    {
        Self::new(
            rows.into_iter()
                .zip(1u64..)
                .map(|(fields, line_num)| Row::from_fields(fields, line_num)),
        )
    }
}

impl<R> ItemReader<R> for IterItemReader<'_, R> {
    fn read(&self) -> ItemReaderResult<R> {
        self.items.borrow_mut().next().transpose()
    }
}

impl<R> Iterator for IterItemReader<'_, R> {
    type Item = Result<R, BatchError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.items.get_mut().next()
    }
}
