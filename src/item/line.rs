use std::{
    fmt,
    ops::{Deref, DerefMut},
};

use indexmap::IndexMap;

/// A value tagged with the line it was read from.
///
/// The line number is carried for diagnostics only. `Line<T>` derefs to `T`,
/// so a [`Row`] can be indexed and iterated like the `Vec<String>` it wraps.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Line<T> {
    pub line_num: u64,
    pub data: T,
}

/// Ordered string fields of one input line.
pub type Row = Line<Vec<String>>;

/// Field name to value, in field order.
pub type DictLine = Line<IndexMap<String, String>>;

impl<T> Line<T> {
    pub fn new(data: T, line_num: u64) -> Self {
        Self { line_num, data }
    }

    pub fn into_inner(self) -> T {
        self.data
    }

    /// Replaces the payload, keeping the line number.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Line<U> {
        Line {
            line_num: self.line_num,
            data: f(self.data),
        }
    }
}

impl Row {
    /// Builds a row from anything string-like, mostly useful in tests.
    pub fn from_fields<I, S>(fields: I, line_num: u64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Line::new(fields.into_iter().map(Into::into).collect(), line_num)
    }
}

impl<T> Deref for Line<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.data
    }
}

impl<T> DerefMut for Line<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.data
    }
}

impl<T: fmt::Debug> fmt::Debug for Line<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Line: {} {:?}", self.line_num, self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::Row;

    #[test]
    fn debug_output_should_include_line_number() {
        let row = Row::from_fields(["a", "b"], 4);
        assert_eq!(format!("{:?}", row), r#"Line: 4 ["a", "b"]"#);
    }

    #[test]
    fn row_should_deref_to_its_fields() {
        let mut row = Row::from_fields(["a"], 1);
        row.push("b".to_string());
        assert_eq!(row.len(), 2);
        assert_eq!(row[1], "b");
    }
}
