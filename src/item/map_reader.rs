use std::{borrow::Cow, collections::HashMap, rc::Rc};

use indexmap::IndexMap;
use log::debug;

use crate::{
    core::item::{ItemReader, ItemReaderResult},
    error::BatchError,
    item::{
        fields::{FieldName, check_attribute_names, check_not_blank, field_names, resolve_fields},
        line::{DictLine, Line, Row},
        list_reader::{ListItemReader, Normalizer, RowHandler},
        object::FieldSetters,
    },
};

/// Reconciles row length against the field list.
struct RowMapper {
    fields: Vec<String>,
    rest_key: Option<String>,
    rest_val: Option<String>,
}

impl RowMapper {
    /// Returns the fields active for `row`, padding the row when it is short.
    fn map<'f>(&'f self, mut row: Row) -> Result<(Cow<'f, [String]>, Row), BatchError> {
        let expected = self.fields.len();
        let found = row.len();

        if found == expected {
            return Ok((Cow::Borrowed(self.fields.as_slice()), row));
        }

        if found > expected {
            let Some(rest_key) = &self.rest_key else {
                return Err(BatchError::TooManyFields {
                    line: row.line_num,
                    expected,
                    found,
                });
            };
            let mut active = self.fields.clone();
            active.extend((0..found - expected).map(|idx| format!("{rest_key}{idx}")));
            if active[expected..].iter().any(|key| self.fields.contains(key)) {
                return Err(BatchError::DuplicateRestKey {
                    line: row.line_num,
                    fields: active,
                });
            }
            return Ok((Cow::Owned(active), row));
        }

        match &self.rest_val {
            Some(rest_val) => {
                row.resize(expected, rest_val.clone());
                Ok((Cow::Borrowed(self.fields.as_slice()), row))
            }
            None => Err(BatchError::InsufficientFields {
                line: row.line_num,
                expected,
                found,
            }),
        }
    }
}

/// Reads cleaned rows as dictionaries keyed by field name.
///
/// ```
/// use rdr_wrtr::core::item::ItemReader;
/// use rdr_wrtr::item::{iter::IterItemReader, map_reader::MapReaderBuilder};
///
/// let source = IterItemReader::rows(vec![
///     vec!["city", "country"],
///     vec!["Boston", "United States"],
///     vec!["Concord", "United States", "NH"],
/// ]);
///
/// let reader = MapReaderBuilder::new()
///     .rest_key("extra")
///     .dict_from_source(source)
///     .unwrap();
///
/// let boston = reader.read().unwrap().unwrap();
/// assert_eq!(boston["city"], "Boston");
/// assert_eq!(boston.line_num, 2);
///
/// let concord = reader.read().unwrap().unwrap();
/// assert_eq!(concord["extra0"], "NH");
/// ```
pub struct DictItemReader<S> {
    rows: ListItemReader<S>,
    mapper: RowMapper,
}

impl<S: ItemReader<Row>> DictItemReader<S> {
    pub fn fields(&self) -> &[String] {
        &self.mapper.fields
    }

    fn next_line(&self) -> ItemReaderResult<DictLine> {
        let Some(row) = self.rows.read()? else {
            return Ok(None);
        };
        let (fields, row) = self.mapper.map(row)?;
        let line_num = row.line_num;
        let record: IndexMap<String, String> =
            fields.iter().cloned().zip(row.into_inner()).collect();
        Ok(Some(Line::new(record, line_num)))
    }
}

impl<S: ItemReader<Row>> ItemReader<DictLine> for DictItemReader<S> {
    fn read(&self) -> ItemReaderResult<DictLine> {
        self.next_line()
    }
}

impl<S: ItemReader<Row>> Iterator for DictItemReader<S> {
    type Item = Result<DictLine, BatchError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_line().transpose()
    }
}

/// Reads cleaned rows into objects built by a constructor and filled through a
/// [`FieldSetters`] table.
pub struct ObjItemReader<S, T> {
    rows: ListItemReader<S>,
    mapper: RowMapper,
    ctor: Box<dyn Fn() -> T>,
    setters: FieldSetters<T>,
}

impl<S: ItemReader<Row>, T> ObjItemReader<S, T> {
    pub fn fields(&self) -> &[String] {
        &self.mapper.fields
    }

    fn next_object(&self) -> ItemReaderResult<T> {
        let Some(row) = self.rows.read()? else {
            return Ok(None);
        };
        let (fields, row) = self.mapper.map(row)?;
        let line_num = row.line_num;
        let mut object = (self.ctor)();
        for (name, value) in fields.iter().zip(row.into_inner()) {
            self.setters.set(&mut object, name, value, line_num)?;
        }
        self.setters.set_line_num(&mut object, line_num);
        Ok(Some(object))
    }
}

impl<S: ItemReader<Row>, T> ItemReader<T> for ObjItemReader<S, T> {
    fn read(&self) -> ItemReaderResult<T> {
        self.next_object()
    }
}

impl<S: ItemReader<Row>, T> Iterator for ObjItemReader<S, T> {
    type Item = Result<T, BatchError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_object().transpose()
    }
}

/// A builder for [`DictItemReader`] and [`ObjItemReader`].
///
/// Field validation and header consumption happen in `dict_from_source` and
/// `obj_from_source`, before any data row is read.
///
/// # Default Configuration
///
/// - Fields: read from the first row
/// - Leading whitespace: kept
/// - Trailing whitespace: stripped
/// - Blank rows: skipped
/// - Rows equal to the field list: skipped
/// - Rest key / rest value: none, length mismatches fail
pub struct MapReaderBuilder {
    fields: Option<Vec<String>>,
    field_rename: Option<HashMap<String, String>>,
    handler: Option<RowHandler>,
    leading_ws: bool,
    trailing_ws: bool,
    ignore_blanks: bool,
    ignore_rows_with_fields: bool,
    rest_key: Option<String>,
    rest_val: Option<String>,
}

impl Default for MapReaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MapReaderBuilder {
    pub fn new() -> Self {
        Self {
            fields: None,
            field_rename: None,
            handler: None,
            leading_ws: true,
            trailing_ws: false,
            ignore_blanks: true,
            ignore_rows_with_fields: true,
            rest_key: None,
            rest_val: None,
        }
    }

    /// Uses these fields instead of reading a header row.
    pub fn fields<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator,
        I::Item: FieldName,
    {
        self.fields = Some(field_names(fields));
        self
    }

    /// Renames header fields. Cannot be combined with [`fields`](Self::fields).
    pub fn field_rename<I, K, V>(mut self, rename: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.field_rename = Some(
            rename
                .into_iter()
                .map(|(from, to)| (from.into(), to.into()))
                .collect(),
        );
        self
    }

    pub fn handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(Row) -> Option<Row> + 'static,
    {
        self.handler = Some(Rc::new(handler));
        self
    }

    pub fn leading_ws(mut self, keep: bool) -> Self {
        self.leading_ws = keep;
        self
    }

    pub fn trailing_ws(mut self, keep: bool) -> Self {
        self.trailing_ws = keep;
        self
    }

    pub fn ignore_blanks(mut self, yes: bool) -> Self {
        self.ignore_blanks = yes;
        self
    }

    pub fn ignore_rows_with_fields(mut self, yes: bool) -> Self {
        self.ignore_rows_with_fields = yes;
        self
    }

    /// Prefix for keys generated from values beyond the field list
    /// (`rest_key0`, `rest_key1`, ...).
    pub fn rest_key(mut self, rest_key: impl Into<String>) -> Self {
        self.rest_key = Some(rest_key.into());
        self
    }

    /// Value used to pad rows shorter than the field list.
    pub fn rest_val(mut self, rest_val: impl Into<String>) -> Self {
        self.rest_val = Some(rest_val.into());
        self
    }

    fn resolve<S: ItemReader<Row>>(
        self,
        source: S,
    ) -> Result<(ListItemReader<S>, RowMapper), BatchError> {
        let normalizer = Normalizer::new(
            self.leading_ws,
            self.trailing_ws,
            self.ignore_blanks,
            None,
            self.handler,
        );
        let (rows, fields) = resolve_fields(
            source,
            self.fields,
            self.field_rename.as_ref(),
            normalizer,
            self.ignore_rows_with_fields,
        )?;
        Ok((
            rows,
            RowMapper {
                fields,
                rest_key: self.rest_key,
                rest_val: self.rest_val,
            },
        ))
    }

    pub fn dict_from_source<S: ItemReader<Row>>(
        self,
        source: S,
    ) -> Result<DictItemReader<S>, BatchError> {
        let (rows, mapper) = self.resolve(source)?;
        check_not_blank(&mapper.fields)?;
        debug!("Dictionary reader over fields {:?}", mapper.fields);
        Ok(DictItemReader { rows, mapper })
    }

    pub fn obj_from_source<S, T, C>(
        self,
        source: S,
        ctor: C,
        setters: FieldSetters<T>,
    ) -> Result<ObjItemReader<S, T>, BatchError>
    where
        S: ItemReader<Row>,
        C: Fn() -> T + 'static,
    {
        let (rows, mapper) = self.resolve(source)?;
        check_attribute_names(&mapper.fields)?;
        setters.check_fields(&mapper.fields)?;
        debug!("Object reader over fields {:?}", mapper.fields);
        Ok(ObjItemReader {
            rows,
            mapper,
            ctor: Box::new(ctor),
            setters,
        })
    }
}

/// Shorthand for a [`DictItemReader`] reading its fields from the header row.
pub fn dict_reader<S: ItemReader<Row>>(source: S) -> Result<DictItemReader<S>, BatchError> {
    MapReaderBuilder::new().dict_from_source(source)
}
