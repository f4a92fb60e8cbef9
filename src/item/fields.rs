use std::collections::{HashMap, HashSet};

use log::debug;
use unicode_ident::{is_xid_continue, is_xid_start};

use crate::{
    core::item::ItemReader,
    error::BatchError,
    item::{
        line::Row,
        list_reader::{ListItemReader, Normalizer},
    },
};

/// Name attribute reserved for the line number on object records.
pub const LINE_NUM: &str = "line_num";

/// Anything that can name a field: plain strings, or column descriptors that
/// carry a name.
///
/// ```
/// use rdr_wrtr::item::fields::FieldName;
///
/// struct Column {
///     name: String,
///     width: usize,
/// }
///
/// impl FieldName for Column {
///     fn field_name(&self) -> &str {
///         &self.name
///     }
/// }
///
/// let col = Column { name: "id".to_string(), width: 4 };
/// assert_eq!(col.field_name(), "id");
/// ```
pub trait FieldName {
    fn field_name(&self) -> &str;
}

impl FieldName for str {
    fn field_name(&self) -> &str {
        self
    }
}

impl FieldName for String {
    fn field_name(&self) -> &str {
        self
    }
}

impl<T: FieldName + ?Sized> FieldName for &T {
    fn field_name(&self) -> &str {
        (**self).field_name()
    }
}

pub(crate) fn field_names<I>(fields: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: FieldName,
{
    fields
        .into_iter()
        .map(|field| field.field_name().to_string())
        .collect()
}

/// Resolves the active field list and wraps `source` for data rows.
///
/// Without supplied fields, the first row surviving `normalizer` is consumed
/// as the header. When `ignore_rows_with_fields` is set, later rows equal to
/// the field list are skipped.
pub(crate) fn resolve_fields<S: ItemReader<Row>>(
    source: S,
    fields: Option<Vec<String>>,
    rename: Option<&HashMap<String, String>>,
    normalizer: Normalizer,
    ignore_rows_with_fields: bool,
) -> Result<(ListItemReader<S>, Vec<String>), BatchError> {
    if fields.is_some() && rename.is_some() {
        return Err(BatchError::Configuration(
            "rename specified with supplied fields".to_string(),
        ));
    }

    let mut reader = ListItemReader::new(source, normalizer);

    let mut fields = match fields {
        Some(fields) => fields,
        None => match reader.read()? {
            Some(header) => {
                debug!("Read header at line {}: {:?}", header.line_num, *header);
                header.into_inner()
            }
            None => return Err(BatchError::NoFields),
        },
    };

    if fields.is_empty() {
        return Err(BatchError::NoFields);
    }

    if let Some(rename) = rename {
        for field in fields.iter_mut() {
            if let Some(renamed) = rename.get(field.as_str()) {
                *field = renamed.clone();
            }
        }
    }

    check_unique(&fields)?;

    if ignore_rows_with_fields {
        reader.normalizer.ignore = Some(fields.clone());
    }

    Ok((reader, fields))
}

pub(crate) fn check_unique(fields: &[String]) -> Result<(), BatchError> {
    let mut seen = HashSet::with_capacity(fields.len());
    if fields.iter().all(|field| seen.insert(field.as_str())) {
        Ok(())
    } else {
        Err(BatchError::DuplicateFields(fields.to_vec()))
    }
}

pub(crate) fn check_not_blank(fields: &[String]) -> Result<(), BatchError> {
    if fields.iter().any(String::is_empty) {
        Err(BatchError::BlankField(fields.to_vec()))
    } else {
        Ok(())
    }
}

/// Field names usable as object attributes: an identifier other than
/// [`LINE_NUM`].
pub(crate) fn check_attribute_names(fields: &[String]) -> Result<(), BatchError> {
    match fields
        .iter()
        .find(|field| !is_identifier(field) || field.as_str() == LINE_NUM)
    {
        Some(field) => Err(BatchError::InvalidFieldName(field.clone())),
        None => Ok(()),
    }
}

/// `XID_Start` (or `_`) followed by `XID_Continue` characters.
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first == '_' || is_xid_start(first) => chars.all(is_xid_continue),
        _ => false,
    }
}
