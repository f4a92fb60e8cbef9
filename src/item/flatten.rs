use std::{
    collections::{BTreeMap, HashMap, HashSet},
    hash::BuildHasher,
};

use indexmap::IndexMap;

use crate::{
    error::BatchError,
    item::{fields::check_unique, line::Line, object::FieldGetters},
};

/// Turns one record into a row of values in field order.
///
/// This is the strategy a [`RecordItemWriter`](crate::item::writer::RecordItemWriter)
/// is generic over: [`DictFlattener`] for map-like records, [`ObjFlattener`]
/// for objects read through getters.
pub trait Flattener<T: ?Sized>: Fields {
    fn flatten(&self, item: &T) -> Result<Vec<String>, BatchError>;
}

/// The ordered field list a flattener writes.
pub trait Fields {
    fn fields(&self) -> &[String];
}

/// Read access to a map-like record.
pub trait MapRecord {
    fn value(&self, key: &str) -> Option<&str>;
    fn keys(&self) -> Vec<&str>;
}

impl<S: BuildHasher> MapRecord for HashMap<String, String, S> {
    fn value(&self, key: &str) -> Option<&str> {
        self.get(key).map(String::as_str)
    }

    fn keys(&self) -> Vec<&str> {
        HashMap::keys(self).map(String::as_str).collect()
    }
}

impl<S: BuildHasher> MapRecord for IndexMap<String, String, S> {
    fn value(&self, key: &str) -> Option<&str> {
        self.get(key).map(String::as_str)
    }

    fn keys(&self) -> Vec<&str> {
        IndexMap::keys(self).map(String::as_str).collect()
    }
}

impl MapRecord for BTreeMap<String, String> {
    fn value(&self, key: &str) -> Option<&str> {
        self.get(key).map(String::as_str)
    }

    fn keys(&self) -> Vec<&str> {
        BTreeMap::keys(self).map(String::as_str).collect()
    }
}

impl<M: MapRecord> MapRecord for Line<M> {
    fn value(&self, key: &str) -> Option<&str> {
        self.data.value(key)
    }

    fn keys(&self) -> Vec<&str> {
        self.data.keys()
    }
}

/// What to do with record keys that are not in the field list.
#[derive(Clone, Debug, PartialEq)]
pub enum ExtrasAction {
    Ignore,
    Raise,
    /// Append the values of `rest_key0`, `rest_key1`, ... after the fields.
    /// Keys must be numbered contiguously from 0; any other extra key fails.
    Collect(String),
}

pub struct DictFlattener {
    fields: Vec<String>,
    field_set: HashSet<String>,
    rest_val: Option<String>,
    extras_action: ExtrasAction,
}

impl DictFlattener {
    pub fn new(
        fields: Vec<String>,
        rest_val: Option<String>,
        extras_action: ExtrasAction,
    ) -> Result<Self, BatchError> {
        check_fields(&fields)?;
        let field_set = fields.iter().cloned().collect();
        Ok(Self {
            fields,
            field_set,
            rest_val,
            extras_action,
        })
    }

    fn missing(&self, field: &str) -> Result<String, BatchError> {
        self.rest_val
            .clone()
            .ok_or_else(|| BatchError::MissingField(field.to_string()))
    }

    fn extras<T: MapRecord + ?Sized>(&self, item: &T) -> Result<Vec<String>, BatchError> {
        let extras: Vec<&str> = item
            .keys()
            .into_iter()
            .filter(|key| !self.field_set.contains(*key))
            .collect();

        match &self.extras_action {
            ExtrasAction::Ignore => Ok(Vec::new()),
            ExtrasAction::Raise => match extras.first() {
                Some(key) => Err(BatchError::ExtraField(key.to_string())),
                None => Ok(Vec::new()),
            },
            ExtrasAction::Collect(rest_key) => {
                let mut values = Vec::with_capacity(extras.len());
                for idx in 0..extras.len() {
                    let key = format!("{rest_key}{idx}");
                    // a declared field named like a rest key is never an extra
                    if self.field_set.contains(&key) {
                        break;
                    }
                    match item.value(&key) {
                        Some(value) => values.push(value.to_string()),
                        None => break,
                    }
                }
                if values.len() != extras.len() {
                    let stray = extras
                        .iter()
                        .find(|key| !is_rest_key(key, rest_key, values.len()))
                        .unwrap_or(&extras[0]);
                    return Err(BatchError::ExtraField(stray.to_string()));
                }
                Ok(values)
            }
        }
    }
}

fn is_rest_key(key: &str, rest_key: &str, count: usize) -> bool {
    key.strip_prefix(rest_key)
        .and_then(|idx| idx.parse::<usize>().ok())
        .is_some_and(|idx| idx < count)
}

impl Fields for DictFlattener {
    fn fields(&self) -> &[String] {
        &self.fields
    }
}

impl<T: MapRecord + ?Sized> Flattener<T> for DictFlattener {
    fn flatten(&self, item: &T) -> Result<Vec<String>, BatchError> {
        let mut row = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            match item.value(field) {
                Some(value) => row.push(value.to_string()),
                None => row.push(self.missing(field)?),
            }
        }
        row.extend(self.extras(item)?);
        Ok(row)
    }
}

pub struct ObjFlattener<T> {
    fields: Vec<String>,
    getters: FieldGetters<T>,
    rest_val: Option<String>,
}

impl<T> ObjFlattener<T> {
    pub fn new(
        fields: Vec<String>,
        getters: FieldGetters<T>,
        rest_val: Option<String>,
    ) -> Result<Self, BatchError> {
        check_fields(&fields)?;
        Ok(Self {
            fields,
            getters,
            rest_val,
        })
    }
}

impl<T> Fields for ObjFlattener<T> {
    fn fields(&self) -> &[String] {
        &self.fields
    }
}

impl<T> Flattener<T> for ObjFlattener<T> {
    fn flatten(&self, item: &T) -> Result<Vec<String>, BatchError> {
        self.fields
            .iter()
            .map(|field| match self.getters.get(item, field) {
                Some(value) => Ok(value),
                None => self
                    .rest_val
                    .clone()
                    .ok_or_else(|| BatchError::MissingField(field.clone())),
            })
            .collect()
    }
}

fn check_fields(fields: &[String]) -> Result<(), BatchError> {
    if fields.is_empty() {
        return Err(BatchError::NoFields);
    }
    check_unique(fields)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use indexmap::IndexMap;

    use super::{DictFlattener, ExtrasAction, Flattener, ObjFlattener};
    use crate::{
        BatchError,
        core::item::ItemReader,
        item::{iter::IterItemReader, line::Line, map_reader::MapReaderBuilder, object::FieldGetters},
    };

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|f| f.to_string()).collect()
    }

    fn record(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn flatten_should_follow_field_order() -> Result<(), BatchError> {
        let flattener = DictFlattener::new(fields(&["b", "a"]), None, ExtrasAction::Ignore)?;
        let row = flattener.flatten(&record(&[("a", "1"), ("b", "2"), ("c", "3")]))?;
        assert_eq!(row, vec!["2", "1"]);
        Ok(())
    }

    #[test]
    fn missing_keys_should_use_rest_val_or_fail() -> Result<(), BatchError> {
        let flattener = DictFlattener::new(fields(&["a", "b"]), Some("-".to_string()), ExtrasAction::Raise)?;
        assert_eq!(flattener.flatten(&record(&[("a", "1")]))?, vec!["1", "-"]);

        let flattener = DictFlattener::new(fields(&["a", "b"]), None, ExtrasAction::Raise)?;
        assert!(matches!(
            flattener.flatten(&record(&[("a", "1")])),
            Err(BatchError::MissingField(field)) if field == "b"
        ));
        Ok(())
    }

    #[test]
    fn extra_keys_should_fail_when_raising() -> Result<(), BatchError> {
        let flattener = DictFlattener::new(fields(&["a"]), None, ExtrasAction::Raise)?;
        let map: HashMap<String, String> = HashMap::from([
            ("a".to_string(), "1".to_string()),
            ("z".to_string(), "2".to_string()),
        ]);
        assert!(matches!(
            flattener.flatten(&map),
            Err(BatchError::ExtraField(field)) if field == "z"
        ));
        Ok(())
    }

    #[test]
    fn collected_extras_should_be_appended_in_index_order() -> Result<(), BatchError> {
        let flattener = DictFlattener::new(
            fields(&["a"]),
            None,
            ExtrasAction::Collect("extra".to_string()),
        )?;
        let row = flattener.flatten(&record(&[("extra1", "3"), ("a", "1"), ("extra0", "2")]))?;
        assert_eq!(row, vec!["1", "2", "3"]);

        assert!(matches!(
            flattener.flatten(&record(&[("a", "1"), ("extra0", "2"), ("other", "x")])),
            Err(BatchError::ExtraField(field)) if field == "other"
        ));
        assert!(matches!(
            flattener.flatten(&record(&[("a", "1"), ("extra1", "2")])),
            Err(BatchError::ExtraField(field)) if field == "extra1"
        ));
        Ok(())
    }

    #[test]
    fn collected_extras_should_not_reuse_a_declared_field() -> Result<(), BatchError> {
        let flattener = DictFlattener::new(
            fields(&["extra0"]),
            None,
            ExtrasAction::Collect("extra".to_string()),
        )?;
        assert_eq!(flattener.flatten(&record(&[("extra0", "a")]))?, vec!["a"]);
        assert!(matches!(
            flattener.flatten(&record(&[("extra0", "a"), ("extra1", "b")])),
            Err(BatchError::ExtraField(field)) if field == "extra1"
        ));
        Ok(())
    }

    #[test]
    fn flattening_a_mapped_record_should_restore_the_row() -> Result<(), BatchError> {
        let rows = vec![vec!["1", "2", "3"], vec!["4", "", "6"]];
        let source = IterItemReader::rows(rows.clone());
        let reader = MapReaderBuilder::new()
            .fields(["a", "b", "c"])
            .dict_from_source(source)?;
        let flattener = DictFlattener::new(fields(&["a", "b", "c"]), None, ExtrasAction::Raise)?;

        for expected in rows {
            let line = reader.read()?.unwrap();
            assert_eq!(flattener.flatten(&line)?, expected);
        }
        Ok(())
    }

    #[test]
    fn collect_should_invert_rest_key_mapping() -> Result<(), BatchError> {
        let source = IterItemReader::rows(vec![vec!["1", "2", "3", "4"]]);
        let reader = MapReaderBuilder::new()
            .fields(["a", "b"])
            .rest_key("more")
            .dict_from_source(source)?;
        let flattener = DictFlattener::new(
            fields(&["a", "b"]),
            None,
            ExtrasAction::Collect("more".to_string()),
        )?;
        let line: Line<IndexMap<String, String>> = reader.read()?.unwrap();
        assert_eq!(flattener.flatten(&line)?, vec!["1", "2", "3", "4"]);
        Ok(())
    }

    #[test]
    fn invalid_field_lists_should_be_rejected() {
        assert!(matches!(
            DictFlattener::new(Vec::new(), None, ExtrasAction::Ignore),
            Err(BatchError::NoFields)
        ));
        assert!(matches!(
            DictFlattener::new(fields(&["a", "a"]), None, ExtrasAction::Ignore),
            Err(BatchError::DuplicateFields(_))
        ));
    }

    struct Person {
        name: String,
        nickname: Option<String>,
    }

    fn getters() -> FieldGetters<Person> {
        FieldGetters::new()
            .field("name", |p: &Person| Some(p.name.clone()))
            .field("nickname", |p: &Person| p.nickname.clone())
    }

    #[test]
    fn object_flattener_should_read_through_getters() -> Result<(), BatchError> {
        let person = Person {
            name: "Ada".to_string(),
            nickname: None,
        };

        let flattener = ObjFlattener::new(fields(&["name", "nickname"]), getters(), Some(String::new()))?;
        assert_eq!(flattener.flatten(&person)?, vec!["Ada", ""]);

        let flattener = ObjFlattener::new(fields(&["name", "age"]), getters(), None)?;
        assert!(matches!(
            flattener.flatten(&person),
            Err(BatchError::MissingField(field)) if field == "age"
        ));
        Ok(())
    }
}
