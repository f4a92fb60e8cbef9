//! Static field tables for object records.
//!
//! Reading assigns each mapped value through a [`FieldSetters`] table, writing
//! reads each field back through a [`FieldGetters`] table. Both are declared
//! once per record type.
//!
//! ```
//! use rdr_wrtr::item::object::{FieldGetters, FieldSetters};
//!
//! #[derive(Default)]
//! struct City {
//!     name: String,
//!     country: String,
//!     line: u64,
//! }
//!
//! let setters = FieldSetters::new(|city: &mut City, line| city.line = line)
//!     .field("name", |city, value| city.name = value)
//!     .field("country", |city, value| city.country = value);
//!
//! let getters = FieldGetters::new()
//!     .field("name", |city: &City| Some(city.name.clone()))
//!     .field("country", |city: &City| Some(city.country.clone()));
//!
//! assert!(setters.contains("name"));
//! assert!(getters.contains("country"));
//! ```

use indexmap::IndexMap;

use crate::error::BatchError;

pub type Setter<T> = fn(&mut T, String);
pub type ExtraSetter<T> = fn(&mut T, &str, String);
pub type Getter<T> = fn(&T) -> Option<String>;

pub struct FieldSetters<T> {
    setters: IndexMap<&'static str, Setter<T>>,
    extras: Option<ExtraSetter<T>>,
    line_num: fn(&mut T, u64),
}

impl<T> FieldSetters<T> {
    /// Starts a table; `line_num` stores the originating line on each object.
    pub fn new(line_num: fn(&mut T, u64)) -> Self {
        Self {
            setters: IndexMap::new(),
            extras: None,
            line_num,
        }
    }

    pub fn field(mut self, name: &'static str, setter: Setter<T>) -> Self {
        self.setters.insert(name, setter);
        self
    }

    /// Receives values whose field has no setter, such as generated rest keys.
    pub fn extras(mut self, setter: ExtraSetter<T>) -> Self {
        self.extras = Some(setter);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.setters.contains_key(name)
    }

    pub(crate) fn set(
        &self,
        object: &mut T,
        name: &str,
        value: String,
        line: u64,
    ) -> Result<(), BatchError> {
        match (self.setters.get(name), self.extras) {
            (Some(setter), _) => setter(object, value),
            (None, Some(extras)) => extras(object, name, value),
            (None, None) => {
                return Err(BatchError::UnknownField {
                    line,
                    field: name.to_string(),
                });
            }
        }
        Ok(())
    }

    pub(crate) fn set_line_num(&self, object: &mut T, line: u64) {
        (self.line_num)(object, line)
    }

    /// Fields the table cannot store, checked before any row is read.
    pub(crate) fn check_fields(&self, fields: &[String]) -> Result<(), BatchError> {
        if self.extras.is_some() {
            return Ok(());
        }
        match fields.iter().find(|field| !self.contains(field)) {
            Some(field) => Err(BatchError::Configuration(format!(
                "no setter declared for field {field:?}"
            ))),
            None => Ok(()),
        }
    }
}

pub struct FieldGetters<T> {
    getters: IndexMap<&'static str, Getter<T>>,
}

impl<T> Default for FieldGetters<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FieldGetters<T> {
    pub fn new() -> Self {
        Self {
            getters: IndexMap::new(),
        }
    }

    /// A getter returning `None` reads as a missing attribute.
    pub fn field(mut self, name: &'static str, getter: Getter<T>) -> Self {
        self.getters.insert(name, getter);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.getters.contains_key(name)
    }

    pub(crate) fn get(&self, object: &T, name: &str) -> Option<String> {
        self.getters.get(name).and_then(|getter| getter(object))
    }
}
