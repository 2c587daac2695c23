//! Named numeric properties attached to compiled objects.

use std::collections::BTreeMap;

use crate::error::UnknownProperty;

/// Get/set access to an object's numeric properties.
///
/// Lookups are exact string matches; there is no prefix or case folding.
/// The set of names is fixed when the object is created, so `set` never
/// adds a property.
pub trait PropertyTable {
    fn get(&self, name: &str) -> Result<f64, UnknownProperty>;

    fn set(&mut self, name: &str, value: f64) -> Result<(), UnknownProperty>;

    /// Applies every `(name, value)` pair, stopping at the first unknown name.
    fn set_all<'a, I>(&mut self, values: I) -> Result<(), UnknownProperty>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
        Self: Sized,
    {
        for (name, value) in values {
            self.set(name, value)?;
        }
        Ok(())
    }
}

/// In-memory property table with a fixed name set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapPropertyTable {
    values: BTreeMap<String, f64>,
}

impl MapPropertyTable {
    pub fn new(values: BTreeMap<String, f64>) -> Self {
        Self { values }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl PropertyTable for MapPropertyTable {
    fn get(&self, name: &str) -> Result<f64, UnknownProperty> {
        self.values
            .get(name)
            .copied()
            .ok_or_else(|| UnknownProperty(name.to_string()))
    }

    fn set(&mut self, name: &str, value: f64) -> Result<(), UnknownProperty> {
        match self.values.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(UnknownProperty(name.to_string())),
        }
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for MapPropertyTable {
    fn from_iter<T: IntoIterator<Item = (K, f64)>>(iter: T) -> Self {
        Self::new(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
