//! Finder registration and URL building.
//!
//! A finder associates a tuple of identifiers with a URL template holding one
//! `%s` per identifier. Lookups ignore the order in which filters are supplied
//! but respect duplicates: `("hello", "mum", "hello")` is only matched by
//! exactly two `hello` filters and one `mum` filter.

use std::collections::{BTreeMap, HashMap, VecDeque};

use docbind_util::{count_placeholders, substitute_placeholders};
use tracing::debug;

use crate::BindError;

/// A registered URL template with its identifiers in template order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finder {
    keys: Vec<String>,
    template: String,
}

impl Finder {
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Substitutes filter values into the template.
    ///
    /// Each identifier keeps a queue of its values in the order they were
    /// supplied; every template position takes the next value from the queue
    /// of the identifier declared at that position.
    pub fn build_url(&self, filters: &[(String, String)]) -> Result<String, BindError> {
        let mut queues: HashMap<&str, VecDeque<&str>> = HashMap::new();
        for (key, value) in filters {
            queues.entry(key.as_str()).or_default().push_back(value.as_str());
        }

        let mut values = Vec::with_capacity(self.keys.len());
        for key in &self.keys {
            let value = queues
                .get_mut(key.as_str())
                .and_then(VecDeque::pop_front)
                .ok_or_else(|| BindError::InvalidFinder {
                    template: self.template.clone(),
                    reason: format!("no value supplied for '{key}'"),
                })?;
            values.push(value);
        }
        if let Some((key, _)) = queues.iter().find(|(_, queue)| !queue.is_empty()) {
            return Err(BindError::InvalidFinder {
                template: self.template.clone(),
                reason: format!("too many values supplied for '{key}'"),
            });
        }

        let url = substitute_placeholders(&self.template, &values).map_err(|err| BindError::InvalidFinder {
            template: self.template.clone(),
            reason: err.to_string(),
        })?;
        debug!(template = %self.template, %url, "built finder url");
        Ok(url)
    }
}

/// Finders of one model, keyed by their sorted identifier multiset.
#[derive(Debug, Clone, Default)]
pub struct FinderTable {
    finders: BTreeMap<Vec<String>, Finder>,
}

fn lookup_key<S: AsRef<str>>(keys: &[S]) -> Vec<String> {
    let mut sorted: Vec<String> = keys.iter().map(|key| key.as_ref().to_string()).collect();
    sorted.sort();
    sorted
}

impl FinderTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `template` for the identifiers in `keys`.
    ///
    /// # Errors
    /// [`BindError::InvalidFinder`] when the template's placeholder count
    /// differs from the number of keys, or when the same identifier multiset
    /// already has a finder.
    pub fn register<S: AsRef<str>>(&mut self, keys: &[S], template: impl Into<String>) -> Result<(), BindError> {
        let template = template.into();
        let placeholders = count_placeholders(&template);
        if placeholders != keys.len() {
            return Err(BindError::InvalidFinder {
                template,
                reason: format!("{} key(s) but {} placeholder(s)", keys.len(), placeholders),
            });
        }

        let lookup = lookup_key(keys);
        if self.finders.contains_key(&lookup) {
            return Err(BindError::InvalidFinder {
                template,
                reason: format!("a finder for ({}) is already registered", lookup.join(", ")),
            });
        }
        self.finders.insert(
            lookup,
            Finder {
                keys: keys.iter().map(|key| key.as_ref().to_string()).collect(),
                template,
            },
        );
        Ok(())
    }

    /// Finds the finder whose identifiers match `supplied` as a multiset.
    pub fn resolve<S: AsRef<str>>(&self, model: &str, supplied: &[S]) -> Result<&Finder, BindError> {
        let lookup = lookup_key(supplied);
        self.finders.get(&lookup).ok_or_else(|| BindError::NoRegisteredFinder {
            model: model.to_string(),
            keys: lookup,
        })
    }

    pub fn len(&self) -> usize {
        self.finders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.finders.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Finder> {
        self.finders.values()
    }
}
