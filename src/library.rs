//! The named object library: shared GPU objects looked up by name with a
//! kind check.

use std::collections::{HashMap, HashSet};

use crate::chain::ObjectChain;
use crate::error::{Error, Result};
use crate::object::{GpuObject, ObjectKey, ObjectKind};

/// Library name of the default textured shader.
pub const DEFAULT_TEXTURED_SHADER: &str = "default_textured_shader";
/// Library name of the default flat-color shader.
pub const DEFAULT_COLORED_SHADER: &str = "default_colored_shader";
/// Library name of the default unit-quad vertex array.
pub const DEFAULT_VERTEX_ARRAY: &str = "default_vertex_array";

/// Name → key registry over an [`ObjectChain`].
///
/// The library never owns objects itself; it only remembers which chain key
/// a name refers to. Names are unique and never overwritten. Entries marked
/// as defaults cannot be deleted.
#[derive(Debug, Default)]
pub struct ObjectLibrary {
    entries: HashMap<String, ObjectKey>,
    defaults: HashSet<String>,
}

impl ObjectLibrary {
    /// An empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Link the object built by `make` under `name`, or return the object
    /// already registered there.
    ///
    /// `make` only runs when the name is free.
    ///
    /// # Errors
    ///
    /// - [`Error::WrongKind`] if `name` is bound to an object that cannot be
    ///   used as `requested`. The existing entry is kept.
    /// - Errors from `make` and from [`ObjectChain::link`].
    pub fn create<O: GpuObject>(
        &mut self,
        chain: &mut ObjectChain<O>,
        device: &O::Device,
        name: &str,
        requested: ObjectKind,
        make: impl FnOnce() -> Result<O>,
    ) -> Result<ObjectKey> {
        match self.find_key(chain, name, requested) {
            Ok(key) => {
                log::warn!("object `{name}` already exists in the library");
                return Ok(key);
            }
            Err(err @ Error::WrongKind { .. }) => {
                log::warn!("{err}");
                return Err(err);
            }
            Err(_) => {}
        }

        let key = chain.link(device, make()?)?;
        self.entries.insert(name.to_owned(), key);
        log::debug!("library entry `{name}` created ({requested})");
        Ok(key)
    }

    /// Key of the object registered as `name`, checked against `requested`.
    ///
    /// Entries whose object was unlinked behind the library's back are
    /// reported as not found.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] or [`Error::WrongKind`].
    pub fn find_key<O: GpuObject>(
        &self,
        chain: &ObjectChain<O>,
        name: &str,
        requested: ObjectKind,
    ) -> Result<ObjectKey> {
        let object = self
            .entries
            .get(name)
            .and_then(|&key| chain.get(key).map(|object| (key, object)));
        let Some((key, object)) = object else {
            return Err(Error::NotFound(name.to_owned()));
        };
        let found = object.kind();
        if !found.satisfies(requested) {
            return Err(Error::WrongKind {
                name: name.to_owned(),
                found,
                requested,
            });
        }
        Ok(key)
    }

    /// Like [`find_key`](Self::find_key), logging failures.
    ///
    /// # Errors
    ///
    /// See [`find_key`](Self::find_key).
    pub fn find<O: GpuObject>(&self, chain: &ObjectChain<O>, name: &str, requested: ObjectKind) -> Result<ObjectKey> {
        self.find_key(chain, name, requested).inspect_err(|err| log::warn!("{err}"))
    }

    /// Unlink the object registered as `name` and forget the name.
    ///
    /// Returns `false` (and logs a warning) if the name is unknown or is a
    /// default entry.
    pub fn delete<O: GpuObject>(&mut self, chain: &mut ObjectChain<O>, device: &O::Device, name: &str) -> bool {
        let Some(key) = self.remove(name) else {
            return false;
        };
        chain.unlink(device, key);
        true
    }

    /// Forget `name` without touching its object, returning the key it
    /// referred to.
    ///
    /// Returns `None` (and logs a warning) if the name is unknown or is a
    /// default entry.
    pub fn remove(&mut self, name: &str) -> Option<ObjectKey> {
        if self.defaults.contains(name) {
            log::warn!("default object `{name}` cannot be deleted");
            return None;
        }
        let Some(key) = self.entries.remove(name) else {
            log::warn!("object `{name}` could not be found in the library");
            return None;
        };
        log::debug!("library entry `{name}` removed");
        Some(key)
    }

    /// Protect `name` from [`delete`](Self::delete).
    pub fn mark_default(&mut self, name: &str) {
        self.defaults.insert(name.to_owned());
    }

    /// Whether `name` is a protected default entry.
    pub fn is_default(&self, name: &str) -> bool {
        self.defaults.contains(name)
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Whether `key` is registered under any name.
    pub fn contains_key(&self, key: ObjectKey) -> bool {
        self.entries.values().any(|&entry| entry == key)
    }

    /// The name `key` is registered under.
    pub fn name_of(&self, key: ObjectKey) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, &entry)| entry == key)
            .map(|(name, _)| name.as_str())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget every entry, defaults included. Used when the chain is torn
    /// down.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.defaults.clear();
    }
}
