//! Owner-partitioned collections of deduplicated entries.
//!
//! A [`Collection`] maps an owner id to that owner's entries, each keyed by a
//! [`DedupKey`] derived from the entry's identifying fields. The whole
//! collection is stored as one blob under one backend key.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

// ─── Entries ─────────────────────────────────────────────────────────────────

/// A record that can live in a [`Collection`].
pub trait Entry: Clone + PartialEq + Serialize + DeserializeOwned {
  /// The owner partition this entry belongs to.
  fn owner(&self) -> &str;

  /// Deterministic key over the identifying fields. Entries with equal keys
  /// are the same entry.
  fn dedup_key(&self) -> DedupKey;
}

/// Composite key built from an ordered list of fields.
///
/// Every field is written as `<byte length>:<value>|`, so no choice of field
/// contents can make two different field lists produce the same key.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DedupKey(String);

impl DedupKey {
  pub fn new() -> Self { Self::default() }

  pub fn field(mut self, value: &str) -> Self {
    self.0.push_str(&format!("{}:{value}|", value.len()));
    self
  }

  pub fn as_str(&self) -> &str { &self.0 }

  pub fn into_string(self) -> String { self.0 }
}

// ─── Owner filter ────────────────────────────────────────────────────────────

/// Which owners a read covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerFilter<'a> {
  All,
  Only(&'a str),
}

impl<'a> OwnerFilter<'a> {
  /// Interpret an owner parameter where the empty string is the wildcard.
  pub fn from_param(owner: &'a str) -> Self {
    if owner.is_empty() { Self::All } else { Self::Only(owner) }
  }
}

// ─── Collection ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Collection<T> {
  owners: BTreeMap<String, BTreeMap<String, T>>,
}

impl<T> Default for Collection<T> {
  fn default() -> Self { Self { owners: BTreeMap::new() } }
}

impl<T: Entry> Collection<T> {
  pub fn new() -> Self { Self::default() }

  pub fn get(&self, owner: &str, key: &DedupKey) -> Option<&T> {
    self.owners.get(owner)?.get(key.as_str())
  }

  pub fn contains(&self, entry: &T) -> bool {
    self.get(entry.owner(), &entry.dedup_key()).is_some()
  }

  /// Insert `entry` unless one with the same key exists. Returns whether the
  /// collection changed.
  pub fn insert_if_absent(&mut self, entry: T) -> bool {
    let key = entry.dedup_key().into_string();
    let inner = self.owners.entry(entry.owner().to_owned()).or_default();
    if inner.contains_key(&key) {
      return false;
    }
    inner.insert(key, entry);
    true
  }

  /// Insert or replace. The last value written for a key wins. Returns
  /// whether the collection changed.
  pub fn upsert(&mut self, entry: T) -> bool {
    let key = entry.dedup_key().into_string();
    let inner = self.owners.entry(entry.owner().to_owned()).or_default();
    if inner.get(&key) == Some(&entry) {
      return false;
    }
    inner.insert(key, entry);
    true
  }

  /// Remove the entry with the same owner and key as `entry`.
  pub fn remove(&mut self, entry: &T) -> Option<T> {
    let owner = entry.owner();
    let inner = self.owners.get_mut(owner)?;
    let removed = inner.remove(entry.dedup_key().as_str());
    if inner.is_empty() {
      self.owners.remove(owner);
    }
    removed
  }

  /// Keep only the entries of `owner` for which `keep` holds. Returns the
  /// number removed.
  pub fn retain_owner(&mut self, owner: &str, mut keep: impl FnMut(&T) -> bool) -> usize {
    let Some(inner) = self.owners.get_mut(owner) else {
      return 0;
    };
    let before = inner.len();
    inner.retain(|_, entry| keep(entry));
    let removed = before - inner.len();
    if inner.is_empty() {
      self.owners.remove(owner);
    }
    removed
  }

  pub fn iter(&self, filter: OwnerFilter<'_>) -> impl Iterator<Item = &T> {
    self
      .owners
      .iter()
      .filter(move |(owner, _)| match filter {
        OwnerFilter::All => true,
        OwnerFilter::Only(wanted) => owner.as_str() == wanted,
      })
      .flat_map(|(_, inner)| inner.values())
  }

  pub fn entries(&self, filter: OwnerFilter<'_>) -> Vec<T> {
    self.iter(filter).cloned().collect()
  }

  pub fn len(&self) -> usize { self.owners.values().map(BTreeMap::len).sum() }

  pub fn is_empty(&self) -> bool { self.owners.is_empty() }
}
