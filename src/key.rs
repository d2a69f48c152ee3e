//! Blackboard key registry.
//!
//! Every named blackboard slot is registered once at setup time and gets a
//! small sequential [`BlackboardKey`]. Names are case-insensitive: `"foo"`,
//! `"Foo"` and `"FOO"` all resolve to the same key.

use crate::avl::{AvlTree, InsertMethod, IterateOrder};
use crate::error::{PetError, PetResult};
use log::debug;
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};

pub const FNV_OFFSET_BASIS: u32 = 0x811C_9DC5;
pub const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a over the ASCII upper-cased bytes of `name`.
pub fn fnv1a_upper(name: &str) -> u32 {
    name.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ byte.to_ascii_uppercase() as u32).wrapping_mul(FNV_PRIME)
    })
}

/// A key name together with its precomputed hash.
#[derive(Debug, Clone)]
pub struct KeyName {
    hash: u32,
    len: usize,
    text: String,
}

impl KeyName {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            hash: fnv1a_upper(&text),
            len: text.len(),
            text,
        }
    }

    pub fn hash(&self) -> u32 {
        self.hash
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    fn folded(&self) -> impl Iterator<Item = u8> + '_ {
        self.text.bytes().map(|b| b.to_ascii_uppercase())
    }
}

impl PartialEq for KeyName {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.len == other.len && self.folded().eq(other.folded())
    }
}

impl Eq for KeyName {}

impl PartialOrd for KeyName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KeyName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.folded().cmp(other.folded())
    }
}

impl Display for KeyName {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        fmt.write_str(&self.text)
    }
}

/// Index of one blackboard slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlackboardKey(u32);

impl BlackboardKey {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for BlackboardKey {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        write!(fmt, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct KeyEntry {
    key: BlackboardKey,
    name: KeyName,
    size: usize,
}

impl KeyEntry {
    pub fn key(&self) -> BlackboardKey {
        self.key
    }

    pub fn name(&self) -> &KeyName {
        &self.name
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

impl PartialEq for KeyEntry {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for KeyEntry {}

impl PartialOrd for KeyEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KeyEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}

impl Borrow<KeyName> for KeyEntry {
    fn borrow(&self) -> &KeyName {
        &self.name
    }
}

/// Flat form of a registered key, used to persist and restore the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRecord {
    pub key: BlackboardKey,
    pub size: usize,
    pub name: String,
}

/// Maps key names to keys and slot sizes.
///
/// Populated while behaviors are being defined and read-only once agents
/// start ticking; blackboards are laid out from its size table.
#[derive(Debug)]
pub struct BlackboardKeyManager {
    names: AvlTree<KeyEntry>,
    next_key: u32,
    total_size: usize,
}

impl Default for BlackboardKeyManager {
    fn default() -> Self {
        Self::new()
    }
}

impl BlackboardKeyManager {
    pub fn new() -> Self {
        Self {
            names: AvlTree::new(InsertMethod::Greater),
            next_key: 0,
            total_size: 0,
        }
    }

    /// Returns the key registered for `name`, registering it with `size`
    /// bytes if it is new. The size of an existing registration is kept.
    pub fn calculate_key(&mut self, name: &str, size: usize) -> BlackboardKey {
        let name = KeyName::new(name);
        if let Some(entry) = self.names.find(&name) {
            return entry.key;
        }

        let key = BlackboardKey(self.next_key);
        self.next_key += 1;
        self.total_size += size;
        debug!("Registered blackboard key {:?} as {} ({} bytes)", name.as_str(), key, size);
        self.names.insert(KeyEntry { key, name, size });
        key
    }

    pub fn find_key(&self, name: &str) -> Option<BlackboardKey> {
        self.names.find(&KeyName::new(name)).map(|entry| entry.key)
    }

    /// Registers `name` under a caller-chosen key, as when restoring a saved
    /// key table. Storing the same pair twice is a no-op; reusing either the
    /// name or the key for something else is rejected.
    pub fn store_key(&mut self, key: BlackboardKey, name: &str, size: usize) -> PetResult<()> {
        let name = KeyName::new(name);
        if let Some(existing) = self.names.find(&name) {
            return if existing.key == key {
                Ok(())
            } else {
                Err(PetError::InvalidArgument)
            };
        }
        if self.entry_by_key(key).is_some() {
            return Err(PetError::InvalidArgument);
        }
        let next_key = key.0.checked_add(1).ok_or(PetError::InvalidArgument)?;

        self.next_key = self.next_key.max(next_key);
        self.total_size += size;
        debug!("Stored blackboard key {:?} as {} ({} bytes)", name.as_str(), key, size);
        self.names.insert(KeyEntry { key, name, size });
        Ok(())
    }

    /// Stores a batch of records. Either every record is stored or, if any
    /// of them conflicts with the batch or with existing keys, none is.
    pub fn import(&mut self, records: impl IntoIterator<Item = KeyRecord>) -> PetResult<()> {
        let mut staged = Self::new();
        for record in records {
            staged.store_key(record.key, &record.name, record.size)?;
        }
        for entry in staged.names.iter() {
            let clashes = match self.names.find(&entry.name) {
                Some(existing) => existing.key != entry.key,
                None => self.entry_by_key(entry.key).is_some(),
            };
            if clashes {
                return Err(PetError::InvalidArgument);
            }
        }
        for entry in staged.names.iter() {
            self.store_key(entry.key, entry.name.as_str(), entry.size)?;
        }
        Ok(())
    }

    /// All registrations in ascending key order.
    pub fn export(&self) -> Vec<KeyRecord> {
        let mut records: Vec<_> = self
            .names
            .iter()
            .map(|entry| KeyRecord {
                key: entry.key,
                size: entry.size,
                name: entry.name.text.clone(),
            })
            .collect();
        records.sort_by_key(|record| record.key);
        records
    }

    /// Number of key indices handed out so far, including any gaps left by
    /// [`store_key`](Self::store_key).
    pub fn key_count(&self) -> usize {
        self.next_key as usize
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn total_size(&self) -> usize {
        self.total_size
    }

    /// Registrations in name order.
    pub fn entries(&self) -> impl Iterator<Item = &KeyEntry> {
        self.names.iter()
    }

    /// Slot size of every key index; unused indices have size 0.
    pub fn key_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.key_count()];
        self.names
            .traverse(IterateOrder::LowestToHighest, |_, entry| {
                sizes[entry.key.index()] = entry.size;
            });
        sizes
    }

    fn entry_by_key(&self, key: BlackboardKey) -> Option<&KeyEntry> {
        self.names.iter().find(|entry| entry.key == key)
    }
}
