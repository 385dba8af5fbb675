//! Immutable table schema snapshot.
//!
//! A [`Schema`] lists the column families of a table with the policies scans
//! honour: TTL, version cap, time order and whether the family is a counter.
//! Scans borrow the schema for their lifetime and never modify it.

use std::time::Duration;

/// Declaration of one column family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnFamilySpec {
    name: String,
    id: u8,
    ttl: Option<Duration>,
    max_versions: u32,
    counter: bool,
    deleted: bool,
    time_order_ascending: bool,
}

impl ColumnFamilySpec {
    /// Declare a family with the given name and numeric code (`1..=255`).
    pub fn new(name: impl Into<String>, id: u8) -> Self {
        Self {
            name: name.into(),
            id,
            ttl: None,
            max_versions: 0,
            counter: false,
            deleted: false,
            time_order_ascending: false,
        }
    }

    /// Cells older than `ttl` expire.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Keep at most `max_versions` versions per cell (`0` = unlimited).
    pub fn max_versions(mut self, max_versions: u32) -> Self {
        self.max_versions = max_versions;
        self
    }

    /// Mark the family as a counter column.
    pub fn counter(mut self, counter: bool) -> Self {
        self.counter = counter;
        self
    }

    /// Mark the family as dropped; it is skipped by scans that list no columns.
    pub fn deleted(mut self, deleted: bool) -> Self {
        self.deleted = deleted;
        self
    }

    /// Store versions oldest first instead of newest first.
    pub fn time_order_ascending(mut self, ascending: bool) -> Self {
        self.time_order_ascending = ascending;
        self
    }

    /// Family name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Family code used in stored keys.
    pub fn id(&self) -> u8 {
        self.id
    }

    /// Configured TTL.
    pub fn get_ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Configured version cap.
    pub fn get_max_versions(&self) -> u32 {
        self.max_versions
    }

    /// Whether the family is a counter column.
    pub fn is_counter(&self) -> bool {
        self.counter
    }

    /// Whether the family has been dropped.
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Whether versions are stored oldest first.
    pub fn is_time_order_ascending(&self) -> bool {
        self.time_order_ascending
    }

    /// Oldest timestamp still retained at `now`.
    pub(crate) fn cutoff_time(&self, now: i64) -> i64 {
        match self.ttl {
            Some(ttl) => {
                let ttl = i64::try_from(ttl.as_nanos()).unwrap_or(i64::MAX);
                now.saturating_sub(ttl)
            }
            None => crate::key::TIMESTAMP_MIN,
        }
    }
}

/// Column family declarations of a table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    generation: u64,
    families: Vec<ColumnFamilySpec>,
}

impl Schema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the schema generation.
    pub fn generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    /// Add a column family, replacing an earlier one with the same code.
    pub fn family(mut self, family: ColumnFamilySpec) -> Self {
        self.families.retain(|existing| existing.id != family.id);
        self.families.push(family);
        self
    }

    /// Schema generation.
    pub fn get_generation(&self) -> u64 {
        self.generation
    }

    /// Look a family up by name; dropped families are not found.
    pub fn family_by_name(&self, name: &str) -> Option<&ColumnFamilySpec> {
        self.families
            .iter()
            .find(|family| !family.deleted && family.name == name)
    }

    /// Look a family up by code.
    pub fn family_by_id(&self, id: u8) -> Option<&ColumnFamilySpec> {
        self.families.iter().find(|family| family.id == id)
    }

    /// Iterate over all declared families, including dropped ones.
    pub fn families(&self) -> impl Iterator<Item = &ColumnFamilySpec> {
        self.families.iter()
    }
}
