//! Durable passed/approved markers per stone.

use std::collections::HashSet;

use anyhow::Result;
use tracing::info;

use crate::core::naming::{approved_key, passed_key};
use crate::io::store::KeyValueStore;

pub struct PassageLedger<'a, S: KeyValueStore> {
    store: &'a S,
}

impl<'a, S: KeyValueStore> PassageLedger<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn is_passed(&self, stone: &str) -> Result<bool> {
        self.store.contains(&passed_key(stone))
    }

    /// Mark the stone passed. Re-marking is a no-op.
    pub fn mark_passed(&self, stone: &str) -> Result<()> {
        if self.is_passed(stone)? {
            return Ok(());
        }
        self.store.put(&passed_key(stone), "")?;
        info!(stone, "stone passed");
        Ok(())
    }

    pub fn is_approved(&self, stone: &str) -> Result<bool> {
        self.store.contains(&approved_key(stone))
    }

    /// Record human approval. Re-approving is a no-op.
    pub fn mark_approved(&self, stone: &str) -> Result<()> {
        if self.is_approved(stone)? {
            return Ok(());
        }
        self.store.put(&approved_key(stone), "")?;
        info!(stone, "stone approved");
        Ok(())
    }

    /// Names among `stones` that carry a passage marker.
    pub fn passed_among<'n>(&self, stones: impl IntoIterator<Item = &'n str>) -> Result<HashSet<String>> {
        let mut passed = HashSet::new();
        for stone in stones {
            if self.is_passed(stone)? {
                passed.insert(stone.to_string());
            }
        }
        Ok(passed)
    }
}
