// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT license.

//! The bijection between caller-facing `u64` external ids and the 0-based
//! internal slot indices every storage backend and graph actually index by.
//!
//! A single writer mutates the translator at a time (insertion and deletion
//! both require exclusive access further up at the index level), but reads
//! (`get_internal`/`get_external`/`contains_external`) are lock-free once
//! the index holds a shared reference, via `hashbrown::HashMap` plus a
//! dense `Vec` for the reverse direction.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::common::error::AnnError;

/// Maps external ids to internal slots and back. Insertion is all-or-
/// nothing: if an id already exists the map is left untouched and an error
/// is returned, matching the index-level contract that a failed insert
/// must not partially mutate visible state.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct IdTranslator {
    external_to_internal: HashMap<u64, u32>,
    internal_to_external: Vec<u64>,
}

impl IdTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.external_to_internal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.external_to_internal.is_empty()
    }

    pub fn contains_external(&self, external_id: u64) -> bool {
        self.external_to_internal.contains_key(&external_id)
    }

    pub fn get_internal(&self, external_id: u64) -> Option<u32> {
        self.external_to_internal.get(&external_id).copied()
    }

    pub fn get_external(&self, internal_id: u32) -> Option<u64> {
        self.internal_to_external.get(internal_id as usize).copied()
    }

    /// Binds `external_id` to a freshly allocated internal slot at the end
    /// of the dense array, and returns that slot. Fails if `external_id` is
    /// already bound.
    pub fn insert(&mut self, external_id: u64) -> Result<u32, AnnError> {
        if self.external_to_internal.contains_key(&external_id) {
            return Err(AnnError::invalid_argument(format!(
                "external id {external_id} already exists"
            )));
        }
        let internal_id = self.internal_to_external.len() as u32;
        self.internal_to_external.push(external_id);
        self.external_to_internal.insert(external_id, internal_id);
        Ok(internal_id)
    }

    /// Removes the external id, leaving its internal slot's reverse entry
    /// as a hole (callers that recycle slots must overwrite it via
    /// `rebind`). Fails if the id is absent.
    pub fn remove(&mut self, external_id: u64) -> Result<u32, AnnError> {
        match self.external_to_internal.remove(&external_id) {
            Some(internal_id) => Ok(internal_id),
            None => Err(AnnError::invalid_argument(format!(
                "external id {external_id} does not exist"
            ))),
        }
    }

    /// Rebinds an existing internal slot to a different external id,
    /// overwriting the reverse-lookup entry in place. Used by slot-
    /// recycling insert paths (the IVF index's `first_empty_` reuse) and
    /// by compaction when an internal index moves.
    pub fn rebind(&mut self, internal_id: u32, external_id: u64) -> Result<(), AnnError> {
        if self.external_to_internal.contains_key(&external_id) {
            return Err(AnnError::invalid_argument(format!(
                "external id {external_id} already exists"
            )));
        }
        let slot = self
            .internal_to_external
            .get_mut(internal_id as usize)
            .ok_or_else(|| {
                AnnError::invalid_argument(format!("internal id {internal_id} out of range"))
            })?;
        *slot = external_id;
        self.external_to_internal.insert(external_id, internal_id);
        Ok(())
    }

    /// Reassigns the internal id bound to `external_id` without changing
    /// the external id itself. Used by compaction, which renumbers
    /// internal slots but leaves the external namespace untouched.
    pub fn remap_internal(&mut self, external_id: u64, new_internal_id: u32) -> Result<(), AnnError> {
        let entry = self.external_to_internal.get_mut(&external_id).ok_or_else(|| {
            AnnError::invalid_argument(format!("external id {external_id} does not exist"))
        })?;
        *entry = new_internal_id;
        if new_internal_id as usize >= self.internal_to_external.len() {
            self.internal_to_external
                .resize(new_internal_id as usize + 1, 0);
        }
        self.internal_to_external[new_internal_id as usize] = external_id;
        Ok(())
    }

    /// Truncates the reverse-lookup array after compaction shrinks the
    /// number of live slots.
    pub fn truncate(&mut self, new_len: usize) {
        self.internal_to_external.truncate(new_len);
    }

    pub fn external_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.external_to_internal.keys().copied()
    }
}
