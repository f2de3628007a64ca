// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT license.

use serde::{Deserialize, Serialize};

/// Per-slot lifecycle state, shared by the Vamana and IVF internal-slot
/// tables.
///
/// The Vamana index uses all three states (`Empty` only reappears after
/// compaction frees trailing slots); the IVF index only ever produces
/// `Valid` and `Empty`, since it has no soft-delete tombstone phase of its
/// own — a deleted id's slot is reclaimed immediately via `first_empty_`
/// recycling rather than marked and consolidated later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotStatus {
    /// Slot holds live data reachable from searches.
    Valid,
    /// Slot holds data that is being skipped by searches and is pending
    /// reclamation by consolidation or compaction.
    Deleted,
    /// Slot holds no data and is available for reuse.
    Empty,
}

impl SlotStatus {
    pub fn is_valid(self) -> bool {
        matches!(self, SlotStatus::Valid)
    }

    pub fn is_deleted(self) -> bool {
        matches!(self, SlotStatus::Deleted)
    }

    pub fn is_empty(self) -> bool {
        matches!(self, SlotStatus::Empty)
    }
}
