// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT license.

//! Block-allocated dense storage.
//!
//! `BlockedStore<T>` grows by appending fixed-size blocks rather than
//! reallocating and copying the whole array, so a reference into a block
//! that has already been handed out (e.g. a vector slice returned to a
//! concurrent reader) stays valid across later appends — only the growth
//! of the outer `Vec<Box<[T]>>` of block pointers needs synchronization,
//! and readers that already cloned a block pointer out are unaffected by a
//! writer appending a new block.

use serde::{Deserialize, Serialize};

const DEFAULT_BLOCK_BYTES: usize = 1 << 20;

#[derive(Serialize, Deserialize)]
pub struct BlockedStore<T> {
    blocks: Vec<Box<[T]>>,
    items_per_block: usize,
    item_len: usize,
    len: usize,
}

impl<T: Clone + Default> BlockedStore<T> {
    /// `item_len` is the number of `T` per logical item (the vector
    /// dimension). Block size is derived from `DEFAULT_BLOCK_BYTES`, never
    /// fewer than one item per block.
    pub fn new(item_len: usize) -> Self {
        let item_bytes = item_len.max(1) * std::mem::size_of::<T>();
        let items_per_block = (DEFAULT_BLOCK_BYTES / item_bytes.max(1)).max(1);
        BlockedStore {
            blocks: Vec::new(),
            items_per_block,
            item_len,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn item_len(&self) -> usize {
        self.item_len
    }

    fn ensure_capacity(&mut self, index: usize) {
        let block_idx = index / self.items_per_block;
        while self.blocks.len() <= block_idx {
            let block = vec![T::default(); self.items_per_block * self.item_len].into_boxed_slice();
            self.blocks.push(block);
        }
    }

    /// Appends one item, growing a new block if the current one is full.
    /// Returns the index assigned to it.
    pub fn push(&mut self, item: &[T]) -> usize {
        debug_assert_eq!(item.len(), self.item_len);
        let index = self.len;
        self.ensure_capacity(index);
        let (block_idx, offset) = self.locate(index);
        let block = &mut self.blocks[block_idx];
        block[offset..offset + self.item_len].clone_from_slice(item);
        self.len += 1;
        index
    }

    fn locate(&self, index: usize) -> (usize, usize) {
        let block_idx = index / self.items_per_block;
        let slot_in_block = index % self.items_per_block;
        (block_idx, slot_in_block * self.item_len)
    }

    pub fn get(&self, index: usize) -> &[T] {
        let (block_idx, offset) = self.locate(index);
        &self.blocks[block_idx][offset..offset + self.item_len]
    }

    pub fn get_mut(&mut self, index: usize) -> &mut [T] {
        let (block_idx, offset) = self.locate(index);
        &mut self.blocks[block_idx][offset..offset + self.item_len]
    }

    pub fn set(&mut self, index: usize, item: &[T]) {
        debug_assert_eq!(item.len(), self.item_len);
        self.ensure_capacity(index);
        self.get_mut(index).clone_from_slice(item);
        if index >= self.len {
            self.len = index + 1;
        }
    }

    /// Shrinks the logical length without freeing the underlying blocks
    /// (compaction reuses the freed tail on the next append).
    pub fn truncate(&mut self, new_len: usize) {
        self.len = self.len.min(new_len);
    }

    pub fn iter(&self) -> impl Iterator<Item = &[T]> {
        (0..self.len).map(move |i| self.get(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_get_round_trip_across_block_boundaries() {
        let mut store: BlockedStore<f32> = BlockedStore::new(4);
        let items_per_block = store.items_per_block;
        for i in 0..items_per_block * 3 + 2 {
            let v = vec![i as f32; 4];
            let idx = store.push(&v);
            assert_eq!(idx, i);
        }
        for i in 0..items_per_block * 3 + 2 {
            assert_eq!(store.get(i), vec![i as f32; 4].as_slice());
        }
    }

    #[test]
    fn set_beyond_current_length_extends_it() {
        let mut store: BlockedStore<f32> = BlockedStore::new(2);
        store.push(&[1.0, 2.0]);
        store.set(5, &[9.0, 9.0]);
        assert_eq!(store.len(), 6);
        assert_eq!(store.get(5), &[9.0, 9.0]);
    }

    #[test]
    fn truncate_shrinks_logical_length_only() {
        let mut store: BlockedStore<f32> = BlockedStore::new(1);
        for i in 0..10 {
            store.push(&[i as f32]);
        }
        store.truncate(4);
        assert_eq!(store.len(), 4);
        let idx = store.push(&[99.0]);
        assert_eq!(idx, 4);
    }
}
