//! Obstructions placed on road segments

use std::collections::HashMap;
use std::time::SystemTime;

use super::types::{BlockId, SegmentId, SimId};

/// An obstruction on a segment
#[derive(Debug, Clone)]
pub struct Block {
    pub id: BlockId,
    pub segment_id: SegmentId,
    pub created_at: SystemTime,
    /// Distance along the segment, `None` when the block covers the whole segment
    pub distance: Option<f64>,
}

impl Block {
    /// Where vehicles meet this block, given the segment's total length
    pub fn distance_or(&self, total_length: f64) -> f64 {
        self.distance.unwrap_or(total_length).clamp(0.0, total_length)
    }
}

/// Every block currently placed, indexed by segment
#[derive(Debug, Default)]
pub struct BlockRegistry {
    blocks: HashMap<BlockId, Block>,
    by_segment: HashMap<SegmentId, Vec<BlockId>>,
    next_id: usize,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, segment_id: SegmentId, distance: Option<f64>) -> BlockId {
        let id = BlockId(SimId(self.next_id));
        self.next_id += 1;

        self.blocks.insert(
            id,
            Block {
                id,
                segment_id,
                created_at: SystemTime::now(),
                distance,
            },
        );
        self.by_segment.entry(segment_id).or_default().push(id);
        id
    }

    pub fn is_blocked(&self, segment_id: SegmentId) -> bool {
        self.by_segment
            .get(&segment_id)
            .is_some_and(|ids| !ids.is_empty())
    }

    /// Blocks on a segment in placement order
    pub fn on_segment(&self, segment_id: SegmentId) -> impl Iterator<Item = &Block> + '_ {
        self.by_segment
            .get(&segment_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.blocks.get(id))
    }

    pub fn get(&self, block_id: BlockId) -> Option<&Block> {
        self.blocks.get(&block_id)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
        self.by_segment.clear();
    }

    /// Drops blocks whose segment fails `keep`
    pub fn retain_segments(&mut self, mut keep: impl FnMut(SegmentId) -> bool) {
        self.by_segment.retain(|segment_id, _| keep(*segment_id));
        let by_segment = &self.by_segment;
        self.blocks
            .retain(|_, block| by_segment.contains_key(&block.segment_id));
    }
}
