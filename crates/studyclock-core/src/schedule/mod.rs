//! Schedule data model.
//!
//! A [`Schedule`] is an ordered list of [`Block`]s. The order is the
//! playback order of the session engine, so every editing helper here
//! keeps the relative order of the blocks it does not touch.

mod samples;

pub use samples::sample_schedules;

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

pub const DEFAULT_SCHEDULE_NAME: &str = "New Schedule";
pub const DEFAULT_SCHEDULE_COLOR: &str = "#5b8dee";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Study,
    Break,
}

impl BlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Study => "study",
            BlockKind::Break => "break",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "study" => Some(BlockKind::Study),
            "break" => Some(BlockKind::Break),
            _ => None,
        }
    }
}

/// One timed unit of a schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    pub name: String,
    pub kind: BlockKind,
    /// Wall-clock hint such as "06:00". Never enforced.
    #[serde(default)]
    pub start_time: String,
    /// Planned length in minutes.
    pub duration_min: u32,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub notes: String,
}

impl Block {
    pub fn duration_secs(&self) -> u64 {
        u64::from(self.duration_min) * 60
    }

    pub fn is_break(&self) -> bool {
        self.kind == BlockKind::Break
    }
}

/// A block as submitted by a caller, possibly without an id yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDraft {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub kind: BlockKind,
    #[serde(default)]
    pub start_time: String,
    pub duration_min: u32,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub notes: String,
}

impl BlockDraft {
    pub fn study(name: &str, subject: &str, duration_min: u32) -> Self {
        Self {
            id: None,
            name: name.into(),
            kind: BlockKind::Study,
            start_time: String::new(),
            duration_min,
            subject: subject.into(),
            notes: String::new(),
        }
    }

    pub fn rest(name: &str, duration_min: u32) -> Self {
        Self {
            id: None,
            name: name.into(),
            kind: BlockKind::Break,
            start_time: String::new(),
            duration_min,
            subject: String::new(),
            notes: String::new(),
        }
    }

    /// Turn the draft into a block, generating an id when it has none.
    pub fn into_block(self) -> Block {
        let id = match self.id {
            Some(id) if !id.trim().is_empty() => id,
            _ => new_block_id(),
        };
        Block {
            id,
            name: self.name,
            kind: self.kind,
            start_time: self.start_time,
            duration_min: self.duration_min,
            subject: self.subject,
            notes: self.notes,
        }
    }
}

impl From<Block> for BlockDraft {
    fn from(block: Block) -> Self {
        Self {
            id: Some(block.id),
            name: block.name,
            kind: block.kind,
            start_time: block.start_time,
            duration_min: block.duration_min,
            subject: block.subject,
            notes: block.notes,
        }
    }
}

/// Input for creating a schedule.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub blocks: Vec<BlockDraft>,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub blocks: Option<Vec<BlockDraft>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub blocks: Vec<Block>,
}

impl Schedule {
    /// Build a fresh schedule with new ids for the schedule and for every
    /// block that lacks one.
    pub fn from_draft(
        owner_id: &str,
        draft: ScheduleDraft,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let name = match draft.name.trim() {
            "" => DEFAULT_SCHEDULE_NAME.to_string(),
            trimmed => trimmed.to_string(),
        };
        let blocks: Vec<Block> = draft.blocks.into_iter().map(BlockDraft::into_block).collect();
        validate_blocks(&blocks)?;
        Ok(Self {
            id: format!("sch_{}", Uuid::new_v4().simple()),
            owner_id: owner_id.to_string(),
            name,
            description: draft.description.trim().to_string(),
            color: draft
                .color
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SCHEDULE_COLOR.to_string()),
            created_at: now,
            updated_at: now,
            blocks,
        })
    }

    /// Merge a patch into this schedule. `created_at` is never touched.
    pub fn apply(&mut self, patch: SchedulePatch, now: DateTime<Utc>) -> Result<(), ValidationError> {
        if let Some(blocks) = patch.blocks {
            let blocks: Vec<Block> = blocks.into_iter().map(BlockDraft::into_block).collect();
            validate_blocks(&blocks)?;
            self.blocks = blocks;
        }
        if let Some(name) = patch.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(ValidationError::InvalidValue {
                    field: "name".into(),
                    message: "schedule name cannot be blank".into(),
                });
            }
            self.name = name.to_string();
        }
        if let Some(description) = patch.description {
            self.description = description.trim().to_string();
        }
        if let Some(color) = patch.color {
            self.color = color;
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn block(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    pub fn next_block(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index.checked_add(1)?)
    }

    pub fn total_minutes(&self) -> u64 {
        self.blocks.iter().map(|b| u64::from(b.duration_min)).sum()
    }

    pub fn study_count(&self) -> usize {
        self.blocks.iter().filter(|b| b.kind == BlockKind::Study).count()
    }

    // ── Block editing ────────────────────────────────────────────────

    pub fn push_block(&mut self, draft: BlockDraft) -> Result<&Block, ValidationError> {
        let block = draft.into_block();
        validate_block(&block)?;
        self.ensure_unique_id(&block.id, None)?;
        self.blocks.push(block);
        Ok(&self.blocks[self.blocks.len() - 1])
    }

    /// Insert before position `at`; `at == len` appends.
    pub fn insert_block(&mut self, at: usize, draft: BlockDraft) -> Result<&Block, ValidationError> {
        if at > self.blocks.len() {
            return Err(self.out_of_bounds(at));
        }
        let block = draft.into_block();
        validate_block(&block)?;
        self.ensure_unique_id(&block.id, None)?;
        self.blocks.insert(at, block);
        Ok(&self.blocks[at])
    }

    pub fn remove_block(&mut self, index: usize) -> Result<Block, ValidationError> {
        if index >= self.blocks.len() {
            return Err(self.out_of_bounds(index));
        }
        Ok(self.blocks.remove(index))
    }

    /// Move the block at `from` so that it ends up at position `to`.
    ///
    /// Moving by one position is a swap with the neighbour; longer moves
    /// shift the blocks in between by one.
    pub fn move_block(&mut self, from: usize, to: usize) -> Result<(), ValidationError> {
        let len = self.blocks.len();
        if from >= len {
            return Err(self.out_of_bounds(from));
        }
        if to >= len {
            return Err(self.out_of_bounds(to));
        }
        let block = self.blocks.remove(from);
        self.blocks.insert(to, block);
        Ok(())
    }

    /// Replace the block at `index`, keeping its id when the draft has none.
    pub fn replace_block(&mut self, index: usize, mut draft: BlockDraft) -> Result<Block, ValidationError> {
        let Some(existing) = self.blocks.get(index) else {
            return Err(self.out_of_bounds(index));
        };
        if draft.id.is_none() {
            draft.id = Some(existing.id.clone());
        }
        let block = draft.into_block();
        validate_block(&block)?;
        self.ensure_unique_id(&block.id, Some(index))?;
        Ok(std::mem::replace(&mut self.blocks[index], block))
    }

    /// Fail if another block, other than the one at `skip`, already uses `id`.
    fn ensure_unique_id(&self, id: &str, skip: Option<usize>) -> Result<(), ValidationError> {
        let taken = self
            .blocks
            .iter()
            .enumerate()
            .any(|(i, b)| Some(i) != skip && b.id == id);
        if taken {
            return Err(duplicate_id(id));
        }
        Ok(())
    }

    fn out_of_bounds(&self, index: usize) -> ValidationError {
        ValidationError::OutOfBounds {
            collection: "blocks".into(),
            index,
            len: self.blocks.len(),
        }
    }
}

pub(crate) fn new_block_id() -> String {
    format!("b_{}", Uuid::new_v4().simple())
}

fn validate_block(block: &Block) -> Result<(), ValidationError> {
    if block.duration_min == 0 {
        return Err(ValidationError::InvalidValue {
            field: "duration_min".into(),
            message: format!("block '{}' must last at least one minute", block.name),
        });
    }
    Ok(())
}

fn duplicate_id(id: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: "id".into(),
        message: format!("block id '{id}' is used more than once"),
    }
}

fn validate_blocks(blocks: &[Block]) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(blocks.len());
    for block in blocks {
        validate_block(block)?;
        if !seen.insert(block.id.as_str()) {
            return Err(duplicate_id(&block.id));
        }
    }
    Ok(())
}
