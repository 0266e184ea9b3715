use super::{Access, InputSlot};
use crate::core::ParameterSide;
use thiserror::Error;

pub const DEFAULT_NICKNAME_POOL: &str = "ABCD";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("Cannot insert a parameter at {side:?}[{index}]")]
    InsertRejected { side: ParameterSide, index: usize },

    #[error("Cannot remove the parameter at {side:?}[{index}]")]
    RemoveRejected { side: ParameterSide, index: usize },

    #[error("Slot index {index} is out of range ({len} slots)")]
    OutOfRange { index: usize, len: usize },

    #[error("Slot {0} is pinned and cannot be edited")]
    Pinned(usize),

    #[error("Nickname of slot {0} is not editable")]
    ImmutableNickname(usize),

    #[error("Nickname cannot be empty")]
    EmptyNickname,
}

/// Variable-length list of input slots.
///
/// Slot 0 is the record being extended: it can never be removed or have a slot
/// inserted before it. Every other slot is owned by the user.
#[derive(Debug, Clone)]
pub struct SlotSchema {
    slots: Vec<InputSlot>,
    nickname_pool: String,
}

impl SlotSchema {
    pub fn new(base: InputSlot) -> Self {
        Self {
            slots: vec![base],
            nickname_pool: DEFAULT_NICKNAME_POOL.to_string(),
        }
    }

    pub fn with_nickname_pool(mut self, pool: impl Into<String>) -> Self {
        self.set_nickname_pool(pool);
        self
    }

    pub fn set_nickname_pool(&mut self, pool: impl Into<String>) {
        let pool = pool.into();
        self.nickname_pool = if pool.is_empty() {
            DEFAULT_NICKNAME_POOL.to_string()
        } else {
            pool
        };
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[InputSlot] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Option<&InputSlot> {
        self.slots.get(index)
    }

    /// Mutable access for user edits. Slot 0 is not editable.
    pub fn slot_mut(&mut self, index: usize) -> Result<&mut InputSlot, SchemaError> {
        if index == 0 {
            return Err(SchemaError::Pinned(0));
        }
        let len = self.slots.len();
        self.slots
            .get_mut(index)
            .ok_or(SchemaError::OutOfRange { index, len })
    }

    /// Slots after the base slot, with their indices
    pub fn user_slots(&self) -> impl Iterator<Item = (usize, &InputSlot)> {
        self.slots.iter().enumerate().skip(1)
    }

    pub fn all_user_slots_optional(&self) -> bool {
        self.slots.len() > 1 && self.user_slots().all(|(_, slot)| slot.optional)
    }

    pub fn can_insert(&self, side: ParameterSide, index: usize) -> bool {
        side == ParameterSide::Input && index != 0
    }

    pub fn can_remove(&self, side: ParameterSide, index: usize) -> bool {
        side == ParameterSide::Input && index != 0
    }

    /// Build a fresh user slot with a name that collides with no existing slot
    pub fn create_slot(&self, _side: ParameterSide, _index: usize) -> InputSlot {
        let name = self.invent_unique_nickname();
        InputSlot::new(name.clone(), name)
            .with_access(Access::Item)
            .optional(false)
            .mutable_nickname(true)
    }

    pub fn insert(&mut self, index: usize, slot: InputSlot) -> Result<(), SchemaError> {
        if !self.can_insert(ParameterSide::Input, index) {
            return Err(SchemaError::InsertRejected {
                side: ParameterSide::Input,
                index,
            });
        }
        if index > self.slots.len() {
            return Err(SchemaError::OutOfRange {
                index,
                len: self.slots.len(),
            });
        }
        tracing::debug!(index, name = %slot.name, "inserting input slot");
        self.slots.insert(index, slot);
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<InputSlot, SchemaError> {
        if !self.can_remove(ParameterSide::Input, index) {
            return Err(SchemaError::RemoveRejected {
                side: ParameterSide::Input,
                index,
            });
        }
        if index >= self.slots.len() {
            return Err(SchemaError::OutOfRange {
                index,
                len: self.slots.len(),
            });
        }
        let slot = self.slots.remove(index);
        tracing::debug!(index, name = %slot.name, "removed input slot");
        Ok(slot)
    }

    /// Editor gesture: create a slot and insert it at `index`
    pub fn add_slot(&mut self, side: ParameterSide, index: usize) -> Result<&InputSlot, SchemaError> {
        if !self.can_insert(side, index) {
            return Err(SchemaError::InsertRejected { side, index });
        }
        let slot = self.create_slot(side, index);
        self.insert(index, slot)?;
        Ok(&self.slots[index])
    }

    pub fn rename(&mut self, index: usize, nickname: impl Into<String>) -> Result<(), SchemaError> {
        let nickname = nickname.into();
        if nickname.is_empty() {
            return Err(SchemaError::EmptyNickname);
        }
        let slot = self.slot_mut(index)?;
        if !slot.mutable_nickname {
            return Err(SchemaError::ImmutableNickname(index));
        }
        slot.nickname = nickname;
        Ok(())
    }

    /// Host cleanup hook after a removal; nothing to release
    pub fn destroy(&mut self, _side: ParameterSide, _index: usize) -> bool {
        true
    }

    pub fn maintenance(&mut self) {
        tracing::trace!(slots = self.slots.len(), "variable parameter maintenance");
    }

    fn invent_unique_nickname(&self) -> String {
        let taken = |candidate: &str| {
            self.slots.iter().any(|slot| {
                slot.name.eq_ignore_ascii_case(candidate)
                    || slot.nickname.eq_ignore_ascii_case(candidate)
            })
        };

        // Bounded by slot count: at most `len` names can be taken per round
        for round in 0..=self.slots.len() {
            for letter in self.nickname_pool.chars() {
                let candidate = if round == 0 {
                    letter.to_string()
                } else {
                    format!("{letter}{round}")
                };
                if !taken(&candidate) {
                    return candidate;
                }
            }
        }

        format!("P{}", self.slots.len())
    }
}
