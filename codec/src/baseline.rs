//! Spawn baselines and frame history.
//!
//! Two kinds of reference state feed the delta encoder:
//!
//! - [`BaselineStore`]: one spawn state per entity slot, sent once when a
//!   client connects and used as the reference for entities entering view.
//! - [`FrameHistory`]: a ring of recently sent frames keyed by
//!   [`FrameNumber`], used as the reference for the next frame once the
//!   client acknowledges one of them.

use std::fmt;
use std::num::NonZeroUsize;

use bitstream::{BitReader, BitWriter};

use crate::entity::{read_delta_entity, read_entity_header, write_delta_entity, EntityDeltaFlags};
use crate::error::{CodecError, CodecResult, FieldKind, FieldReason};
use crate::types::{EntityState, FrameNumber};
use crate::variant::Capabilities;

/// Frames kept by a default [`FrameHistory`].
pub const UPDATE_BACKUP: usize = 16;

/// Per-slot spawn baselines.
#[derive(Debug, Clone)]
pub struct BaselineStore {
    slots: Vec<Option<EntityState>>,
    len: usize,
}

impl BaselineStore {
    /// Creates a store for entity numbers `1..max_entities`.
    #[must_use]
    pub fn new(max_entities: u16) -> Self {
        let mut slots = Vec::with_capacity(usize::from(max_entities));
        slots.resize_with(usize::from(max_entities), || None);
        Self { slots, len: 0 }
    }

    /// Creates a store sized for `caps`.
    #[must_use]
    pub fn for_variant(caps: &Capabilities) -> Self {
        Self::new(caps.limits.max_entities)
    }

    /// Returns the number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of stored baselines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no baseline is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the baseline for entity `number`.
    #[must_use]
    pub fn get(&self, number: u16) -> Option<&EntityState> {
        self.slots.get(usize::from(number))?.as_ref()
    }

    /// Stores `state` as the baseline for its slot, returning the previous one.
    pub fn insert(&mut self, state: EntityState) -> CodecResult<Option<EntityState>> {
        let number = state.number;
        if number == 0 {
            return Err(CodecError::MalformedField {
                field: FieldKind::EntityNumber,
                reason: FieldReason::Zero,
            });
        }
        let capacity = self.slots.len();
        let slot = self.slots.get_mut(usize::from(number)).ok_or_else(|| {
            CodecError::out_of_range(
                FieldKind::EntityNumber,
                i64::from(number),
                1,
                i64::try_from(capacity).unwrap_or(i64::MAX) - 1,
            )
        })?;
        let previous = slot.replace(state);
        if previous.is_none() {
            self.len += 1;
        }
        Ok(previous)
    }

    /// Removes the baseline for entity `number`.
    pub fn remove(&mut self, number: u16) -> Option<EntityState> {
        let removed = self.slots.get_mut(usize::from(number))?.take();
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    /// Removes every baseline.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.len = 0;
    }

    /// Iterates stored baselines in entity-number order.
    pub fn iter(&self) -> impl Iterator<Item = &EntityState> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    /// Reads one baseline record and stores it.
    ///
    /// The store is only modified when the whole record decodes.
    pub fn read_baseline(
        &mut self,
        reader: &mut BitReader<'_>,
        caps: &Capabilities,
    ) -> CodecResult<u16> {
        let header = read_entity_header(reader)?;
        let state = read_delta_entity(reader, header, None, caps)?;
        self.insert(state)?;
        Ok(header.number)
    }
}

/// Writes `state` as a spawn baseline: a forced delta from the default state.
pub fn write_baseline(
    writer: &mut BitWriter,
    state: &EntityState,
    caps: &Capabilities,
) -> CodecResult<()> {
    write_delta_entity(writer, None, state, caps, EntityDeltaFlags::baseline())?;
    Ok(())
}

/// Errors that can occur when inserting into a frame history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryError {
    /// Frame numbers must be strictly increasing.
    OutOfOrder {
        last_frame: FrameNumber,
        new_frame: FrameNumber,
    },
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfOrder {
                last_frame,
                new_frame,
            } => write!(
                f,
                "frame {} is not newer than frame {}",
                new_frame.raw(),
                last_frame.raw()
            ),
        }
    }
}

impl std::error::Error for HistoryError {}

/// Backup of recently sent or received frames.
///
/// Frame `n` lives in slot `n % capacity`. A lookup hits only when the slot
/// still holds that exact frame number and the frame is inside the window
/// ending at the newest frame.
#[derive(Debug)]
pub struct FrameHistory<T> {
    slots: Vec<Option<Slot<T>>>,
    newest: Option<FrameNumber>,
}

#[derive(Debug)]
struct Slot<T> {
    frame: FrameNumber,
    value: T,
}

impl<T> Default for FrameHistory<T> {
    fn default() -> Self {
        Self::new(NonZeroUsize::MIN.saturating_add(UPDATE_BACKUP - 1))
    }
}

impl<T> FrameHistory<T> {
    /// Creates a history holding up to `capacity` frames.
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        let mut slots = Vec::with_capacity(capacity.get());
        slots.resize_with(capacity.get(), || None);
        Self {
            slots,
            newest: None,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of frames still inside the window.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .flatten()
            .filter(|slot| self.in_window(slot.frame))
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.newest.is_none()
    }

    /// Stores `value` as frame `frame`, replacing whatever shared its slot.
    ///
    /// Frame numbers must be strictly increasing.
    pub fn insert(&mut self, frame: FrameNumber, value: T) -> Result<(), HistoryError> {
        if let Some(last) = self.newest {
            if frame <= last {
                return Err(HistoryError::OutOfOrder {
                    last_frame: last,
                    new_frame: frame,
                });
            }
        }
        let idx = self.slot_index(frame);
        self.slots[idx] = Some(Slot { frame, value });
        self.newest = Some(frame);
        Ok(())
    }

    /// Returns frame `frame` if its slot still holds it.
    #[must_use]
    pub fn get(&self, frame: FrameNumber) -> Option<&T> {
        if !self.in_window(frame) {
            return None;
        }
        match &self.slots[self.slot_index(frame)] {
            Some(slot) if slot.frame == frame => Some(&slot.value),
            _ => None,
        }
    }

    /// Forgets every frame, including the ordering watermark.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.newest = None;
    }

    fn slot_index(&self, frame: FrameNumber) -> usize {
        frame.raw() as usize % self.slots.len()
    }

    fn in_window(&self, frame: FrameNumber) -> bool {
        self.newest.is_some_and(|newest| {
            frame <= newest && ((newest.raw() - frame.raw()) as usize) < self.slots.len()
        })
    }
}

/// Picks the reference frame for the next delta.
///
/// Returns the acknowledged frame when it is still in `history`; `None`
/// means the next frame must be encoded against the default state.
#[must_use]
pub fn select_delta_frame<T>(
    history: &FrameHistory<T>,
    acked: FrameNumber,
) -> Option<FrameNumber> {
    if acked.is_zero() {
        return None;
    }
    history.get(acked).map(|_| acked)
}
