//! Frame-level entity lists.
//!
//! A packet-entities block walks the reference frame's entities and the new
//! frame's entities together in number order and writes one record for each
//! difference:
//!
//! - an entity in both frames gets a delta, omitted when unchanged;
//! - an entity only in the new frame is encoded against its spawn baseline
//!   and always sent;
//! - an entity only in the reference frame gets a removal record.
//!
//! The block ends with the two-byte terminator. The decoder carries every
//! entity the block does not mention forward from the reference frame.

use bitstream::{BitReader, BitWriter};
use tracing::trace;

use crate::baseline::BaselineStore;
use crate::entity::{
    read_delta_entity, read_entity_header, write_delta_entity, write_entity_removal,
    write_entity_terminator, EntityBits, EntityDeltaFlags, EntityHeader,
};
use crate::error::{CodecError, CodecResult, FieldKind, FieldReason};
use crate::types::{EntityState, RF_BEAM};
use crate::variant::Capabilities;

/// What a packet-entities block contained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PacketEntitiesSummary {
    /// Entities present in both frames whose delta was written.
    pub updates: usize,
    /// Entities entering view.
    pub creates: usize,
    /// Entities leaving view.
    pub removes: usize,
    /// Entities present in both frames with nothing to send.
    pub unchanged: usize,
}

fn ensure_entities_sorted(entities: &[EntityState]) -> CodecResult<()> {
    let mut prev: Option<u16> = None;
    for entity in entities {
        if let Some(prev_number) = prev {
            if entity.number <= prev_number {
                return Err(CodecError::InvalidEntityOrder {
                    previous: prev_number,
                    current: entity.number,
                });
            }
        }
        prev = Some(entity.number);
    }
    Ok(())
}

/// Writes the entity list `to` as a delta against `from`.
///
/// Both lists must be sorted by entity number without duplicates.
pub fn write_packet_entities(
    writer: &mut BitWriter,
    from: &[EntityState],
    to: &[EntityState],
    baselines: &BaselineStore,
    caps: &Capabilities,
) -> CodecResult<PacketEntitiesSummary> {
    ensure_entities_sorted(from)?;
    ensure_entities_sorted(to)?;

    let mut summary = PacketEntitiesSummary::default();
    let mut i = 0usize;
    let mut j = 0usize;
    while i < from.len() || j < to.len() {
        match (from.get(i), to.get(j)) {
            (Some(old), Some(new)) if old.number == new.number => {
                let bits =
                    write_delta_entity(writer, Some(old), new, caps, EntityDeltaFlags::default())?;
                if bits.is_empty() {
                    summary.unchanged += 1;
                } else {
                    summary.updates += 1;
                }
                i += 1;
                j += 1;
            }
            (Some(old), Some(new)) if old.number > new.number => {
                let baseline = baselines.get(new.number);
                write_delta_entity(writer, baseline, new, caps, EntityDeltaFlags::entering())?;
                summary.creates += 1;
                j += 1;
            }
            (Some(old), _) => {
                write_entity_removal(writer, old.number, caps)?;
                summary.removes += 1;
                i += 1;
            }
            (None, Some(new)) => {
                let baseline = baselines.get(new.number);
                write_delta_entity(writer, baseline, new, caps, EntityDeltaFlags::entering())?;
                summary.creates += 1;
                j += 1;
            }
            (None, None) => break,
        }
    }
    write_entity_terminator(writer)?;

    trace!(
        updates = summary.updates,
        creates = summary.creates,
        removes = summary.removes,
        unchanged = summary.unchanged,
        "wrote packet entities"
    );
    Ok(summary)
}

/// Entity carried over unchanged: its event is cleared and, unless it is a
/// beam, its previous origin becomes the current origin.
fn carry_forward(old: &EntityState) -> EntityState {
    let mut state = old.clone();
    state.event = 0;
    if state.render_fx & RF_BEAM == 0 {
        state.old_origin = state.origin;
    }
    state
}

fn decode_present(
    reader: &mut BitReader<'_>,
    header: EntityHeader,
    base: Option<&EntityState>,
    caps: &Capabilities,
) -> CodecResult<EntityState> {
    let mut state = read_delta_entity(reader, header, base, caps)?;
    if !header.bits.contains(EntityBits::OLDORIGIN) && state.render_fx & RF_BEAM == 0 {
        state.old_origin = base.map_or([0.0; 3], |b| b.origin);
    }
    Ok(state)
}

/// Reads a packet-entities block written against `from`.
///
/// Returns the new frame's entities in number order. On error nothing in
/// `from` or `baselines` has been modified; the caller drops the frame.
pub fn read_packet_entities(
    reader: &mut BitReader<'_>,
    from: &[EntityState],
    baselines: &BaselineStore,
    caps: &Capabilities,
) -> CodecResult<Vec<EntityState>> {
    let mut result = Vec::with_capacity(from.len() + 8);
    let mut i = 0usize;
    let mut previous: Option<u16> = None;

    loop {
        let header = read_entity_header(reader)?;
        if header.is_end() {
            break;
        }
        if header.number == 0 {
            return Err(CodecError::MalformedField {
                field: FieldKind::EntityNumber,
                reason: FieldReason::Zero,
            });
        }
        if let Some(prev) = previous {
            if header.number <= prev {
                return Err(CodecError::InvalidEntityOrder {
                    previous: prev,
                    current: header.number,
                });
            }
        }
        previous = Some(header.number);

        while let Some(old) = from.get(i) {
            if old.number >= header.number {
                break;
            }
            result.push(carry_forward(old));
            i += 1;
        }

        let old = from.get(i).filter(|old| old.number == header.number);
        if old.is_some() {
            i += 1;
        }

        if header.is_remove() {
            if old.is_none() {
                return Err(CodecError::EntityNotFound {
                    number: header.number,
                });
            }
            continue;
        }

        let base = old.or_else(|| baselines.get(header.number));
        result.push(decode_present(reader, header, base, caps)?);
    }

    result.extend(from[i..].iter().map(carry_forward));

    trace!(
        entities = result.len(),
        consumed = reader.position(),
        "read packet entities"
    );
    Ok(result)
}
