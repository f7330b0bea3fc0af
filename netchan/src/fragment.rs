//! Message splitting and reassembly.

use crate::error::DropReason;
use crate::header::FragmentHeader;

/// Splits `payload` into consecutive fragments of at most `capacity` bytes.
///
/// Yields `ceil(payload.len() / capacity)` fragments. The caller guarantees
/// `capacity > 0` and that the payload length fits a `u16`.
pub fn split(payload: &[u8], capacity: usize) -> impl Iterator<Item = (FragmentHeader, &[u8])> {
    let capacity = capacity.max(1);
    #[allow(clippy::cast_possible_truncation)]
    let total_len = payload.len() as u16;
    let count = payload.len().div_ceil(capacity);
    payload
        .chunks(capacity)
        .enumerate()
        .map(move |(index, chunk)| {
            #[allow(clippy::cast_possible_truncation)]
            let offset = (index * capacity) as u16;
            let header = FragmentHeader {
                offset,
                total_len,
                is_last: index + 1 == count,
            };
            (header, chunk)
        })
}

/// Receive-side buffer for one fragmented message at a time.
///
/// Fragments must arrive in order; any inconsistency aborts the message.
#[derive(Debug, Default)]
pub struct Reassembly {
    sequence: Option<u32>,
    total_len: usize,
    buf: Vec<u8>,
}

impl Reassembly {
    /// Creates an empty reassembly area.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence of the message currently being assembled.
    #[must_use]
    pub const fn sequence(&self) -> Option<u32> {
        self.sequence
    }

    /// Bytes assembled so far.
    #[must_use]
    pub fn assembled_len(&self) -> usize {
        self.buf.len()
    }

    /// Discards any partially assembled message.
    pub fn reset(&mut self) {
        self.sequence = None;
        self.total_len = 0;
        self.buf.clear();
    }

    /// Adds one fragment.
    ///
    /// Returns the complete message when `header.is_last` closes it, `None`
    /// while more fragments are expected. On error the partial message is
    /// discarded.
    pub fn accept(
        &mut self,
        sequence: u32,
        header: FragmentHeader,
        data: &[u8],
        max_message_len: usize,
    ) -> Result<Option<Vec<u8>>, DropReason> {
        match self.try_accept(sequence, header, data, max_message_len) {
            Ok(false) => Ok(None),
            Ok(true) => {
                let buf = std::mem::take(&mut self.buf);
                self.reset();
                Ok(Some(buf))
            }
            Err(reason) => {
                self.reset();
                Err(reason)
            }
        }
    }

    fn try_accept(
        &mut self,
        sequence: u32,
        header: FragmentHeader,
        data: &[u8],
        max_message_len: usize,
    ) -> Result<bool, DropReason> {
        let total_len = usize::from(header.total_len);
        if self.sequence != Some(sequence) {
            self.reset();
            if total_len > max_message_len {
                return Err(DropReason::FragmentTooLarge);
            }
            self.sequence = Some(sequence);
            self.total_len = total_len;
        }
        if total_len != self.total_len {
            return Err(DropReason::FragmentTotalMismatch);
        }
        if usize::from(header.offset) != self.buf.len() {
            return Err(DropReason::FragmentOutOfOrder);
        }
        if self.buf.len() + data.len() > self.total_len {
            return Err(DropReason::FragmentBeyondTotal);
        }
        self.buf.extend_from_slice(data);
        if !header.is_last {
            return Ok(false);
        }
        if self.buf.len() != self.total_len {
            return Err(DropReason::FragmentIncomplete);
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 % 256) as u8).collect()
    }

    #[test]
    fn split_counts_and_offsets() {
        let data = payload(250);
        let parts: Vec<_> = split(&data, 100).collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].0.offset, 0);
        assert_eq!(parts[1].0.offset, 100);
        assert_eq!(parts[2].0.offset, 200);
        assert_eq!(parts[2].1.len(), 50);
        assert!(parts.iter().all(|(h, _)| h.total_len == 250));
        assert_eq!(
            parts.iter().map(|(h, _)| h.is_last).collect::<Vec<_>>(),
            vec![false, false, true]
        );
    }

    #[test]
    fn split_exact_multiple() {
        let data = payload(200);
        assert_eq!(split(&data, 100).count(), 2);
    }

    #[test]
    fn reassemble_in_order() {
        let data = payload(250);
        let mut reassembly = Reassembly::new();
        let mut out = None;
        for (header, chunk) in split(&data, 100) {
            out = reassembly.accept(5, header, chunk, 1024).unwrap();
        }
        assert_eq!(out, Some(data));
        assert_eq!(reassembly.sequence(), None);
    }

    #[test]
    fn missing_middle_fragment_aborts() {
        let data = payload(250);
        let parts: Vec<_> = split(&data, 100).collect();
        let mut reassembly = Reassembly::new();
        assert_eq!(reassembly.accept(5, parts[0].0, parts[0].1, 1024), Ok(None));
        assert_eq!(
            reassembly.accept(5, parts[2].0, parts[2].1, 1024),
            Err(DropReason::FragmentOutOfOrder)
        );
        assert_eq!(reassembly.assembled_len(), 0);
    }

    #[test]
    fn offset_beyond_total_aborts() {
        let mut reassembly = Reassembly::new();
        let header = FragmentHeader {
            offset: 0,
            total_len: 4,
            is_last: false,
        };
        assert_eq!(
            reassembly.accept(1, header, &[0; 8], 1024),
            Err(DropReason::FragmentBeyondTotal)
        );
    }

    #[test]
    fn early_final_fragment_aborts() {
        let mut reassembly = Reassembly::new();
        let header = FragmentHeader {
            offset: 0,
            total_len: 8,
            is_last: true,
        };
        assert_eq!(
            reassembly.accept(1, header, &[0; 4], 1024),
            Err(DropReason::FragmentIncomplete)
        );
    }

    #[test]
    fn total_mismatch_aborts() {
        let mut reassembly = Reassembly::new();
        let first = FragmentHeader {
            offset: 0,
            total_len: 8,
            is_last: false,
        };
        let second = FragmentHeader {
            offset: 4,
            total_len: 12,
            is_last: true,
        };
        assert_eq!(reassembly.accept(1, first, &[0; 4], 1024), Ok(None));
        assert_eq!(
            reassembly.accept(1, second, &[0; 4], 1024),
            Err(DropReason::FragmentTotalMismatch)
        );
    }

    #[test]
    fn oversized_total_rejected() {
        let mut reassembly = Reassembly::new();
        let header = FragmentHeader {
            offset: 0,
            total_len: 2000,
            is_last: false,
        };
        assert_eq!(
            reassembly.accept(1, header, &[0; 4], 1024),
            Err(DropReason::FragmentTooLarge)
        );
    }

    #[test]
    fn newer_sequence_restarts() {
        let mut reassembly = Reassembly::new();
        let first = FragmentHeader {
            offset: 0,
            total_len: 8,
            is_last: false,
        };
        assert_eq!(reassembly.accept(1, first, &[1; 4], 1024), Ok(None));
        assert_eq!(reassembly.accept(2, first, &[2; 4], 1024), Ok(None));
        assert_eq!(reassembly.sequence(), Some(2));
        let last = FragmentHeader {
            offset: 4,
            total_len: 8,
            is_last: true,
        };
        assert_eq!(
            reassembly.accept(2, last, &[3; 4], 1024),
            Ok(Some(vec![2, 2, 2, 2, 3, 3, 3, 3]))
        );
    }
}
