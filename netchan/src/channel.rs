//! Per-connection sequencing, reliability and fragmentation.

use bitstream::{BitReader, BitWriter};
use tracing::{debug, trace};

use crate::config::{ChannelConfig, NetSource};
use crate::error::{ChannelError, ChannelResult, DropReason};
use crate::fragment::{self, Reassembly};
use crate::header::PacketHeader;
use crate::sequence::SequenceSpace;

/// Counters describing what a channel has dropped or resent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    /// Sequences skipped by the most recently accepted datagram.
    pub last_dropped: u32,
    /// Sequences skipped over the channel's lifetime.
    pub total_dropped: u64,
    /// Datagrams rejected as stale or duplicate.
    pub stale: u64,
    /// Datagrams whose header could not be parsed.
    pub malformed: u64,
    /// Fragmented messages abandoned because of an inconsistent fragment.
    pub fragments_aborted: u64,
    /// Unreliable payloads discarded for lack of room.
    pub unreliable_dumped: u64,
    /// Times the in-flight reliable payload was sent again.
    pub reliable_retransmits: u64,
}

/// Outcome of processing one incoming datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// A complete message for the codec.
    Payload(Vec<u8>),
    /// A fragment was buffered; the message is not complete yet.
    Pending,
    /// The datagram was discarded without changing sequencing state.
    Dropped(DropReason),
}

impl Received {
    /// Returns the payload of a completed message.
    #[must_use]
    pub fn into_payload(self) -> Option<Vec<u8>> {
        match self {
            Self::Payload(payload) => Some(payload),
            Self::Pending | Self::Dropped(_) => None,
        }
    }
}

/// One direction-pair of a connection.
///
/// Holds at most one reliable payload in flight. Further reliable data is
/// staged with [`queue_reliable`](Self::queue_reliable) and goes out only
/// after the peer acknowledges the in-flight payload.
#[derive(Debug)]
pub struct Channel {
    config: ChannelConfig,
    space: SequenceSpace,
    qport: u16,
    remote_qport: Option<u16>,

    outgoing_sequence: u32,
    incoming_sequence: u32,
    incoming_acknowledged: u32,
    incoming_reliable_acknowledged: bool,
    incoming_reliable_sequence: bool,
    reliable_sequence: bool,
    last_reliable_sequence: u32,

    /// Reliable bytes waiting for the in-flight slot.
    pending: Vec<u8>,
    /// The unacknowledged reliable payload.
    reliable: Vec<u8>,
    reassembly: Reassembly,
    stats: ChannelStats,
}

impl Channel {
    /// Creates a channel. `qport` is written on client datagrams only.
    #[must_use]
    pub fn new(config: ChannelConfig, qport: u16) -> Self {
        let space = config.sequence_space();
        Self {
            config,
            space,
            qport,
            remote_qport: None,
            outgoing_sequence: 1,
            incoming_sequence: 0,
            incoming_acknowledged: 0,
            incoming_reliable_acknowledged: false,
            incoming_reliable_sequence: false,
            reliable_sequence: false,
            last_reliable_sequence: 0,
            pending: Vec::new(),
            reliable: Vec::new(),
            reassembly: Reassembly::new(),
            stats: ChannelStats::default(),
        }
    }

    /// Returns the channel configuration.
    #[must_use]
    pub const fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Sequence the next outgoing datagram will carry.
    #[must_use]
    pub const fn outgoing_sequence(&self) -> u32 {
        self.outgoing_sequence
    }

    /// Newest sequence accepted from the peer.
    #[must_use]
    pub const fn incoming_sequence(&self) -> u32 {
        self.incoming_sequence
    }

    /// Newest of our sequences the peer has acknowledged.
    #[must_use]
    pub const fn incoming_acknowledged(&self) -> u32 {
        self.incoming_acknowledged
    }

    /// Qport read from the most recent client datagram (servers only).
    #[must_use]
    pub const fn remote_qport(&self) -> Option<u16> {
        self.remote_qport
    }

    /// Returns the drop and retransmit counters.
    #[must_use]
    pub const fn stats(&self) -> &ChannelStats {
        &self.stats
    }

    /// Returns `true` while a reliable payload awaits acknowledgement.
    #[must_use]
    pub fn has_reliable_in_flight(&self) -> bool {
        !self.reliable.is_empty()
    }

    /// Bytes staged behind the in-flight reliable payload.
    #[must_use]
    pub fn pending_reliable_len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if the peer has acknowledged a datagram sent after the
    /// in-flight reliable payload without flipping its reliable toggle, which
    /// means the payload was lost.
    #[must_use]
    pub fn needs_reliable_resend(&self) -> bool {
        !self.reliable.is_empty()
            && self
                .space
                .is_newer(self.incoming_acknowledged, self.last_reliable_sequence)
            && self.incoming_reliable_acknowledged != self.reliable_sequence
    }

    /// Stages reliable bytes for the next free reliable slot.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::ReliableOverflow`] if the staged bytes would
    /// exceed one message. Nothing is queued in that case.
    pub fn queue_reliable(&mut self, data: &[u8]) -> ChannelResult<()> {
        let capacity = self.config.message_capacity();
        let needed = self.pending.len() + data.len();
        if needed > capacity {
            return Err(ChannelError::ReliableOverflow { needed, capacity });
        }
        self.pending.extend_from_slice(data);
        Ok(())
    }

    /// Sends `payload` reliably or unreliably and returns the datagrams to
    /// put on the wire.
    pub fn send(&mut self, payload: &[u8], reliable: bool) -> ChannelResult<Vec<Vec<u8>>> {
        if reliable {
            self.queue_reliable(payload)?;
            self.transmit(&[])
        } else {
            self.transmit(payload)
        }
    }

    /// Builds the datagrams for one outgoing message.
    ///
    /// Reliable data (a retransmission or newly promoted staged bytes) goes
    /// first; `unreliable` follows if it fits and is dumped otherwise. A
    /// message larger than one datagram is fragmented when the configuration
    /// allows it. Every call consumes exactly one sequence number, even when
    /// the message is empty.
    pub fn transmit(&mut self, unreliable: &[u8]) -> ChannelResult<Vec<Vec<u8>>> {
        let capacity = self.config.message_capacity();

        let mut send_reliable = self.needs_reliable_resend();
        if send_reliable {
            self.stats.reliable_retransmits += 1;
            debug!(
                sequence = self.outgoing_sequence,
                previous = self.last_reliable_sequence,
                len = self.reliable.len(),
                "retransmitting reliable payload"
            );
        }
        if self.reliable.is_empty() && !self.pending.is_empty() {
            std::mem::swap(&mut self.reliable, &mut self.pending);
            self.reliable_sequence = !self.reliable_sequence;
            send_reliable = true;
        }

        let mut payload = Vec::with_capacity(capacity.min(self.config.max_packet_len));
        if send_reliable {
            payload.extend_from_slice(&self.reliable);
            self.last_reliable_sequence = self.outgoing_sequence;
        }
        if payload.len() + unreliable.len() <= capacity {
            payload.extend_from_slice(unreliable);
        } else {
            self.stats.unreliable_dumped += 1;
            debug!(
                sequence = self.outgoing_sequence,
                len = unreliable.len(),
                reliable_len = payload.len(),
                "dumped unreliable payload"
            );
        }

        let header = PacketHeader {
            sequence: self.outgoing_sequence,
            reliable: send_reliable,
            ack: self.incoming_sequence,
            ack_reliable: self.incoming_reliable_sequence,
            qport: (self.config.role == NetSource::Client).then_some(self.qport),
            fragment: None,
        };

        let datagrams = if payload.len() <= self.config.datagram_capacity() {
            vec![self.frame(&header, &payload)?]
        } else if self.config.fragmentation && self.config.fragment_capacity() > 0 {
            fragment::split(&payload, self.config.fragment_capacity())
                .map(|(fragment, chunk)| {
                    let header = PacketHeader {
                        fragment: Some(fragment),
                        ..header
                    };
                    self.frame(&header, chunk)
                })
                .collect::<ChannelResult<Vec<_>>>()?
        } else {
            return Err(ChannelError::MessageTooLarge {
                len: payload.len(),
                capacity: self.config.datagram_capacity(),
            });
        };

        trace!(
            sequence = self.outgoing_sequence,
            reliable = send_reliable,
            len = payload.len(),
            datagrams = datagrams.len(),
            "transmit"
        );
        self.outgoing_sequence = self.space.next(self.outgoing_sequence);
        Ok(datagrams)
    }

    /// Processes a datagram and returns the completed message, if any.
    pub fn receive(&mut self, datagram: &[u8]) -> Option<Vec<u8>> {
        self.process(datagram).into_payload()
    }

    /// Processes a datagram and reports exactly what happened to it.
    ///
    /// Dropped datagrams leave sequencing and reliability state untouched.
    pub fn process(&mut self, datagram: &[u8]) -> Received {
        let mut reader = BitReader::new(datagram);
        let header = match PacketHeader::decode(&mut reader, &self.config) {
            Ok(header) => header,
            Err(err) => {
                self.stats.malformed += 1;
                debug!(len = datagram.len(), error = %err, "dropping malformed datagram");
                return Received::Dropped(DropReason::Malformed);
            }
        };

        if !self.space.is_newer(header.sequence, self.incoming_sequence) {
            self.stats.stale += 1;
            debug!(
                sequence = header.sequence,
                incoming = self.incoming_sequence,
                "dropping stale or duplicate datagram"
            );
            return Received::Dropped(DropReason::Stale);
        }

        let body = reader.remaining_slice();
        let payload = match header.fragment {
            None => body.to_vec(),
            Some(fragment) => {
                let max = self.config.message_capacity();
                match self.reassembly.accept(header.sequence, fragment, body, max) {
                    Ok(Some(payload)) => payload,
                    Ok(None) => {
                        trace!(
                            sequence = header.sequence,
                            offset = fragment.offset,
                            total = fragment.total_len,
                            "buffered fragment"
                        );
                        return Received::Pending;
                    }
                    Err(reason) => {
                        self.stats.fragments_aborted += 1;
                        debug!(
                            sequence = header.sequence,
                            offset = fragment.offset,
                            total = fragment.total_len,
                            %reason,
                            "aborting reassembly"
                        );
                        return Received::Dropped(reason);
                    }
                }
            }
        };

        let dropped = self.space.gap(header.sequence, self.incoming_sequence);
        self.stats.last_dropped = dropped;
        self.stats.total_dropped += u64::from(dropped);
        if dropped > 0 {
            debug!(
                sequence = header.sequence,
                dropped, "sequence gap, datagrams lost"
            );
        }

        if header.ack_reliable == self.reliable_sequence {
            self.reliable.clear();
        }
        self.incoming_sequence = header.sequence;
        self.incoming_acknowledged = header.ack;
        self.incoming_reliable_acknowledged = header.ack_reliable;
        if header.reliable {
            self.incoming_reliable_sequence = !self.incoming_reliable_sequence;
        }
        if header.qport.is_some() {
            self.remote_qport = header.qport;
        }

        Received::Payload(payload)
    }

    fn frame(&self, header: &PacketHeader, body: &[u8]) -> ChannelResult<Vec<u8>> {
        let mut writer = BitWriter::new(self.config.max_packet_len);
        header.encode(&mut writer, &self.config)?;
        writer.write_bytes(body)?;
        Ok(writer.finish())
    }
}
