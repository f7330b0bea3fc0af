//! Sequenced, fragmenting datagram channel for the deltachan wire format.
//!
//! A [`Channel`] sits between the delta codec and raw datagram I/O. It
//! stamps every outgoing datagram with a sequence/ack header, keeps one
//! reliable payload in flight until the peer acknowledges it, splits
//! oversized messages into fragments, and on receipt rejects stale
//! datagrams and reassembles fragments before handing a complete message
//! back to the codec.
//!
//! # Design Principles
//!
//! - **Drops are not errors** - Stale, malformed or inconsistent datagrams are
//!   classified by [`DropReason`], counted, logged through `tracing`, and never
//!   alter sequencing state.
//! - **Single-threaded and tick-driven** - No operation blocks; the owner
//!   calls [`Channel::transmit`] and [`Channel::process`] once per tick.
//! - **No domain knowledge** - Payloads are opaque bytes.
//!
//! # Example
//!
//! ```
//! use netchan::{Channel, ChannelConfig, NetSource};
//!
//! let config = ChannelConfig::for_testing(NetSource::Client);
//! let mut client = Channel::new(config.clone(), 0x42);
//! let mut server = Channel::new(config.with_role(NetSource::Server), 0);
//!
//! let datagrams = client.send(b"connect", true).unwrap();
//! let payload = server.receive(&datagrams[0]).unwrap();
//! assert_eq!(payload, b"connect");
//! assert_eq!(server.remote_qport(), Some(0x42));
//! ```

mod channel;
mod config;
mod error;
mod fragment;
mod header;
mod sequence;

pub use channel::{Channel, ChannelStats, Received};
pub use config::{
    ChannelConfig, NetSource, QportMode, MAX_MSGLEN, MAX_PACKETLEN, MAX_PACKETLEN_LARGE,
};
pub use error::{ChannelError, ChannelResult, DropReason};
pub use fragment::{split as split_fragments, Reassembly};
pub use header::{
    peek_qport, FragmentHeader, PacketHeader, FRAGMENT_BIT, FRAGMENT_HEADER_LEN, FRAGMENT_MORE,
    RELIABLE_BIT, SEQUENCE_HEADER_LEN,
};
pub use sequence::SequenceSpace;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_api_exports() {
        let _ = MAX_MSGLEN;
        let _ = ChannelConfig::default();
        let _ = SequenceSpace::LEGACY;
        let _ = Reassembly::new();
        let _: ChannelResult<()> = Ok(());
    }

    #[test]
    fn max_msglen_is_power_of_two() {
        assert!(MAX_MSGLEN.is_power_of_two());
        assert_eq!(MAX_MSGLEN, 32_768);
    }

    #[test]
    fn fragment_offsets_fit_header() {
        assert!(MAX_MSGLEN - 1 <= usize::from(!FRAGMENT_MORE));
        assert!(u16::try_from(MAX_MSGLEN).is_ok());
    }
}
