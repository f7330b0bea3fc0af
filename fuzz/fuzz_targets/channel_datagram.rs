#![no_main]

use bitstream::BitReader;
use codec::{read_packet_entities, BaselineStore, ProtocolVariant};
use libfuzzer_sys::fuzz_target;
use netchan::{Channel, NetSource};

fuzz_target!(|data: &[u8]| {
    let Some((&selector, rest)) = data.split_first() else {
        return;
    };
    let variant = ProtocolVariant::ALL[usize::from(selector) % ProtocolVariant::ALL.len()];
    let caps = variant.capabilities();
    let baselines = BaselineStore::for_variant(caps);
    let mut channel = Channel::new(caps.channel_config(NetSource::Client), 0);

    let mut frame = Vec::new();
    let mut idx = 0usize;
    while idx < rest.len() && idx < 8192 {
        let len = (usize::from(rest[idx]) * 8 % 1500).saturating_add(1);
        idx += 1;
        let end = (idx + len).min(rest.len());
        let datagram = &rest[idx..end];
        idx = end;

        if let Some(payload) = channel.receive(datagram) {
            let mut reader = BitReader::new(&payload);
            if let Ok(entities) = read_packet_entities(&mut reader, &frame, &baselines, caps) {
                frame = entities;
            }
        }
    }
});
