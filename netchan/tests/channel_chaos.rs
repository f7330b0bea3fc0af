use netchan::{Channel, ChannelConfig, NetSource};
use proptest::prelude::*;

const LOSSLESS_TICKS: usize = 80;

struct Outcome {
    queued: Vec<Vec<u8>>,
    delivered: Vec<u8>,
}

fn token(index: u8, len: usize) -> Vec<u8> {
    vec![index; len]
}

/// Runs both ends for `lossy` ticks dropping datagrams per the masks, then
/// lets the link settle without loss.
fn run(config: &ChannelConfig, token_len: usize, c2s: &[bool], s2c: &[bool]) -> Outcome {
    let mut client = Channel::new(config.clone().with_role(NetSource::Client), 7);
    let mut server = Channel::new(config.clone().with_role(NetSource::Server), 0);
    let mut queued = Vec::new();
    let mut delivered = Vec::new();
    let lossy = c2s.len().min(s2c.len());

    for tick in 0..lossy + LOSSLESS_TICKS {
        if tick < lossy && client.pending_reliable_len() == 0 {
            let next = token(u8::try_from(queued.len()).unwrap(), token_len);
            client.queue_reliable(&next).unwrap();
            queued.push(next);
        }

        let outgoing = client.transmit(&[]).unwrap();
        if !(tick < lossy && c2s[tick]) {
            for datagram in &outgoing {
                if let Some(payload) = server.receive(datagram) {
                    delivered.extend(payload);
                }
            }
        }

        let replies = server.transmit(&[]).unwrap();
        if !(tick < lossy && s2c[tick]) {
            for datagram in &replies {
                client.receive(datagram);
            }
        }
    }

    assert!(!client.has_reliable_in_flight());
    assert_eq!(client.pending_reliable_len(), 0);
    Outcome { queued, delivered }
}

#[test]
fn lossless_link_delivers_every_reliable_once() {
    let config = ChannelConfig::default();
    let outcome = run(&config, 3, &[false; 20], &[false; 20]);
    assert_eq!(outcome.delivered, outcome.queued.concat());
}

#[test]
fn alternating_loss_still_delivers_in_order() {
    let config = ChannelConfig::default();
    let mask: Vec<bool> = (0..40).map(|i| i % 2 == 0).collect();
    let outcome = run(&config, 2, &mask, &mask);
    assert_eq!(outcome.delivered, outcome.queued.concat());
}

proptest! {
    #[test]
    fn reliable_stream_survives_loss(
        c2s in prop::collection::vec(any::<bool>(), 1..40),
        s2c in prop::collection::vec(any::<bool>(), 1..40),
    ) {
        let config = ChannelConfig::default();
        let outcome = run(&config, 4, &c2s, &s2c);
        prop_assert_eq!(outcome.delivered, outcome.queued.concat());
    }

    #[test]
    fn fragmented_reliable_stream_survives_loss(
        c2s in prop::collection::vec(any::<bool>(), 1..30),
        s2c in prop::collection::vec(any::<bool>(), 1..30),
    ) {
        let config = ChannelConfig::for_testing(NetSource::Client);
        let outcome = run(&config, 200, &c2s, &s2c);
        prop_assert_eq!(outcome.delivered, outcome.queued.concat());
    }
}
