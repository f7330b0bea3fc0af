//! Packet-entities encode and decode throughput.

use bitstream::{BitReader, BitWriter};
use codec::{
    read_packet_entities, write_packet_entities, BaselineStore, EntityState, ProtocolVariant,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn frame(count: u16, tick: u16) -> Vec<EntityState> {
    (1..=count)
        .map(|number| {
            let moving = number % 4 == 0;
            let offset = if moving { f32::from(tick) * 2.0 } else { 0.0 };
            EntityState {
                origin: [f32::from(number % 256) * 8.0 + offset, 128.0, -32.0],
                old_origin: [f32::from(number % 256) * 8.0, 128.0, -32.0],
                model_index: [number % 200 + 1, 0, 0, 0],
                frame: tick % 40,
                ..EntityState::new(number)
            }
        })
        .collect()
}

fn bench_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("packet_entities_write");
    for variant in [ProtocolVariant::Legacy, ProtocolVariant::Modern] {
        let caps = variant.capabilities();
        let baselines = BaselineStore::for_variant(caps);
        for count in [64u16, 256, 1000] {
            let from = frame(count, 0);
            let to = frame(count, 1);
            group.throughput(Throughput::Elements(u64::from(count)));
            group.bench_with_input(
                BenchmarkId::new(format!("{variant:?}"), count),
                &count,
                |b, _| {
                    b.iter(|| {
                        let mut writer = BitWriter::new(64 * 1024);
                        write_packet_entities(
                            &mut writer,
                            black_box(&from),
                            black_box(&to),
                            &baselines,
                            caps,
                        )
                        .unwrap();
                        writer.finish()
                    });
                },
            );
        }
    }
    group.finish();
}

fn bench_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("packet_entities_read");
    for variant in [ProtocolVariant::Legacy, ProtocolVariant::Modern] {
        let caps = variant.capabilities();
        let baselines = BaselineStore::for_variant(caps);
        for count in [64u16, 256, 1000] {
            let from = frame(count, 0);
            let to = frame(count, 1);
            let mut writer = BitWriter::new(64 * 1024);
            write_packet_entities(&mut writer, &from, &to, &baselines, caps).unwrap();
            let bytes = writer.finish();
            group.throughput(Throughput::Bytes(bytes.len() as u64));
            group.bench_with_input(
                BenchmarkId::new(format!("{variant:?}"), count),
                &bytes,
                |b, bytes| {
                    b.iter(|| {
                        let mut reader = BitReader::new(black_box(bytes));
                        read_packet_entities(&mut reader, &from, &baselines, caps).unwrap()
                    });
                },
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_write, bench_read);
criterion_main!(benches);
