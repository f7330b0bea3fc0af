#![no_main]

use bitstream::BitReader;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut reader = BitReader::new(data);
    let mut idx = 0usize;

    // Use input bytes to drive a bounded sequence of operations.
    while idx < data.len() && idx < 1024 {
        let op = data[idx] % 8;
        idx += 1;

        match op {
            0 => {
                let _ = reader.read_u8();
            }
            1 => {
                let width = i32::from(data[idx.saturating_sub(1)] % 64) - 32;
                let _ = reader.read_bits(width);
            }
            2 => {
                reader.flush_bits();
            }
            3 => {
                let _ = reader.read_u32();
            }
            4 => {
                let _ = reader.read_varu64();
            }
            5 => {
                let _ = reader.read_string();
            }
            6 => {
                let _ = reader.read_f32();
            }
            _ => {
                let len = usize::from(data[idx.saturating_sub(1)] % 32);
                let _ = reader.read_bytes(len);
            }
        }
    }
});
