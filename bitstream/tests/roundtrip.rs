use bitstream::{BitError, BitReader, BitWriter};

#[test]
fn bounded_writer_roundtrip_bits() {
    let mut writer = BitWriter::new(8);
    writer.write_bits(0b1010, 4).unwrap();
    writer.write_bits(0xAB, 8).unwrap();
    writer.flush_bits();
    let bytes = writer.finish();
    assert_eq!(bytes.len(), 2);

    let mut reader = BitReader::new(&bytes);
    assert_eq!(reader.read_bits(4).unwrap(), 0b1010);
    assert_eq!(reader.read_bits(8).unwrap(), 0xAB);
}

#[test]
fn full_buffer_rejects_every_primitive() {
    let mut writer = BitWriter::new(1);
    writer.write_u8(1).unwrap();
    assert!(matches!(writer.write_u8(2), Err(BitError::BufferOverflow { .. })));
    assert!(matches!(writer.write_f32(2.0), Err(BitError::BufferOverflow { .. })));
    assert!(matches!(writer.write_string(""), Err(BitError::BufferOverflow { .. })));
    assert!(matches!(writer.write_varu64(0), Err(BitError::BufferOverflow { .. })));
    assert!(matches!(writer.write_bits(1, 1), Err(BitError::BufferOverflow { .. })));
    assert_eq!(writer.finish(), vec![1]);
}

#[test]
fn truncated_input_is_end_of_input() {
    let mut writer = BitWriter::new(16);
    writer.write_u64(u64::MAX).unwrap();
    let bytes = writer.finish();

    let mut reader = BitReader::new(&bytes[..5]);
    assert_eq!(
        reader.read_u64(),
        Err(BitError::UnexpectedEndOfInput {
            requested: 8,
            available: 5,
        })
    );
}
