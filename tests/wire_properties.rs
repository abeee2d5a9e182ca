//! Property-based tests for the wire transform and the codec
//!
//! - Decompression inverts compression up to group padding
//! - Records round-trip through encode/decode
//! - Arbitrary input never panics the decoder

use proptest::prelude::*;

use sge_proto::codec::wire::{compress, decompress, seal, verify, HEADER_SIZE};
use sge_proto::{decode_record, encode_record, Record, RecordValue, Schema};

const SAMPLE: &str = "
sample 3 {
    a integer;
    s string;
    xs integer[];
    tags string[];
    inner leaf;
}
leaf 4 { v integer required; }
";

// Payloads biased towards zero bytes so the mask logic sees both cases
fn payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(prop_oneof![3 => Just(0u8), 2 => any::<u8>()], 0..200)
}

fn record_strategy() -> impl Strategy<Value = Record> {
    (
        any::<Option<i64>>(),
        prop::option::of(prop::collection::vec(any::<u8>(), 0..40)),
        prop::option::of(prop::collection::vec(any::<i64>(), 0..10)),
        prop::option::of(prop::collection::vec("[a-z]{0,6}", 0..5)),
        any::<Option<i64>>(),
    )
        .prop_map(|(a, s, xs, tags, inner)| {
            let mut record = Record::new();
            if let Some(a) = a {
                record.insert("a", a);
            }
            if let Some(s) = s {
                record.insert("s", RecordValue::String(s));
            }
            if let Some(xs) = xs {
                record.insert("xs", xs.into_iter().map(RecordValue::Integer).collect::<Vec<_>>());
            }
            if let Some(tags) = tags {
                record.insert("tags", tags.into_iter().map(RecordValue::from).collect::<Vec<_>>());
            }
            if let Some(v) = inner {
                record.insert("inner", Record::new().with_int("v", v));
            }
            record
        })
}

#[test]
fn prop_decompress_inverts_compress() {
    proptest!(|(payload in payload_strategy())| {
        let mut frame = vec![0x11, 0xAA, 0x55];
        frame.extend_from_slice(&payload);

        let packed = compress(&frame).unwrap();
        prop_assert_eq!(&packed[..HEADER_SIZE], &frame[..HEADER_SIZE]);

        let unpacked = decompress(&packed, usize::MAX).unwrap();
        let padded = (payload.len() + 7) / 8 * 8;
        prop_assert_eq!(unpacked.len(), HEADER_SIZE + padded);
        prop_assert_eq!(&unpacked[..frame.len()], &frame[..]);
        prop_assert!(unpacked[frame.len()..].iter().all(|&b| b == 0));
    });
}

#[test]
fn prop_compression_never_expands_past_masks() {
    proptest!(|(payload in payload_strategy())| {
        let mut frame = vec![0x11, 0, 0];
        frame.extend_from_slice(&payload);

        let packed = compress(&frame).unwrap();
        let groups = (payload.len() + 7) / 8;
        let non_zero = payload.iter().filter(|&&b| b != 0).count();
        prop_assert_eq!(packed.len(), HEADER_SIZE + groups + non_zero);
    });
}

#[test]
fn prop_sealed_frames_verify() {
    proptest!(|(payload in payload_strategy())| {
        let mut frame = vec![0x11, 0, 0];
        frame.extend_from_slice(&payload);
        let mut packed = compress(&frame).unwrap();
        seal(&mut packed);
        prop_assert!(verify(&packed).is_ok());
    });
}

#[test]
fn prop_record_round_trip() {
    let schema = Schema::parse(SAMPLE).unwrap();
    proptest!(|(record in record_strategy())| {
        let frame = encode_record(&schema, "sample", &record).unwrap();
        let (id, decoded) = decode_record(&schema, &frame).unwrap();
        prop_assert_eq!(id, 3);
        prop_assert_eq!(decoded, record);
    });
}

#[test]
fn prop_arbitrary_input_never_panics() {
    let schema = Schema::parse(SAMPLE).unwrap();
    proptest!(|(bytes in prop::collection::vec(any::<u8>(), 0..128))| {
        let _ = decode_record(&schema, &bytes);
    });
}

#[test]
fn prop_sealed_garbage_never_panics() {
    let schema = Schema::parse(SAMPLE).unwrap();
    proptest!(|(payload in payload_strategy())| {
        let mut frame = vec![0x11, 0, 0];
        frame.extend_from_slice(&payload);
        let mut packed = compress(&frame).unwrap();
        seal(&mut packed);
        let _ = decode_record(&schema, &packed);
    });
}
