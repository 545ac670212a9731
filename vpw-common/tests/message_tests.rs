// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Unit tests for MessageBuffer, Segment and the protocol vocabulary.

use vpw_common::protocol::{parse_version, Mode, Query, MESSAGE_BUFFER_SIZE};
use vpw_common::{FlashChipId, FlashFamily, MessageBuffer, Segment};

#[test]
fn test_header_accessors() {
    let mut buf = MessageBuffer::new();
    buf.compose(&[0x6C, 0x10, 0xF0, 0x35, 0x01], &[0x10, 0x00, 0xFF, 0xA0, 0x00])
        .unwrap();

    assert_eq!(buf.priority(), Some(0x6C));
    assert_eq!(buf.destination(), Some(0x10));
    assert_eq!(buf.source(), Some(0xF0));
    assert_eq!(buf.mode(), Some(Mode::Read));
    assert_eq!(buf.submode(), 0x01);
    assert_eq!(buf.u16_be(5), Some(0x1000));
    assert_eq!(buf.u24_be(7), Some(0xFFA000));
}

#[test]
fn test_field_readers_past_end() {
    let mut buf = MessageBuffer::new();
    buf.extend(&[0x6C, 0x10, 0xF0, 0x3D]).unwrap();

    assert_eq!(buf.submode(), 0);
    assert_eq!(buf.u16_be(3), None);
    assert_eq!(buf.u24_be(5), None);
    assert_eq!(buf.u32_be(0), Some(0x6C10F03D));
}

#[test]
fn test_capacity_is_enforced() {
    let mut buf = MessageBuffer::new();
    for i in 0..MESSAGE_BUFFER_SIZE {
        buf.push(i as u8).unwrap();
    }
    assert!(buf.is_full());
    assert!(buf.push(0).is_err());
    assert_eq!(buf.len(), MESSAGE_BUFFER_SIZE);
}

#[test]
fn test_wipe_services_and_clears() {
    let mut buf = MessageBuffer::new();
    buf.extend(&[0xAA; 2000]).unwrap();

    let mut services = 0;
    buf.wipe(|| services += 1);

    assert!(buf.is_empty());
    assert_eq!(services, MESSAGE_BUFFER_SIZE.div_ceil(512));
}

#[test]
fn test_wipe_covers_capacity_after_short_reply() {
    let mut buf = MessageBuffer::new();
    buf.extend(&[0x55; MESSAGE_BUFFER_SIZE]).unwrap();
    buf.compose(&[0x6C, 0xF0, 0x10, 0x7D], &[0x00]).unwrap();
    assert_eq!(buf.len(), 5);

    let mut services = 0;
    buf.wipe(|| services += 1);

    assert!(buf.is_empty());
    assert_eq!(services, MESSAGE_BUFFER_SIZE.div_ceil(512));
}

#[test]
fn test_segment_flags() {
    assert!(Segment::COMPLETE.is_start());
    assert!(Segment::COMPLETE.is_end());
    assert!(!Segment::MIDDLE.is_start());
    let closing = Segment::END | Segment::ADD_CHECKSUM;
    assert!(closing.adds_checksum());
    assert!(closing.is_end());
    assert!(!closing.is_start());
    assert_eq!(Segment::START | Segment::END, Segment::COMPLETE);
}

#[test]
fn test_mode_round_trip_and_response() {
    for byte in [0x20u8, 0x34, 0x35, 0x36, 0x37, 0x3D, 0x3F, 0x99] {
        assert_eq!(u8::from(Mode::from(byte)), byte);
    }
    assert_eq!(Mode::Query.response(), 0x7D);
    assert_eq!(Mode::Write.response(), 0x76);
    assert_eq!(Query::from(0x05), Query::EraseBlock);
    assert_eq!(Query::from(0x42), Query::Other(0x42));
}

#[test]
fn test_parse_version() {
    assert_eq!(parse_version("1.2.3"), [1, 2, 3]);
    assert_eq!(parse_version("0.1.0-dev"), [0, 1, 0]);
    assert_eq!(parse_version("10.300"), [10, 255, 0]);
}

#[test]
fn test_chip_family() {
    assert_eq!(FlashChipId::INTEL_28F800B.family(), Some(FlashFamily::Intel));
    assert_eq!(FlashChipId::AMD_AM29BL162C.family(), Some(FlashFamily::Amd));
    assert_eq!(FlashChipId(0x0089_1234).family(), None);
    assert_eq!(FlashChipId::from_parts(0x0001, 0x2258), FlashChipId::AMD_AM29F800BB);
    assert_eq!(FlashChipId::INTEL_28F400B.manufacturer(), 0x0089);
}
