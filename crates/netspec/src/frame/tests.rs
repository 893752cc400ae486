//! Unit tests for frame reading and writing.

use std::io::{self, Cursor, Read};

use rstest::rstest;

use super::*;

const LIMIT: u32 = 1024;

fn framed(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    write_frame(&mut out, payload).expect("frame writes");
    out
}

#[test]
fn written_frames_carry_a_little_endian_prefix() {
    assert_eq!(framed(b"abc"), [3, 0, 0, 0, b'a', b'b', b'c']);
}

#[test]
fn consecutive_frames_are_read_in_order() {
    let mut bytes = framed(b"first");
    bytes.extend(framed(b""));
    bytes.extend(framed(b"third"));
    let mut reader = Cursor::new(bytes);

    assert_eq!(read_frame(&mut reader, LIMIT).expect("read"), Some(b"first".to_vec()));
    assert_eq!(read_frame(&mut reader, LIMIT).expect("read"), Some(Vec::new()));
    assert_eq!(read_frame(&mut reader, LIMIT).expect("read"), Some(b"third".to_vec()));
    assert_eq!(read_frame(&mut reader, LIMIT).expect("read"), None);
}

#[rstest]
#[case(1)]
#[case(3)]
fn partial_prefix_is_truncated_length(#[case] len: usize) {
    let bytes = framed(b"payload");
    let mut reader = Cursor::new(bytes.get(..len).expect("prefix slice").to_vec());
    let error = read_frame(&mut reader, LIMIT).expect_err("truncated");
    assert!(matches!(error, FrameError::TruncatedLength { read } if read == len));
}

#[test]
fn partial_payload_is_truncated_payload() {
    let mut bytes = framed(b"payload");
    bytes.truncate(LENGTH_PREFIX_BYTES + 3);
    let error = read_frame(&mut Cursor::new(bytes), LIMIT).expect_err("truncated");
    assert!(matches!(
        error,
        FrameError::TruncatedPayload {
            expected: 7,
            read: 3
        }
    ));
}

#[test]
fn oversize_length_is_rejected_before_allocation() {
    let bytes = u32::MAX.to_le_bytes().to_vec();
    let error = read_frame(&mut Cursor::new(bytes), LIMIT).expect_err("too large");
    assert!(matches!(
        error,
        FrameError::TooLarge {
            length: u32::MAX,
            limit: LIMIT
        }
    ));
}

/// Reader yielding one byte per call and an interruption between bytes.
struct Trickle {
    bytes: Vec<u8>,
    position: usize,
    interrupt: bool,
}

impl Read for Trickle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.interrupt = !self.interrupt;
        if self.interrupt {
            return Err(io::Error::from(io::ErrorKind::Interrupted));
        }
        let (Some(byte), Some(slot)) = (self.bytes.get(self.position), buf.first_mut()) else {
            return Ok(0);
        };
        *slot = *byte;
        self.position += 1;
        Ok(1)
    }
}

#[test]
fn short_reads_and_interruptions_are_retried() {
    let mut reader = Trickle {
        bytes: framed(b"slow"),
        position: 0,
        interrupt: false,
    };
    assert_eq!(read_frame(&mut reader, LIMIT).expect("read"), Some(b"slow".to_vec()));
}

struct Broken;

impl Read for Broken {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::from(io::ErrorKind::BrokenPipe))
    }
}

#[test]
fn reader_failures_are_io_errors() {
    let error = read_frame(&mut Broken, LIMIT).expect_err("broken");
    assert!(matches!(
        error,
        FrameError::Io(ref source) if source.kind() == io::ErrorKind::BrokenPipe
    ));
}
