//! Length-prefixed JSON framing for the pipe between a host task and its
//! child-process component, in the same spirit as the teacher's wire codec:
//! a 4-byte big-endian length prefix followed by the payload, one frame per
//! message, no delimiter scanning required on the read side.

use std::io::{self, Read, Write};

use serde::de::DeserializeOwned;
use serde::Serialize;

const MAX_FRAME_LEN: u32 = 16 * 1024 * 1024;

/// Write one length-prefixed JSON frame.
///
/// # Errors
/// Propagates any I/O error from `writer`, or a serialization failure.
pub fn write_frame<W: Write, T: Serialize>(writer: &mut W, value: &T) -> io::Result<()> {
    let body = serde_json::to_vec(value).map_err(io::Error::other)?;
    let len = u32::try_from(body.len()).map_err(io::Error::other)?;
    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(&body)?;
    writer.flush()
}

/// Read one length-prefixed JSON frame, or `Ok(None)` at a clean EOF between
/// frames (the far end closed its write half).
///
/// # Errors
/// Propagates I/O errors, a frame exceeding `MAX_FRAME_LEN`, or malformed
/// JSON.
pub fn read_frame<R: Read, T: DeserializeOwned>(reader: &mut R) -> io::Result<Option<T>> {
    let mut len_buf = [0_u8; 4];
    match reader.read_exact(&mut len_buf) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame of {len} bytes exceeds the {MAX_FRAME_LEN}-byte limit"),
        ));
    }
    let mut body = vec![0_u8; len as usize];
    reader.read_exact(&mut body)?;
    let value = serde_json::from_slice(&body).map_err(io::Error::other)?;
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn frame_roundtrips() {
        let mut buf = Vec::new();
        write_frame(&mut buf, &("hello", 42_i64)).unwrap();
        let mut cursor = Cursor::new(buf);
        let decoded: Option<(String, i64)> = read_frame(&mut cursor).unwrap();
        assert_eq!(decoded, Some(("hello".to_string(), 42)));
    }

    #[test]
    fn read_at_clean_eof_is_none() {
        let mut cursor = Cursor::new(Vec::<u8>::new());
        let decoded: Option<i64> = read_frame(&mut cursor).unwrap();
        assert_eq!(decoded, None);
    }

    #[test]
    fn oversized_frame_is_rejected() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(MAX_FRAME_LEN + 1).to_be_bytes());
        let mut cursor = Cursor::new(buf);
        let result: io::Result<Option<i64>> = read_frame(&mut cursor);
        assert!(result.is_err());
    }
}
