//! Wire frame layout, the size-check rule, and argument encode/decode.
//!
//! Frame layout (spec): 32-bit object id, 16-bit opcode, 16-bit total byte
//! length (header included, a multiple of 4, at least 8). Fd arguments carry
//! no wire bytes; they are drawn in order from an out-of-band fd queue.

use std::ffi::CString;

use crate::signature::{pad4, ArgKind};

/// Size in bytes of the fixed message header (object id + opcode/length word).
pub const HEADER_LEN: usize = 8;

/// A decoded message argument. `Fd` values are not carried here: the
/// dispatcher consumes them directly from the fd queue at the position the
/// signature says an `ArgKind::Fd` occurs, and rewrites them into the
/// outbound frame separately from this decoded representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Argument {
    Int(i32),
    Uint(u32),
    Fixed(i32),
    Str(Option<CString>),
    Array(Vec<u8>),
    Object(u32),
    NewId(u32),
    NewIdDynamic {
        interface: String,
        version: u32,
        id: u32,
    },
}

/// Errors produced while decoding a frame's arguments.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("frame shorter than the 8-byte header")]
    ShortHeader,
    #[error("declared length {0} is not a multiple of 4, or is below 8")]
    BadLength(u16),
    #[error("payload truncated while decoding signature")]
    Truncated,
    #[error("string argument was not valid UTF-8/nul-terminated")]
    BadString,
    #[error("wire length / fd count does not match the message signature")]
    SizeMismatch,
}

/// The fixed 8-byte frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub object_id: u32,
    pub opcode: u16,
    /// Total frame length in bytes, header included.
    pub length: u16,
}

/// Parse the 8-byte header from the start of `bytes`. Returns `None` if fewer
/// than 8 bytes are available.
pub fn read_header(bytes: &[u8]) -> Option<FrameHeader> {
    if bytes.len() < HEADER_LEN {
        return None;
    }
    let object_id = u32::from_ne_bytes(bytes[0..4].try_into().unwrap());
    let word = u32::from_ne_bytes(bytes[4..8].try_into().unwrap());
    let opcode = (word & 0xffff) as u16;
    let length = (word >> 16) as u16;
    Some(FrameHeader {
        object_id,
        opcode,
        length,
    })
}

/// Validate the header's length field: must be a multiple of 4 and at least 8.
pub fn header_length_valid(length: u16) -> bool {
    length >= HEADER_LEN as u16 && length % 4 == 0
}

fn read_u32(payload: &[u8], offset: usize) -> Option<u32> {
    payload
        .get(offset..offset + 4)
        .map(|b| u32::from_ne_bytes(b.try_into().unwrap()))
}

/// Walk `sig` against `payload` (the frame bytes after the header), returning
/// the number of bytes and fd slots the signature consumes. Returns `None` if
/// `payload` runs out of bytes partway through decoding a length prefix or
/// fixed-size argument — this is itself a parse failure, not just a
/// size mismatch.
pub fn expected_counts(sig: &[ArgKind], payload: &[u8]) -> Option<(usize, usize)> {
    let mut off = 0usize;
    let mut fds = 0usize;
    for arg in sig {
        match arg {
            ArgKind::Int | ArgKind::Uint | ArgKind::Fixed | ArgKind::Object { .. } | ArgKind::NewId => {
                if off + 4 > payload.len() {
                    return None;
                }
                off += 4;
            }
            ArgKind::Fd => fds += 1,
            ArgKind::Str { .. } | ArgKind::Array => {
                let len = read_u32(payload, off)? as usize;
                off += 4;
                let padded = pad4(len);
                if off + padded > payload.len() {
                    return None;
                }
                off += padded;
            }
            ArgKind::NewIdDynamic => {
                let len = read_u32(payload, off)? as usize;
                off += 4;
                let padded = pad4(len);
                // + uint version + uint new_id
                if off + padded + 8 > payload.len() {
                    return None;
                }
                off += padded + 8;
            }
        }
    }
    Some((off, fds))
}

/// The size-check rule: the signature must consume exactly `payload.len()`
/// bytes and exactly `fd_count` fd slots, no more, no fewer.
pub fn size_check(sig: &[ArgKind], payload: &[u8], fd_count: usize) -> bool {
    match expected_counts(sig, payload) {
        Some((consumed, fds)) => consumed == payload.len() && fds == fd_count,
        None => false,
    }
}

/// Decode a message's arguments given its signature. The caller is expected
/// to have already run [`size_check`] (or otherwise know `payload` exactly
/// matches the signature) — this function still bounds-checks every read and
/// returns `Truncated` rather than panicking if it does not.
pub fn decode_args(sig: &[ArgKind], payload: &[u8]) -> Result<Vec<Argument>, ParseError> {
    let mut off = 0usize;
    let mut args = Vec::with_capacity(sig.len());
    for arg in sig {
        match arg {
            ArgKind::Int => {
                args.push(Argument::Int(read_i32(payload, &mut off)?));
            }
            ArgKind::Uint => {
                args.push(Argument::Uint(read_u32_adv(payload, &mut off)?));
            }
            ArgKind::Fixed => {
                args.push(Argument::Fixed(read_i32(payload, &mut off)?));
            }
            ArgKind::Object { .. } => {
                args.push(Argument::Object(read_u32_adv(payload, &mut off)?));
            }
            ArgKind::NewId => {
                args.push(Argument::NewId(read_u32_adv(payload, &mut off)?));
            }
            ArgKind::Fd => {
                // No wire bytes; handled by the caller via the fd queue.
            }
            ArgKind::Str { nullable } => {
                let bytes = read_length_prefixed(payload, &mut off)?;
                args.push(Argument::Str(decode_str(bytes, *nullable)?));
            }
            ArgKind::Array => {
                let bytes = read_length_prefixed(payload, &mut off)?;
                args.push(Argument::Array(bytes.to_vec()));
            }
            ArgKind::NewIdDynamic => {
                let bytes = read_length_prefixed(payload, &mut off)?;
                let interface = decode_str(bytes, false)?
                    .ok_or(ParseError::BadString)?
                    .into_string()
                    .map_err(|_| ParseError::BadString)?;
                let version = read_u32_adv(payload, &mut off)?;
                let id = read_u32_adv(payload, &mut off)?;
                args.push(Argument::NewIdDynamic {
                    interface,
                    version,
                    id,
                });
            }
        }
    }
    Ok(args)
}

fn read_u32_adv(payload: &[u8], off: &mut usize) -> Result<u32, ParseError> {
    let v = read_u32(payload, *off).ok_or(ParseError::Truncated)?;
    *off += 4;
    Ok(v)
}

fn read_i32(payload: &[u8], off: &mut usize) -> Result<i32, ParseError> {
    Ok(read_u32_adv(payload, off)? as i32)
}

fn read_length_prefixed<'a>(payload: &'a [u8], off: &mut usize) -> Result<&'a [u8], ParseError> {
    let len = read_u32_adv(payload, off)? as usize;
    let padded = pad4(len);
    let bytes = payload
        .get(*off..*off + len)
        .ok_or(ParseError::Truncated)?;
    if *off + padded > payload.len() {
        return Err(ParseError::Truncated);
    }
    *off += padded;
    Ok(bytes)
}

fn decode_str(bytes: &[u8], nullable: bool) -> Result<Option<CString>, ParseError> {
    if bytes.is_empty() {
        return if nullable {
            Ok(None)
        } else {
            Err(ParseError::BadString)
        };
    }
    // Wayland strings are nul-terminated; the length prefix includes the nul.
    let (body, nul) = bytes.split_at(bytes.len() - 1);
    if nul != [0] {
        return Err(ParseError::BadString);
    }
    CString::new(body)
        .map(Some)
        .map_err(|_| ParseError::BadString)
}

fn encode_length_prefixed(out: &mut Vec<u8>, bytes: &[u8], include_nul: bool) {
    let len = bytes.len() + if include_nul { 1 } else { 0 };
    out.extend_from_slice(&(len as u32).to_ne_bytes());
    out.extend_from_slice(bytes);
    if include_nul {
        out.push(0);
    }
    let padding = pad4(len) - len;
    out.extend(std::iter::repeat(0u8).take(padding));
}

/// Encode a message's arguments back into wire bytes (the payload following
/// the 8-byte header). Used when the dispatcher rewrites a message's fd slots
/// or otherwise mutates it before forwarding.
pub fn encode_args(args: &[Argument]) -> Vec<u8> {
    let mut out = Vec::new();
    for arg in args {
        match arg {
            Argument::Int(v) => out.extend_from_slice(&v.to_ne_bytes()),
            Argument::Uint(v) => out.extend_from_slice(&v.to_ne_bytes()),
            Argument::Fixed(v) => out.extend_from_slice(&v.to_ne_bytes()),
            Argument::Object(v) | Argument::NewId(v) => out.extend_from_slice(&v.to_ne_bytes()),
            Argument::Str(Some(s)) => encode_length_prefixed(&mut out, s.as_bytes(), true),
            Argument::Str(None) => out.extend_from_slice(&0u32.to_ne_bytes()),
            Argument::Array(bytes) => encode_length_prefixed(&mut out, bytes, false),
            Argument::NewIdDynamic {
                interface,
                version,
                id,
            } => {
                encode_length_prefixed(&mut out, interface.as_bytes(), true);
                out.extend_from_slice(&version.to_ne_bytes());
                out.extend_from_slice(&id.to_ne_bytes());
            }
        }
    }
    out
}

/// Build a complete frame (header + payload) for `object_id`/`opcode`.
pub fn build_frame(object_id: u32, opcode: u16, payload: &[u8]) -> Vec<u8> {
    let length = (HEADER_LEN + payload.len()) as u16;
    let mut out = Vec::with_capacity(length as usize);
    out.extend_from_slice(&object_id.to_ne_bytes());
    let word = (length as u32) << 16 | opcode as u32;
    out.extend_from_slice(&word.to_ne_bytes());
    out.extend_from_slice(payload);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::WL_REGISTRY;

    #[test]
    fn header_round_trip() {
        let frame = build_frame(7, 3, &[1, 2, 3, 4]);
        let header = read_header(&frame).unwrap();
        assert_eq!(header.object_id, 7);
        assert_eq!(header.opcode, 3);
        assert_eq!(header.length, 12);
        assert!(header_length_valid(header.length));
    }

    #[test]
    fn global_event_round_trips() {
        let args = vec![
            Argument::Uint(1),
            Argument::Str(Some(CString::new("wl_shm").unwrap())),
            Argument::Uint(1),
        ];
        let payload = encode_args(&args);
        let sig = WL_REGISTRY.events[0].signature;
        assert!(size_check(sig, &payload, 0));
        let decoded = decode_args(sig, &payload).unwrap();
        assert_eq!(decoded, args);
    }

    #[test]
    fn size_check_boundary_table() {
        let args = vec![
            Argument::Uint(42),
            Argument::Str(Some(CString::new("hi").unwrap())),
            Argument::Uint(1),
        ];
        let payload = encode_args(&args);
        let sig = WL_REGISTRY.events[0].signature;
        let n = payload.len();
        for len in 0..=n + 4 {
            for fds in 0..=1 {
                let ok = if len <= payload.len() {
                    size_check(sig, &payload[..len], fds)
                } else {
                    false
                };
                let expect = len == n && fds == 0;
                assert_eq!(ok, expect, "len={len} fds={fds}");
            }
        }
    }

    #[test]
    fn null_string_round_trips() {
        let args = vec![Argument::Str(None)];
        let sig: &[ArgKind] = &[ArgKind::Str { nullable: true }];
        let payload = encode_args(&args);
        assert!(size_check(sig, &payload, 0));
        assert_eq!(decode_args(sig, &payload).unwrap(), args);
    }
}
