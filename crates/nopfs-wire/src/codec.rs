// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Encode and decode 9P2000 wire messages.
// Author: Lukas Bower

//! Encode/decode helpers for 9P2000 wire messages.

use std::io::{Cursor, Read};

use crate::types::*;

/// 9P2000 message opcodes.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MessageType {
    Tversion = 100,
    Rversion = 101,
    Tauth = 102,
    Tattach = 104,
    Rattach = 105,
    Rerror = 107,
    Tflush = 108,
    Rflush = 109,
    Twalk = 110,
    Rwalk = 111,
    Topen = 112,
    Ropen = 113,
    Tcreate = 114,
    Rcreate = 115,
    Tread = 116,
    Rread = 117,
    Twrite = 118,
    Rwrite = 119,
    Tclunk = 120,
    Rclunk = 121,
    Tremove = 122,
    Rremove = 123,
    Tstat = 124,
    Rstat = 125,
    Twstat = 126,
    Rwstat = 127,
}

impl TryFrom<u8> for MessageType {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use MessageType::*;
        Ok(match value {
            100 => Tversion,
            101 => Rversion,
            102 => Tauth,
            104 => Tattach,
            105 => Rattach,
            107 => Rerror,
            108 => Tflush,
            109 => Rflush,
            110 => Twalk,
            111 => Rwalk,
            112 => Topen,
            113 => Ropen,
            114 => Tcreate,
            115 => Rcreate,
            116 => Tread,
            117 => Rread,
            118 => Twrite,
            119 => Rwrite,
            120 => Tclunk,
            121 => Rclunk,
            122 => Tremove,
            123 => Rremove,
            124 => Tstat,
            125 => Rstat,
            126 => Twstat,
            127 => Rwstat,
            other => return Err(CodecError::Unsupported(other)),
        })
    }
}

/// Codec responsible for encoding and decoding 9P2000 messages.
#[derive(Debug, Default, Clone, Copy)]
pub struct Codec;

impl Codec {
    /// Encode a request into its wire representation.
    pub fn encode_request(&self, request: &Request) -> Result<Vec<u8>, CodecError> {
        let mut payload = Vec::new();
        payload.extend_from_slice(&request.tag.to_le_bytes());
        let ty = match &request.body {
            RequestBody::Version { msize, version } => {
                payload.extend_from_slice(&msize.to_le_bytes());
                put_string(&mut payload, version)?;
                MessageType::Tversion
            }
            RequestBody::Auth { afid, uname, aname } => {
                payload.extend_from_slice(&afid.to_le_bytes());
                put_string(&mut payload, uname)?;
                put_string(&mut payload, aname)?;
                MessageType::Tauth
            }
            RequestBody::Attach {
                fid,
                afid,
                uname,
                aname,
            } => {
                payload.extend_from_slice(&fid.to_le_bytes());
                payload.extend_from_slice(&afid.to_le_bytes());
                put_string(&mut payload, uname)?;
                put_string(&mut payload, aname)?;
                MessageType::Tattach
            }
            RequestBody::Flush { oldtag } => {
                payload.extend_from_slice(&oldtag.to_le_bytes());
                MessageType::Tflush
            }
            RequestBody::Walk {
                fid,
                newfid,
                wnames,
            } => {
                payload.extend_from_slice(&fid.to_le_bytes());
                payload.extend_from_slice(&newfid.to_le_bytes());
                if wnames.len() > MAX_WELEM {
                    return Err(CodecError::TooManyElements(wnames.len()));
                }
                payload.extend_from_slice(&(wnames.len() as u16).to_le_bytes());
                for name in wnames {
                    validate_component(name)?;
                    put_string(&mut payload, name)?;
                }
                MessageType::Twalk
            }
            RequestBody::Open { fid, mode } => {
                payload.extend_from_slice(&fid.to_le_bytes());
                payload.push((*mode).into());
                MessageType::Topen
            }
            RequestBody::Create {
                fid,
                name,
                perm,
                mode,
            } => {
                payload.extend_from_slice(&fid.to_le_bytes());
                put_string(&mut payload, name)?;
                payload.extend_from_slice(&perm.to_le_bytes());
                payload.push((*mode).into());
                MessageType::Tcreate
            }
            RequestBody::Read { fid, offset, count } => {
                payload.extend_from_slice(&fid.to_le_bytes());
                payload.extend_from_slice(&offset.to_le_bytes());
                payload.extend_from_slice(&count.to_le_bytes());
                MessageType::Tread
            }
            RequestBody::Write { fid, offset, data } => {
                payload.extend_from_slice(&fid.to_le_bytes());
                payload.extend_from_slice(&offset.to_le_bytes());
                put_data(&mut payload, data)?;
                MessageType::Twrite
            }
            RequestBody::Clunk { fid } => {
                payload.extend_from_slice(&fid.to_le_bytes());
                MessageType::Tclunk
            }
            RequestBody::Remove { fid } => {
                payload.extend_from_slice(&fid.to_le_bytes());
                MessageType::Tremove
            }
            RequestBody::Stat { fid } => {
                payload.extend_from_slice(&fid.to_le_bytes());
                MessageType::Tstat
            }
            RequestBody::Wstat { fid, stat } => {
                payload.extend_from_slice(&fid.to_le_bytes());
                put_stat(&mut payload, stat)?;
                MessageType::Twstat
            }
        };
        finish(ty, &payload)
    }

    /// Encode a response into its wire representation.
    pub fn encode_response(&self, response: &Response) -> Result<Vec<u8>, CodecError> {
        let mut payload = Vec::new();
        payload.extend_from_slice(&response.tag.to_le_bytes());
        let ty = match &response.body {
            ResponseBody::Version { msize, version } => {
                payload.extend_from_slice(&msize.to_le_bytes());
                put_string(&mut payload, version)?;
                MessageType::Rversion
            }
            ResponseBody::Attach { qid } => {
                put_qid(&mut payload, qid);
                MessageType::Rattach
            }
            ResponseBody::Error { ename } => {
                put_string(&mut payload, ename)?;
                MessageType::Rerror
            }
            ResponseBody::Flush => MessageType::Rflush,
            ResponseBody::Walk { qids } => {
                if qids.len() > MAX_WELEM {
                    return Err(CodecError::TooManyElements(qids.len()));
                }
                payload.extend_from_slice(&(qids.len() as u16).to_le_bytes());
                for qid in qids {
                    put_qid(&mut payload, qid);
                }
                MessageType::Rwalk
            }
            ResponseBody::Open { qid, iounit } => {
                put_qid(&mut payload, qid);
                payload.extend_from_slice(&iounit.to_le_bytes());
                MessageType::Ropen
            }
            ResponseBody::Create { qid, iounit } => {
                put_qid(&mut payload, qid);
                payload.extend_from_slice(&iounit.to_le_bytes());
                MessageType::Rcreate
            }
            ResponseBody::Read { data } => {
                put_data(&mut payload, data)?;
                MessageType::Rread
            }
            ResponseBody::Write { count } => {
                payload.extend_from_slice(&count.to_le_bytes());
                MessageType::Rwrite
            }
            ResponseBody::Clunk => MessageType::Rclunk,
            ResponseBody::Remove => MessageType::Rremove,
            ResponseBody::Stat { stat } => {
                put_stat(&mut payload, stat)?;
                MessageType::Rstat
            }
            ResponseBody::Wstat => MessageType::Rwstat,
        };
        finish(ty, &payload)
    }

    /// Decode a request from the wire representation.
    pub fn decode_request(&self, bytes: &[u8]) -> Result<Request, CodecError> {
        let (ty, payload) = decode_message(bytes)?;
        let mut cursor = Cursor::new(payload);
        let tag = read_u16(&mut cursor)?;
        let body = match ty {
            MessageType::Tversion => {
                let msize = read_u32(&mut cursor)?;
                let version = read_string(&mut cursor)?;
                RequestBody::Version { msize, version }
            }
            MessageType::Tauth => {
                let afid = read_u32(&mut cursor)?;
                let uname = read_string(&mut cursor)?;
                let aname = read_string(&mut cursor)?;
                RequestBody::Auth { afid, uname, aname }
            }
            MessageType::Tattach => {
                let fid = read_u32(&mut cursor)?;
                let afid = read_u32(&mut cursor)?;
                let uname = read_string(&mut cursor)?;
                let aname = read_string(&mut cursor)?;
                RequestBody::Attach {
                    fid,
                    afid,
                    uname,
                    aname,
                }
            }
            MessageType::Tflush => {
                let oldtag = read_u16(&mut cursor)?;
                RequestBody::Flush { oldtag }
            }
            MessageType::Twalk => {
                let fid = read_u32(&mut cursor)?;
                let newfid = read_u32(&mut cursor)?;
                let nwname = read_u16(&mut cursor)? as usize;
                if nwname > MAX_WELEM {
                    return Err(CodecError::TooManyElements(nwname));
                }
                let mut wnames = Vec::with_capacity(nwname);
                for _ in 0..nwname {
                    let name = read_string(&mut cursor)?;
                    validate_component(&name)?;
                    wnames.push(name);
                }
                RequestBody::Walk {
                    fid,
                    newfid,
                    wnames,
                }
            }
            MessageType::Topen => {
                let fid = read_u32(&mut cursor)?;
                let mode = OpenMode::from_bits(read_u8(&mut cursor)?);
                RequestBody::Open { fid, mode }
            }
            MessageType::Tcreate => {
                let fid = read_u32(&mut cursor)?;
                let name = read_string(&mut cursor)?;
                let perm = read_u32(&mut cursor)?;
                let mode = OpenMode::from_bits(read_u8(&mut cursor)?);
                RequestBody::Create {
                    fid,
                    name,
                    perm,
                    mode,
                }
            }
            MessageType::Tread => {
                let fid = read_u32(&mut cursor)?;
                let offset = read_u64(&mut cursor)?;
                let count = read_u32(&mut cursor)?;
                RequestBody::Read { fid, offset, count }
            }
            MessageType::Twrite => {
                let fid = read_u32(&mut cursor)?;
                let offset = read_u64(&mut cursor)?;
                let data = read_data(&mut cursor)?;
                RequestBody::Write { fid, offset, data }
            }
            MessageType::Tclunk => RequestBody::Clunk {
                fid: read_u32(&mut cursor)?,
            },
            MessageType::Tremove => RequestBody::Remove {
                fid: read_u32(&mut cursor)?,
            },
            MessageType::Tstat => RequestBody::Stat {
                fid: read_u32(&mut cursor)?,
            },
            MessageType::Twstat => {
                let fid = read_u32(&mut cursor)?;
                let stat = read_stat(&mut cursor)?;
                RequestBody::Wstat { fid, stat }
            }
            other => return Err(CodecError::Unsupported(other as u8)),
        };
        Ok(Request { tag, body })
    }

    /// Decode a response from the wire representation.
    pub fn decode_response(&self, bytes: &[u8]) -> Result<Response, CodecError> {
        let (ty, payload) = decode_message(bytes)?;
        let mut cursor = Cursor::new(payload);
        let tag = read_u16(&mut cursor)?;
        let body = match ty {
            MessageType::Rversion => {
                let msize = read_u32(&mut cursor)?;
                let version = read_string(&mut cursor)?;
                ResponseBody::Version { msize, version }
            }
            MessageType::Rattach => ResponseBody::Attach {
                qid: read_qid(&mut cursor)?,
            },
            MessageType::Rerror => ResponseBody::Error {
                ename: read_string(&mut cursor)?,
            },
            MessageType::Rflush => ResponseBody::Flush,
            MessageType::Rwalk => {
                let count = read_u16(&mut cursor)? as usize;
                if count > MAX_WELEM {
                    return Err(CodecError::TooManyElements(count));
                }
                let mut qids = Vec::with_capacity(count);
                for _ in 0..count {
                    qids.push(read_qid(&mut cursor)?);
                }
                ResponseBody::Walk { qids }
            }
            MessageType::Ropen => {
                let qid = read_qid(&mut cursor)?;
                let iounit = read_u32(&mut cursor)?;
                ResponseBody::Open { qid, iounit }
            }
            MessageType::Rcreate => {
                let qid = read_qid(&mut cursor)?;
                let iounit = read_u32(&mut cursor)?;
                ResponseBody::Create { qid, iounit }
            }
            MessageType::Rread => ResponseBody::Read {
                data: read_data(&mut cursor)?,
            },
            MessageType::Rwrite => ResponseBody::Write {
                count: read_u32(&mut cursor)?,
            },
            MessageType::Rclunk => ResponseBody::Clunk,
            MessageType::Rremove => ResponseBody::Remove,
            MessageType::Rstat => ResponseBody::Stat {
                stat: read_stat(&mut cursor)?,
            },
            MessageType::Rwstat => ResponseBody::Wstat,
            other => return Err(CodecError::Unsupported(other as u8)),
        };
        Ok(Response { tag, body })
    }
}

/// Read the declared frame size from the first four bytes of a frame.
#[must_use]
pub fn frame_size(header: [u8; 4]) -> u32 {
    u32::from_le_bytes(header)
}

fn finish(ty: MessageType, payload: &[u8]) -> Result<Vec<u8>, CodecError> {
    let size = payload.len() + 5;
    let declared = u32::try_from(size).map_err(|_| CodecError::TooLarge(size))?;
    let mut buffer = Vec::with_capacity(size);
    buffer.extend_from_slice(&declared.to_le_bytes());
    buffer.push(ty as u8);
    buffer.extend_from_slice(payload);
    Ok(buffer)
}

fn decode_message(bytes: &[u8]) -> Result<(MessageType, &[u8]), CodecError> {
    let Some((header, rest)) = bytes.split_first_chunk::<4>() else {
        return Err(CodecError::Truncated);
    };
    let declared = frame_size(*header);
    if declared as usize != bytes.len() {
        return Err(CodecError::LengthMismatch {
            declared,
            actual: bytes.len(),
        });
    }
    let Some((&ty, payload)) = rest.split_first() else {
        return Err(CodecError::Truncated);
    };
    Ok((MessageType::try_from(ty)?, payload))
}

pub(crate) fn put_string(buffer: &mut Vec<u8>, value: &str) -> Result<(), CodecError> {
    let len = u16::try_from(value.len()).map_err(|_| CodecError::TooLarge(value.len()))?;
    buffer.extend_from_slice(&len.to_le_bytes());
    buffer.extend_from_slice(value.as_bytes());
    Ok(())
}

fn put_data(buffer: &mut Vec<u8>, data: &[u8]) -> Result<(), CodecError> {
    let count = u32::try_from(data.len()).map_err(|_| CodecError::TooLarge(data.len()))?;
    buffer.extend_from_slice(&count.to_le_bytes());
    buffer.extend_from_slice(data);
    Ok(())
}

pub(crate) fn put_qid(buffer: &mut Vec<u8>, qid: &Qid) {
    buffer.push(qid.ty.bits());
    buffer.extend_from_slice(&qid.version.to_le_bytes());
    buffer.extend_from_slice(&qid.path.to_le_bytes());
}

fn put_stat(buffer: &mut Vec<u8>, stat: &Stat) -> Result<(), CodecError> {
    let encoded = stat.to_bytes()?;
    let len = u16::try_from(encoded.len()).map_err(|_| CodecError::TooLarge(encoded.len()))?;
    buffer.extend_from_slice(&len.to_le_bytes());
    buffer.extend_from_slice(&encoded);
    Ok(())
}

fn read_exact<const N: usize>(cursor: &mut Cursor<&[u8]>) -> Result<[u8; N], CodecError> {
    let mut buf = [0u8; N];
    cursor
        .read_exact(&mut buf)
        .map_err(|_| CodecError::Truncated)?;
    Ok(buf)
}

pub(crate) fn read_u8(cursor: &mut Cursor<&[u8]>) -> Result<u8, CodecError> {
    Ok(read_exact::<1>(cursor)?[0])
}

pub(crate) fn read_u16(cursor: &mut Cursor<&[u8]>) -> Result<u16, CodecError> {
    Ok(u16::from_le_bytes(read_exact(cursor)?))
}

pub(crate) fn read_u32(cursor: &mut Cursor<&[u8]>) -> Result<u32, CodecError> {
    Ok(u32::from_le_bytes(read_exact(cursor)?))
}

pub(crate) fn read_u64(cursor: &mut Cursor<&[u8]>) -> Result<u64, CodecError> {
    Ok(u64::from_le_bytes(read_exact(cursor)?))
}

fn read_bytes(cursor: &mut Cursor<&[u8]>, len: usize) -> Result<Vec<u8>, CodecError> {
    let remaining = cursor.get_ref().len() - cursor.position() as usize;
    if len > remaining {
        return Err(CodecError::Truncated);
    }
    let mut buf = vec![0u8; len];
    cursor
        .read_exact(&mut buf)
        .map_err(|_| CodecError::Truncated)?;
    Ok(buf)
}

pub(crate) fn read_string(cursor: &mut Cursor<&[u8]>) -> Result<String, CodecError> {
    let len = read_u16(cursor)? as usize;
    let buf = read_bytes(cursor, len)?;
    String::from_utf8(buf).map_err(|_| CodecError::InvalidUtf8)
}

fn read_data(cursor: &mut Cursor<&[u8]>) -> Result<Vec<u8>, CodecError> {
    let count = read_u32(cursor)? as usize;
    read_bytes(cursor, count)
}

pub(crate) fn read_qid(cursor: &mut Cursor<&[u8]>) -> Result<Qid, CodecError> {
    let ty = QidType(read_u8(cursor)?);
    let version = read_u32(cursor)?;
    let path = read_u64(cursor)?;
    Ok(Qid { ty, version, path })
}

fn read_stat(cursor: &mut Cursor<&[u8]>) -> Result<Stat, CodecError> {
    let len = read_u16(cursor)? as usize;
    let raw = read_bytes(cursor, len)?;
    let mut inner = Cursor::new(raw.as_slice());
    let stat = Stat::decode(&mut inner)?;
    if inner.position() as usize != len {
        return Err(CodecError::LengthMismatch {
            declared: len as u32,
            actual: inner.position() as usize,
        });
    }
    Ok(stat)
}

fn validate_component(component: &str) -> Result<(), CodecError> {
    if component.is_empty()
        || component == "."
        || component.contains('/')
        || component.as_bytes().contains(&0)
    {
        return Err(CodecError::InvalidPath);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_stat(name: &str) -> Stat {
        Stat {
            ty: 0,
            dev: 0,
            qid: Qid::new(QidType::FILE, 0, 0x1122_3344_5566_7788),
            mode: 0o444,
            atime: 1,
            mtime: 2,
            length: 3,
            name: name.to_owned(),
            uid: "none".to_owned(),
            gid: "none".to_owned(),
            muid: "none".to_owned(),
        }
    }

    #[test]
    fn encode_decode_version_round_trip() {
        let codec = Codec;
        let request = Request {
            tag: NOTAG,
            body: RequestBody::Version {
                msize: MAX_MSIZE,
                version: VERSION.to_string(),
            },
        };
        let encoded = codec.encode_request(&request).unwrap();
        assert_eq!(frame_size(encoded[..4].try_into().unwrap()) as usize, encoded.len());
        assert_eq!(encoded[4], 100);
        assert_eq!(codec.decode_request(&encoded).unwrap(), request);
    }

    #[test]
    fn attach_layout_matches_classic_dialect() {
        let codec = Codec;
        let request = Request {
            tag: 3,
            body: RequestBody::Attach {
                fid: 1,
                afid: NOFID,
                uname: "u".to_owned(),
                aname: String::new(),
            },
        };
        let encoded = codec.encode_request(&request).unwrap();
        // size, type, tag, fid, afid, uname, aname and no numeric uid.
        assert_eq!(encoded.len(), 4 + 1 + 2 + 4 + 4 + 3 + 2);
    }

    #[test]
    fn error_response_carries_only_ename() {
        let codec = Codec;
        let response = Response {
            tag: 9,
            body: ResponseBody::error("file does not exist"),
        };
        let encoded = codec.encode_response(&response).unwrap();
        assert_eq!(encoded.len(), 4 + 1 + 2 + 2 + "file does not exist".len());
        assert_eq!(codec.decode_response(&encoded).unwrap(), response);
    }

    #[test]
    fn stat_response_has_nested_length_prefix() {
        let codec = Codec;
        let stat = sample_stat("a");
        let record = stat.to_bytes().unwrap();
        let encoded = codec
            .encode_response(&Response {
                tag: 1,
                body: ResponseBody::Stat { stat: stat.clone() },
            })
            .unwrap();
        let outer = u16::from_le_bytes([encoded[7], encoded[8]]) as usize;
        assert_eq!(outer, record.len());
        let inner = u16::from_le_bytes([encoded[9], encoded[10]]) as usize;
        assert_eq!(inner + 2, record.len());
        match codec.decode_response(&encoded).unwrap().body {
            ResponseBody::Stat { stat: decoded } => assert_eq!(decoded, stat),
            other => panic!("unexpected body {other:?}"),
        }
    }

    #[test]
    fn decode_all_splits_listing() {
        let mut listing = Vec::new();
        sample_stat("alpha").encode(&mut listing).unwrap();
        sample_stat("beta").encode(&mut listing).unwrap();
        let entries = Stat::decode_all(&listing).unwrap();
        let names: Vec<_> = entries.iter().map(|entry| entry.name.as_str()).collect();
        assert_eq!(names, ["alpha", "beta"]);
        assert!(Stat::decode_all(&listing[..listing.len() - 1]).is_err());
    }

    #[test]
    fn decode_rejects_length_mismatch() {
        let codec = Codec;
        let request = Request {
            tag: 2,
            body: RequestBody::Clunk { fid: 1 },
        };
        let mut encoded = codec.encode_request(&request).unwrap();
        encoded[0..4].copy_from_slice(&0u32.to_le_bytes());
        assert_eq!(
            codec.decode_request(&encoded),
            Err(CodecError::LengthMismatch {
                declared: 0,
                actual: encoded.len(),
            })
        );
    }

    #[test]
    fn walk_components_are_validated() {
        let codec = Codec;
        for bad in [".", "", "a/b"] {
            let request = Request {
                tag: 1,
                body: RequestBody::Walk {
                    fid: 1,
                    newfid: 2,
                    wnames: vec![bad.to_owned()],
                },
            };
            assert_eq!(codec.encode_request(&request), Err(CodecError::InvalidPath));
        }
        let request = Request {
            tag: 1,
            body: RequestBody::Walk {
                fid: 1,
                newfid: 2,
                wnames: vec!["x".to_owned(); MAX_WELEM + 1],
            },
        };
        assert_eq!(
            codec.encode_request(&request),
            Err(CodecError::TooManyElements(MAX_WELEM + 1))
        );
    }

    #[test]
    fn decode_request_reports_truncated_payload() {
        let codec = Codec;
        let mut frame = Vec::new();
        frame.extend_from_slice(&[0u8; 4]);
        frame.push(110); // Twalk opcode
        frame.extend_from_slice(&1u16.to_le_bytes()); // tag
        frame.extend_from_slice(&1u32.to_le_bytes()); // fid
        frame.extend_from_slice(&2u32.to_le_bytes()); // newfid
        frame.extend_from_slice(&1u16.to_le_bytes()); // one path component
        frame.extend_from_slice(&5u16.to_le_bytes()); // declared length 5
        frame.extend_from_slice(b"abc"); // missing two bytes
        let size = frame.len() as u32;
        frame[0..4].copy_from_slice(&size.to_le_bytes());
        assert_eq!(codec.decode_request(&frame), Err(CodecError::Truncated));
    }

    #[test]
    fn oversized_write_count_is_truncated_not_allocated() {
        let codec = Codec;
        let mut frame = Vec::new();
        frame.extend_from_slice(&[0u8; 4]);
        frame.push(118);
        frame.extend_from_slice(&1u16.to_le_bytes());
        frame.extend_from_slice(&1u32.to_le_bytes());
        frame.extend_from_slice(&0u64.to_le_bytes());
        frame.extend_from_slice(&u32::MAX.to_le_bytes());
        let size = frame.len() as u32;
        frame[0..4].copy_from_slice(&size.to_le_bytes());
        assert_eq!(codec.decode_request(&frame), Err(CodecError::Truncated));
    }

    #[test]
    fn unknown_opcode_is_unsupported() {
        let codec = Codec;
        let mut frame = vec![7, 0, 0, 0, 42];
        frame.extend_from_slice(&1u16.to_le_bytes());
        assert_eq!(codec.decode_request(&frame), Err(CodecError::Unsupported(42)));
        frame[4] = 101;
        assert_eq!(codec.decode_request(&frame), Err(CodecError::Unsupported(101)));
    }

    #[test]
    fn open_mode_write_detection() {
        assert!(!OpenMode::read_only().allows_write());
        assert!(OpenMode::write_only().allows_write());
        assert!(OpenMode::read_write().allows_write());
        assert!(OpenMode::from_bits(0x10).allows_write());
        assert_eq!(OpenMode::from_bits(0x43).raw(), 0x43);
    }
}
