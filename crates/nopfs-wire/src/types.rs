// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Define 9P2000 wire types, directory records and protocol constants.
// Author: Lukas Bower
#![allow(clippy::module_name_repetitions)]

//! 9P2000 data model definitions shared by the codec, the session binding and
//! test clients.

use std::io::Cursor;

use crate::codec::{put_qid, put_string, read_qid, read_string, read_u16, read_u32, read_u64};

/// Default maximum message size offered by nopfs servers.
pub const MAX_MSIZE: u32 = 8192;

/// Protocol version string.
pub const VERSION: &str = "9P2000";

/// Version string returned when the client speaks a dialect we do not.
pub const UNKNOWN_VERSION: &str = "unknown";

/// Tag reserved for `Tversion`.
pub const NOTAG: u16 = u16::MAX;

/// Fid value meaning "no fid", used for the attach afid.
pub const NOFID: u32 = u32::MAX;

/// Maximum number of path components carried by a single `Twalk`.
pub const MAX_WELEM: usize = 16;

/// Header bytes preceding the payload of `Rread`/`Twrite`.
pub const IOHDRSZ: u32 = 24;

/// Directory bit in the stat mode field.
pub const DMDIR: u32 = 0x8000_0000;

/// Possible errors produced while encoding or decoding 9P messages.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CodecError {
    /// Input buffer was shorter than the declared frame length.
    #[error("truncated frame")]
    Truncated,
    /// Encountered an unknown message type.
    #[error("unsupported message type {0}")]
    Unsupported(u8),
    /// Encountered malformed UTF-8 data.
    #[error("invalid utf8 in string field")]
    InvalidUtf8,
    /// Declared message size does not match the actual payload length.
    #[error("length mismatch: declared {declared} actual {actual}")]
    LengthMismatch {
        /// Message length declared in the frame header.
        declared: u32,
        /// Actual byte length observed in the payload.
        actual: usize,
    },
    /// Detected an invalid path component.
    #[error("invalid path component")]
    InvalidPath,
    /// A walk carried more components than a single message may hold.
    #[error("walk of {0} elements exceeds the protocol limit")]
    TooManyElements(usize),
    /// A field or frame does not fit its length prefix.
    #[error("field of {0} bytes does not fit its length prefix")]
    TooLarge(usize),
}

/// Qid type bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QidType(pub(crate) u8);

impl QidType {
    /// Directory bit.
    pub const DIR: Self = Self(0x80);
    /// Regular file.
    pub const FILE: Self = Self(0x00);

    /// Raw bit representation.
    #[must_use]
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Check whether the Qid represents a directory.
    #[must_use]
    pub fn is_dir(self) -> bool {
        self.0 & Self::DIR.0 != 0
    }
}

impl From<QidType> for u8 {
    fn from(value: QidType) -> Self {
        value.0
    }
}

/// 9P Qid descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Qid {
    pub(crate) ty: QidType,
    pub(crate) version: u32,
    pub(crate) path: u64,
}

impl Qid {
    /// Construct a new Qid.
    #[must_use]
    pub fn new(ty: QidType, version: u32, path: u64) -> Self {
        Self { ty, version, path }
    }

    /// Return the Qid type flags.
    #[must_use]
    pub fn ty(&self) -> QidType {
        self.ty
    }

    /// Return the Qid version field.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Return the Qid path field.
    #[must_use]
    pub fn path(&self) -> u64 {
        self.path
    }
}

/// Base access requested by `Topen`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpenModeBase {
    /// `OREAD`.
    ReadOnly = 0,
    /// `OWRITE`.
    WriteOnly = 1,
    /// `ORDWR`.
    ReadWrite = 2,
    /// `OEXEC`.
    Execute = 3,
}

/// 9P2000 open mode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenMode {
    base: OpenModeBase,
    flags: u8,
}

impl OpenMode {
    const TRUNCATE: u8 = 0x10;

    /// `OREAD`.
    #[must_use]
    pub fn read_only() -> Self {
        Self::from_bits(0)
    }

    /// `OWRITE`.
    #[must_use]
    pub fn write_only() -> Self {
        Self::from_bits(1)
    }

    /// `ORDWR`.
    #[must_use]
    pub fn read_write() -> Self {
        Self::from_bits(2)
    }

    /// Parse the wire byte. Modifier bits other than the access mode are kept
    /// verbatim so they re-encode unchanged.
    #[must_use]
    pub fn from_bits(value: u8) -> Self {
        let base = match value & 0x03 {
            0 => OpenModeBase::ReadOnly,
            1 => OpenModeBase::WriteOnly,
            2 => OpenModeBase::ReadWrite,
            _ => OpenModeBase::Execute,
        };
        Self {
            base,
            flags: value & !0x03,
        }
    }

    /// Base access mode.
    #[must_use]
    pub fn base(self) -> OpenModeBase {
        self.base
    }

    /// Determine if the mode asks for write access, truncation included.
    #[must_use]
    pub fn allows_write(self) -> bool {
        matches!(self.base, OpenModeBase::WriteOnly | OpenModeBase::ReadWrite)
            || self.flags & Self::TRUNCATE != 0
    }

    /// Expose the raw flag representation used on the wire.
    #[must_use]
    pub fn raw(self) -> u8 {
        self.base as u8 | self.flags
    }
}

impl From<OpenMode> for u8 {
    fn from(value: OpenMode) -> Self {
        value.raw()
    }
}

/// Directory entry record, as returned by `Rstat` and concatenated in
/// directory reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stat {
    /// Server type, unused.
    pub ty: u16,
    /// Server device, unused.
    pub dev: u32,
    /// Identity of the entry.
    pub qid: Qid,
    /// Permission bits, with [`DMDIR`] set for directories.
    pub mode: u32,
    /// Last access time, seconds since the epoch.
    pub atime: u32,
    /// Last modification time, seconds since the epoch.
    pub mtime: u32,
    /// Length in bytes.
    pub length: u64,
    /// Final path component.
    pub name: String,
    /// Owner.
    pub uid: String,
    /// Group.
    pub gid: String,
    /// Last modifier.
    pub muid: String,
}

impl Stat {
    /// Append the record, including its leading size field, to `buffer`.
    pub fn encode(&self, buffer: &mut Vec<u8>) -> Result<(), CodecError> {
        let mut body = Vec::with_capacity(64);
        body.extend_from_slice(&self.ty.to_le_bytes());
        body.extend_from_slice(&self.dev.to_le_bytes());
        put_qid(&mut body, &self.qid);
        body.extend_from_slice(&self.mode.to_le_bytes());
        body.extend_from_slice(&self.atime.to_le_bytes());
        body.extend_from_slice(&self.mtime.to_le_bytes());
        body.extend_from_slice(&self.length.to_le_bytes());
        put_string(&mut body, &self.name)?;
        put_string(&mut body, &self.uid)?;
        put_string(&mut body, &self.gid)?;
        put_string(&mut body, &self.muid)?;
        let size = u16::try_from(body.len()).map_err(|_| CodecError::TooLarge(body.len()))?;
        buffer.extend_from_slice(&size.to_le_bytes());
        buffer.extend_from_slice(&body);
        Ok(())
    }

    /// Encode the record into a fresh buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        let mut buffer = Vec::new();
        self.encode(&mut buffer)?;
        Ok(buffer)
    }

    /// Decode one record from the front of `cursor`.
    pub fn decode(cursor: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let size = read_u16(cursor)? as usize;
        let start = cursor.position() as usize;
        let stat = Stat {
            ty: read_u16(cursor)?,
            dev: read_u32(cursor)?,
            qid: read_qid(cursor)?,
            mode: read_u32(cursor)?,
            atime: read_u32(cursor)?,
            mtime: read_u32(cursor)?,
            length: read_u64(cursor)?,
            name: read_string(cursor)?,
            uid: read_string(cursor)?,
            gid: read_string(cursor)?,
            muid: read_string(cursor)?,
        };
        let consumed = cursor.position() as usize - start;
        if consumed != size {
            return Err(CodecError::LengthMismatch {
                declared: size as u32,
                actual: consumed,
            });
        }
        Ok(stat)
    }

    /// Split a directory read payload into its records.
    pub fn decode_all(bytes: &[u8]) -> Result<Vec<Self>, CodecError> {
        let mut cursor = Cursor::new(bytes);
        let mut entries = Vec::new();
        while (cursor.position() as usize) < bytes.len() {
            entries.push(Self::decode(&mut cursor)?);
        }
        Ok(entries)
    }

    /// Check whether the record describes a directory.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.mode & DMDIR != 0
    }
}

/// Request envelope containing a tag and message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Request identifier, echoed back by responses.
    pub tag: u16,
    /// The concrete request payload.
    pub body: RequestBody,
}

/// Response envelope containing a tag and message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Response identifier (mirrors the request tag).
    pub tag: u16,
    /// The concrete response payload.
    pub body: ResponseBody,
}

/// 9P2000 requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// `Tversion` negotiates the message size and version string.
    Version {
        /// Requested maximum message size.
        msize: u32,
        /// Protocol version string supplied by the client.
        version: String,
    },
    /// `Tauth` requests an authentication fid.
    Auth {
        /// Fid the client wants to use for authentication.
        afid: u32,
        /// User name string provided by the client.
        uname: String,
        /// Attachment name supplied by the client.
        aname: String,
    },
    /// `Tattach` binds a fid to the tree root.
    Attach {
        /// Fid identifier associated with the root.
        fid: u32,
        /// Authentication fid, [`NOFID`] when absent.
        afid: u32,
        /// User name string provided by the client.
        uname: String,
        /// Attachment name supplied by the client.
        aname: String,
    },
    /// `Tflush` cancels an outstanding request.
    Flush {
        /// Tag of the request to cancel.
        oldtag: u16,
    },
    /// `Twalk` traverses the namespace to produce a new fid.
    Walk {
        /// Source fid for the walk operation.
        fid: u32,
        /// Destination fid receiving the walk result.
        newfid: u32,
        /// Path components to traverse.
        wnames: Vec<String>,
    },
    /// `Topen` opens an existing fid.
    Open {
        /// Fid to open.
        fid: u32,
        /// Requested open mode.
        mode: OpenMode,
    },
    /// `Tcreate` asks for a new file inside a directory fid.
    Create {
        /// Directory fid.
        fid: u32,
        /// Name of the new entry.
        name: String,
        /// Permission bits.
        perm: u32,
        /// Open mode for the created file.
        mode: OpenMode,
    },
    /// `Tread` reads bytes from an opened fid.
    Read {
        /// Fid to read from.
        fid: u32,
        /// Byte offset provided by the client.
        offset: u64,
        /// Number of bytes requested by the client.
        count: u32,
    },
    /// `Twrite` writes bytes to an opened fid.
    Write {
        /// Fid to write to.
        fid: u32,
        /// Byte offset provided by the client.
        offset: u64,
        /// Payload.
        data: Vec<u8>,
    },
    /// `Tclunk` releases a fid.
    Clunk {
        /// Fid to release.
        fid: u32,
    },
    /// `Tremove` removes the file behind a fid and releases the fid.
    Remove {
        /// Fid to remove.
        fid: u32,
    },
    /// `Tstat` requests the directory entry of a fid.
    Stat {
        /// Fid to describe.
        fid: u32,
    },
    /// `Twstat` updates the directory entry of a fid.
    Wstat {
        /// Fid to update.
        fid: u32,
        /// Requested entry values.
        stat: Stat,
    },
}

impl RequestBody {
    /// Fid the request operates on, if any.
    #[must_use]
    pub fn fid(&self) -> Option<u32> {
        match self {
            Self::Attach { fid, .. }
            | Self::Walk { fid, .. }
            | Self::Open { fid, .. }
            | Self::Create { fid, .. }
            | Self::Read { fid, .. }
            | Self::Write { fid, .. }
            | Self::Clunk { fid }
            | Self::Remove { fid }
            | Self::Stat { fid }
            | Self::Wstat { fid, .. } => Some(*fid),
            Self::Version { .. } | Self::Auth { .. } | Self::Flush { .. } => None,
        }
    }
}

/// 9P2000 responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBody {
    /// `Rversion` returning negotiated parameters.
    Version {
        /// Negotiated message size.
        msize: u32,
        /// Protocol version accepted by the server.
        version: String,
    },
    /// `Rattach` acknowledging the attach with a root Qid.
    Attach {
        /// Qid associated with the attached fid.
        qid: Qid,
    },
    /// `Rerror` carrying the error string.
    Error {
        /// Error name shown to the client.
        ename: String,
    },
    /// `Rflush` acknowledging a flush.
    Flush,
    /// `Rwalk` returning the resulting Qids.
    Walk {
        /// Qids for each traversed path component.
        qids: Vec<Qid>,
    },
    /// `Ropen` confirming an opened fid.
    Open {
        /// Qid describing the opened node.
        qid: Qid,
        /// Server-selected I/O unit size, 0 for "use msize".
        iounit: u32,
    },
    /// `Rcreate` confirming a created file.
    Create {
        /// Qid describing the created node.
        qid: Qid,
        /// Server-selected I/O unit size.
        iounit: u32,
    },
    /// `Rread` returning the requested bytes.
    Read {
        /// Bytes read from the fid.
        data: Vec<u8>,
    },
    /// `Rwrite` returning the committed byte count.
    Write {
        /// Number of bytes accepted by the server.
        count: u32,
    },
    /// `Rclunk` acknowledging fid release.
    Clunk,
    /// `Rremove` acknowledging removal.
    Remove,
    /// `Rstat` carrying the directory entry.
    Stat {
        /// Directory entry of the fid.
        stat: Stat,
    },
    /// `Rwstat` acknowledging a metadata update.
    Wstat,
}

impl ResponseBody {
    /// Build an `Rerror` body.
    #[must_use]
    pub fn error(ename: impl Into<String>) -> Self {
        Self::Error {
            ename: ename.into(),
        }
    }
}
