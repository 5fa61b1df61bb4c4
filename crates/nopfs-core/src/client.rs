// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Minimal 9P2000 client used to drive sessions in-process or over a transport.
// Author: Lukas Bower

//! A small synchronous client.
//!
//! [`Client`] issues one request at a time over any [`Transport`].
//! [`InProcessConnection`] is the transport that talks to a [`Session`]
//! directly, which is how the tree is exercised without sockets.

use std::io;
use std::sync::Arc;

use nopfs_wire::{
    CodecError, OpenMode, Qid, Request, RequestBody, Response, ResponseBody, Stat, MAX_MSIZE,
    NOFID, NOTAG, VERSION,
};
use thiserror::Error;

use crate::node::Node;
use crate::session::Session;

/// Errors surfaced by [`Client`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with `Rerror`.
    #[error("server error: {0}")]
    Remote(String),
    /// The server answered with a reply of the wrong type.
    #[error("unexpected response: {0}")]
    Unexpected(String),
    /// Frame encoding or decoding failed.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    /// The transport failed.
    #[error("transport error: {0}")]
    Io(#[from] io::Error),
}

impl ClientError {
    /// Error string of an `Rerror` reply.
    #[must_use]
    pub fn remote(&self) -> Option<&str> {
        match self {
            Self::Remote(ename) => Some(ename),
            _ => None,
        }
    }
}

/// Carries one request to a server and returns its reply.
pub trait Transport {
    /// Send `request` and wait for the matching reply.
    fn exchange(&mut self, request: Request) -> Result<Response, ClientError>;
}

/// Transport bound directly to a [`Session`].
pub struct InProcessConnection {
    session: Arc<Session>,
}

impl InProcessConnection {
    /// Open a session over `root`.
    pub fn new(root: Arc<dyn Node>) -> Self {
        Self {
            session: Arc::new(Session::new(0, root, MAX_MSIZE)),
        }
    }

    /// Borrow the underlying session.
    #[must_use]
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }
}

impl Transport for InProcessConnection {
    fn exchange(&mut self, request: Request) -> Result<Response, ClientError> {
        Ok(self.session.transact(request))
    }
}

/// Synchronous 9P2000 client.
pub struct Client<T> {
    transport: T,
    next_tag: u16,
}

impl<T: Transport> Client<T> {
    /// Wrap a transport.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            next_tag: 1,
        }
    }

    /// Borrow the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send one request body, returning the reply body or the remote error.
    pub fn call(&mut self, body: RequestBody) -> Result<ResponseBody, ClientError> {
        let tag = match body {
            RequestBody::Version { .. } => NOTAG,
            _ => self.allocate_tag(),
        };
        let response = self.transport.exchange(Request { tag, body })?;
        if response.tag != tag {
            return Err(ClientError::Unexpected(format!(
                "tag {} for request {}",
                response.tag, tag
            )));
        }
        match response.body {
            ResponseBody::Error { ename } => Err(ClientError::Remote(ename)),
            body => Ok(body),
        }
    }

    fn allocate_tag(&mut self) -> u16 {
        let tag = self.next_tag;
        self.next_tag = match self.next_tag.wrapping_add(1) {
            NOTAG => 1,
            next => next,
        };
        tag
    }

    /// Negotiate the protocol version.
    pub fn version(&mut self, msize: u32) -> Result<(u32, String), ClientError> {
        match self.call(RequestBody::Version {
            msize,
            version: VERSION.to_owned(),
        })? {
            ResponseBody::Version { msize, version } => Ok((msize, version)),
            other => Err(unexpected(other)),
        }
    }

    /// Attach `fid` to the root.
    pub fn attach(&mut self, fid: u32) -> Result<Qid, ClientError> {
        match self.call(RequestBody::Attach {
            fid,
            afid: NOFID,
            uname: "nopfs".to_owned(),
            aname: String::new(),
        })? {
            ResponseBody::Attach { qid } => Ok(qid),
            other => Err(unexpected(other)),
        }
    }

    /// Walk from `fid` to `newfid` through `names`.
    pub fn walk(&mut self, fid: u32, newfid: u32, names: &[&str]) -> Result<Vec<Qid>, ClientError> {
        match self.call(RequestBody::Walk {
            fid,
            newfid,
            wnames: names.iter().map(|name| (*name).to_owned()).collect(),
        })? {
            ResponseBody::Walk { qids } => Ok(qids),
            other => Err(unexpected(other)),
        }
    }

    /// Open `fid`.
    pub fn open(&mut self, fid: u32, mode: OpenMode) -> Result<Qid, ClientError> {
        match self.call(RequestBody::Open { fid, mode })? {
            ResponseBody::Open { qid, .. } => Ok(qid),
            other => Err(unexpected(other)),
        }
    }

    /// Read up to `count` bytes at `offset`.
    pub fn read(&mut self, fid: u32, offset: u64, count: u32) -> Result<Vec<u8>, ClientError> {
        match self.call(RequestBody::Read { fid, offset, count })? {
            ResponseBody::Read { data } => Ok(data),
            other => Err(unexpected(other)),
        }
    }

    /// Read from offset 0 until the server returns an empty chunk.
    pub fn read_all(&mut self, fid: u32, chunk: u32) -> Result<Vec<u8>, ClientError> {
        let mut content = Vec::new();
        loop {
            let data = self.read(fid, content.len() as u64, chunk)?;
            if data.is_empty() {
                return Ok(content);
            }
            content.extend_from_slice(&data);
        }
    }

    /// Write `data` at `offset`.
    pub fn write(&mut self, fid: u32, offset: u64, data: &[u8]) -> Result<u32, ClientError> {
        match self.call(RequestBody::Write {
            fid,
            offset,
            data: data.to_vec(),
        })? {
            ResponseBody::Write { count } => Ok(count),
            other => Err(unexpected(other)),
        }
    }

    /// Fetch the directory entry of `fid`.
    pub fn stat(&mut self, fid: u32) -> Result<Stat, ClientError> {
        match self.call(RequestBody::Stat { fid })? {
            ResponseBody::Stat { stat } => Ok(stat),
            other => Err(unexpected(other)),
        }
    }

    /// Release `fid`.
    pub fn clunk(&mut self, fid: u32) -> Result<(), ClientError> {
        match self.call(RequestBody::Clunk { fid })? {
            ResponseBody::Clunk => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Walk from `root` to a scratch fid, read the whole file and clunk it.
    pub fn read_path(&mut self, root: u32, scratch: u32, names: &[&str]) -> Result<Vec<u8>, ClientError> {
        self.walk(root, scratch, names)?;
        let outcome = self
            .open(scratch, OpenMode::read_only())
            .and_then(|_| self.read_all(scratch, MAX_MSIZE));
        self.clunk(scratch)?;
        outcome
    }
}

fn unexpected(body: ResponseBody) -> ClientError {
    ClientError::Unexpected(format!("{body:?}"))
}
