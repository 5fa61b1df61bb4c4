// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Bind 9P2000 session operations onto the node tree.
// Author: Lukas Bower

//! Per-connection session binding.
//!
//! A [`Session`] owns the fid table of one client connection. Every fid is
//! bound to a private node handle cloned from the shared tree; releasing the
//! fid closes that handle. Requests may be handled concurrently from several
//! threads; the transport registers each one with [`Session::begin`] and
//! retires it with [`Session::finish`] once the reply is on the wire, which is
//! what `Tflush` waits for.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use log::{debug, info, trace};
use nopfs_wire::{
    OpenMode, Request, RequestBody, Response, ResponseBody, IOHDRSZ, NOFID, UNKNOWN_VERSION,
    VERSION,
};

use crate::error::{NopError, NopResult};
use crate::fid::{FidTable, InFlight, TagError};
use crate::node::{qid, stat, Node};
use crate::sync::lock;

/// Smallest msize a client may negotiate.
pub const MIN_MSIZE: u32 = 256;

/// One client connection's view of the tree.
pub struct Session {
    id: u64,
    root: Arc<dyn Node>,
    max_msize: u32,
    msize: AtomicU32,
    fids: Mutex<FidTable<Arc<dyn Node>>>,
    inflight: Mutex<InFlight>,
    settled: Condvar,
}

impl Session {
    /// Session serving `root`, offering at most `max_msize` bytes per message.
    pub fn new(id: u64, root: Arc<dyn Node>, max_msize: u32) -> Self {
        let max_msize = max_msize.max(MIN_MSIZE);
        Self {
            id,
            root,
            max_msize,
            msize: AtomicU32::new(max_msize),
            fids: Mutex::new(FidTable::new()),
            inflight: Mutex::new(InFlight::default()),
            settled: Condvar::new(),
        }
    }

    /// Session identifier used in logs.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Currently negotiated message size.
    #[must_use]
    pub fn msize(&self) -> u32 {
        self.msize.load(Ordering::Acquire)
    }

    /// Number of bound fids.
    #[must_use]
    pub fn bound_fids(&self) -> usize {
        lock(&self.fids).len()
    }

    /// Register an outstanding request.
    pub fn begin(&self, request: &Request) -> Result<(), TagError> {
        lock(&self.inflight).begin(request.tag, request.body.fid())
    }

    /// Retire an outstanding request after its reply has been sent.
    pub fn finish(&self, tag: u16) {
        lock(&self.inflight).finish(tag);
        self.settled.notify_all();
    }

    /// Register, handle and retire a request in one step.
    pub fn transact(&self, request: Request) -> Response {
        let tag = request.tag;
        if let Err(err) = self.begin(&request) {
            return Response {
                tag,
                body: ResponseBody::error(err.to_string()),
            };
        }
        let response = self.handle(request);
        self.finish(tag);
        response
    }

    /// Handle a request and build its reply. Failures become `Rerror`.
    pub fn handle(&self, request: Request) -> Response {
        let tag = request.tag;
        let result = match request.body {
            RequestBody::Version { msize, version } => Ok(self.handle_version(msize, &version)),
            RequestBody::Auth { afid, .. } => {
                debug!(target: "nopfs", "session {}: auth afid {} rejected", self.id, afid);
                Err(NopError::protocol("authentication not required"))
            }
            RequestBody::Attach {
                fid,
                afid,
                uname,
                aname,
            } => self.handle_attach(fid, afid, &uname, &aname),
            RequestBody::Flush { oldtag } => Ok(self.handle_flush(tag, oldtag)),
            RequestBody::Walk {
                fid,
                newfid,
                wnames,
            } => self.handle_walk(fid, newfid, &wnames),
            RequestBody::Open { fid, mode } => self.handle_open(fid, mode),
            RequestBody::Create { fid, name, .. } => {
                debug!(target: "nopfs", "session {}: create {} in fid {} rejected", self.id, name, fid);
                Err(NopError::InvalidOperation)
            }
            RequestBody::Read { fid, offset, count } => self.handle_read(fid, offset, count),
            RequestBody::Write { fid, offset, data } => self.handle_write(fid, offset, &data),
            RequestBody::Clunk { fid } => self.handle_clunk(fid),
            RequestBody::Remove { fid } => self.handle_remove(fid),
            RequestBody::Stat { fid } => self.node(fid).map(|node| ResponseBody::Stat {
                stat: stat(node.as_ref()),
            }),
            RequestBody::Wstat { fid, .. } => self.node(fid).map(|_| ResponseBody::Wstat),
        };
        let body = result.unwrap_or_else(|err| {
            debug!(target: "nopfs", "session {}: tag {} failed: {}", self.id, tag, err);
            ResponseBody::error(err.ename())
        });
        Response { tag, body }
    }

    /// Flush and close every bound handle. Called when the client goes away.
    pub fn shutdown(&self) {
        let released = lock(&self.fids).drain();
        if !released.is_empty() {
            debug!(target: "nopfs", "session {}: releasing {} fids", self.id, released.len());
        }
        for (_, node) in released {
            node.flush();
            node.close();
        }
    }

    fn node(&self, fid: u32) -> NopResult<Arc<dyn Node>> {
        lock(&self.fids)
            .get(fid)
            .cloned()
            .ok_or_else(|| NopError::protocol(format!("unknown fid {fid}")))
    }

    fn bind(&self, fid: u32, node: Arc<dyn Node>) {
        let previous = lock(&self.fids).insert(fid, node);
        if let Some(previous) = previous {
            previous.close();
        }
    }

    fn handle_version(&self, msize: u32, version: &str) -> ResponseBody {
        self.shutdown();
        let negotiated = msize.clamp(MIN_MSIZE, self.max_msize);
        self.msize.store(negotiated, Ordering::Release);
        let version = if version.starts_with(VERSION) {
            VERSION
        } else {
            UNKNOWN_VERSION
        };
        info!(target: "nopfs", "session {}: version {} msize {}", self.id, version, negotiated);
        ResponseBody::Version {
            msize: negotiated,
            version: version.to_owned(),
        }
    }

    fn handle_attach(
        &self,
        fid: u32,
        afid: u32,
        uname: &str,
        aname: &str,
    ) -> NopResult<ResponseBody> {
        if afid != NOFID {
            return Err(NopError::protocol("authentication not supported"));
        }
        if lock(&self.fids).contains(fid) {
            return Err(NopError::protocol(format!("fid {fid} already in use")));
        }
        let root: Arc<dyn Node> = Arc::from(self.root.clone_node());
        let qid = qid(root.as_ref());
        self.bind(fid, root);
        info!(target: "nopfs", "session {}: attach fid {} uname {:?} aname {:?}", self.id, fid, uname, aname);
        Ok(ResponseBody::Attach { qid })
    }

    fn handle_flush(&self, tag: u16, oldtag: u16) -> ResponseBody {
        let target = lock(&self.inflight).fid_of(oldtag);
        if let Some(node) = target.and_then(|fid| self.node(fid).ok()) {
            debug!(target: "nopfs", "session {}: flush tag {} at {}", self.id, oldtag, node.path());
            node.flush();
        }
        if oldtag != tag {
            let mut inflight = lock(&self.inflight);
            while inflight.is_pending(oldtag) {
                inflight = match self.settled.wait(inflight) {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
            }
        }
        ResponseBody::Flush
    }

    fn handle_walk(&self, fid: u32, newfid: u32, wnames: &[String]) -> NopResult<ResponseBody> {
        let start = self.node(fid)?;
        if newfid != fid && lock(&self.fids).contains(newfid) {
            return Err(NopError::protocol(format!("fid {newfid} already in use")));
        }
        debug!(target: "nopfs", "session {}: walk fid {} -> {} {:?}", self.id, fid, newfid, wnames);
        if wnames.is_empty() {
            self.bind(newfid, Arc::from(start.clone_node()));
            return Ok(ResponseBody::Walk { qids: Vec::new() });
        }
        let mut current = start;
        let mut qids = Vec::with_capacity(wnames.len());
        for (index, name) in wnames.iter().enumerate() {
            match Arc::clone(&current).walk(name) {
                Ok(next) => {
                    let next: Arc<dyn Node> = Arc::from(next);
                    qids.push(qid(next.as_ref()));
                    current = next;
                }
                Err(err) if index == 0 => return Err(err),
                Err(_) => return Ok(ResponseBody::Walk { qids }),
            }
        }
        self.bind(newfid, current);
        Ok(ResponseBody::Walk { qids })
    }

    fn handle_open(&self, fid: u32, mode: OpenMode) -> NopResult<ResponseBody> {
        let node = self.node(fid)?;
        if mode.allows_write() && (node.is_dir() || node.permissions() & 0o200 == 0) {
            return Err(NopError::InvalidOperation);
        }
        trace!(target: "nopfs", "session {}: open fid {} {} mode {:#x}", self.id, fid, node.path(), mode.raw());
        Ok(ResponseBody::Open {
            qid: qid(node.as_ref()),
            iounit: 0,
        })
    }

    fn handle_read(&self, fid: u32, offset: u64, count: u32) -> NopResult<ResponseBody> {
        let node = self.node(fid)?;
        let content = node.read_at(offset)?;
        let count = count.min(self.msize().saturating_sub(IOHDRSZ));
        let data = if node.is_dir() {
            directory_slice(&content, offset, count)
        } else {
            read_slice(&content, offset, count)
        };
        trace!(target: "nopfs", "session {}: read fid {} offset {} -> {} bytes", self.id, fid, offset, data.len());
        Ok(ResponseBody::Read { data })
    }

    fn handle_write(&self, fid: u32, offset: u64, data: &[u8]) -> NopResult<ResponseBody> {
        let node = self.node(fid)?;
        trace!(target: "nopfs", "session {}: write fid {} offset {} {} bytes", self.id, fid, offset, data.len());
        node.write(data)?;
        Ok(ResponseBody::Write {
            count: u32::try_from(data.len()).unwrap_or(u32::MAX),
        })
    }

    fn handle_clunk(&self, fid: u32) -> NopResult<ResponseBody> {
        let node = lock(&self.fids)
            .remove(fid)
            .ok_or_else(|| NopError::protocol(format!("unknown fid {fid}")))?;
        node.close();
        Ok(ResponseBody::Clunk)
    }

    fn handle_remove(&self, fid: u32) -> NopResult<ResponseBody> {
        self.handle_clunk(fid)?;
        Err(NopError::InvalidOperation)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Slice `data` at `offset`, returning at most `count` bytes.
#[must_use]
pub fn read_slice(data: &[u8], offset: u64, count: u32) -> Vec<u8> {
    let Ok(start) = usize::try_from(offset) else {
        return Vec::new();
    };
    if start >= data.len() {
        return Vec::new();
    }
    let end = start.saturating_add(count as usize).min(data.len());
    data[start..end].to_vec()
}

/// Slice a directory listing at `offset`, returning only whole records that
/// fit in `count` bytes.
#[must_use]
pub fn directory_slice(listing: &[u8], offset: u64, count: u32) -> Vec<u8> {
    let Ok(start) = usize::try_from(offset) else {
        return Vec::new();
    };
    let Some(rest) = listing.get(start..) else {
        return Vec::new();
    };
    let limit = count as usize;
    let mut end = 0usize;
    while let Some(header) = rest.get(end..end + 2) {
        let record = 2 + u16::from_le_bytes([header[0], header[1]]) as usize;
        let next = end + record;
        if next > limit || next > rest.len() {
            break;
        }
        end = next;
    }
    rest[..end].to_vec()
}
