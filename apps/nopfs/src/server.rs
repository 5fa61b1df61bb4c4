// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Serve a nopfs tree to 9P2000 clients over TCP.
// Author: Lukas Bower

//! TCP transport.
//!
//! Each accepted connection gets its own [`Session`] and reader thread. The
//! reader decodes frames and hands every request except `Tversion` to a worker
//! thread, so a slow command read never blocks a `Tflush` aimed at it. Replies
//! share the socket behind a mutex and may go out in any order; clients match
//! them by tag.

use std::io::{self, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use log::{debug, info, trace, warn};
use nopfs_core::{Node, Session};
use nopfs_wire::{frame_size, Codec, CodecError, RequestBody, Response, ResponseBody};
use thiserror::Error;

/// Smallest frame that can carry a message: size, type and tag.
const MIN_FRAME: u32 = 7;

/// Errors raised by the transport.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listen address could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address requested.
        addr: String,
        /// Underlying failure.
        source: io::Error,
    },
    /// Socket I/O failed.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    /// A frame could not be decoded or encoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    /// A frame announced an impossible size.
    #[error("frame of {size} bytes outside [7, {limit}]")]
    FrameSize {
        /// Size announced by the frame header.
        size: u32,
        /// Negotiated message size.
        limit: u32,
    },
}

/// Listening 9P2000 server.
pub struct NopServer {
    listener: TcpListener,
    root: Arc<dyn Node>,
    msize: u32,
    sessions: AtomicU64,
}

/// Handle to a server accepting connections on a background thread.
pub struct ServerHandle {
    local_addr: SocketAddr,
    thread: JoinHandle<Result<(), ServerError>>,
}

impl ServerHandle {
    /// Address the server is bound to.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Wait for the accept loop to end.
    pub fn join(self) -> Result<(), ServerError> {
        self.thread
            .join()
            .unwrap_or_else(|_| Err(ServerError::Io(io::Error::other("accept thread panicked"))))
    }
}

impl NopServer {
    /// Bind `addr` to serve `root`, offering at most `msize` bytes per message.
    pub fn bind(addr: &str, root: Arc<dyn Node>, msize: u32) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr).map_err(|source| ServerError::Bind {
            addr: addr.to_owned(),
            source,
        })?;
        Ok(Self {
            listener,
            root,
            msize,
            sessions: AtomicU64::new(1),
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until the listener fails.
    pub fn serve(self) -> Result<(), ServerError> {
        info!(target: "nopfs", "listening on {}", self.local_addr()?);
        for stream in self.listener.incoming() {
            let stream = match stream {
                Ok(stream) => stream,
                Err(err) => {
                    warn!(target: "nopfs", "accept failed: {err}");
                    continue;
                }
            };
            let id = self.sessions.fetch_add(1, Ordering::Relaxed);
            let session = Arc::new(Session::new(id, Arc::clone(&self.root), self.msize));
            let spawned = thread::Builder::new()
                .name(format!("nopfs-session-{id}"))
                .spawn(move || {
                    let peer = stream
                        .peer_addr()
                        .map(|addr| addr.to_string())
                        .unwrap_or_else(|_| "unknown".to_owned());
                    info!(target: "nopfs", "session {id}: connected from {peer}");
                    match serve_connection(stream, &session) {
                        Ok(()) => info!(target: "nopfs", "session {id}: disconnected"),
                        Err(err) => warn!(target: "nopfs", "session {id}: closed: {err}"),
                    }
                });
            if let Err(err) = spawned {
                warn!(target: "nopfs", "session {id}: failed to start: {err}");
            }
        }
        Ok(())
    }

    /// Run [`NopServer::serve`] on a background thread.
    pub fn spawn(self) -> Result<ServerHandle, ServerError> {
        let local_addr = self.local_addr()?;
        let thread = thread::Builder::new()
            .name("nopfs-accept".to_owned())
            .spawn(move || self.serve())?;
        Ok(ServerHandle { local_addr, thread })
    }
}

type SharedWriter = Arc<Mutex<TcpStream>>;

/// Drive one connection until the peer hangs up, then release its fids.
pub fn serve_connection(stream: TcpStream, session: &Arc<Session>) -> Result<(), ServerError> {
    let writer: SharedWriter = Arc::new(Mutex::new(stream.try_clone()?));
    let mut reader = BufReader::new(stream);
    let codec = Codec;
    let mut workers: Vec<JoinHandle<()>> = Vec::new();

    let outcome = loop {
        let frame = match read_frame(&mut reader, session.msize()) {
            Ok(Some(frame)) => frame,
            Ok(None) => break Ok(()),
            Err(err) => break Err(err),
        };
        let request = match codec.decode_request(&frame) {
            Ok(request) => request,
            Err(err) => break Err(err.into()),
        };
        trace!(target: "nopfs", "session {}: <- {:?}", session.id(), request);

        if let RequestBody::Version { .. } = request.body {
            // Version aborts everything outstanding, so let in-flight work
            // drain before the session is reset.
            session.shutdown();
            join_all(&mut workers);
            let response = session.handle(request);
            if let Err(err) = send(&writer, &codec, &response) {
                break Err(err);
            }
            continue;
        }

        let tag = request.tag;
        if let Err(err) = session.begin(&request) {
            let response = Response {
                tag,
                body: ResponseBody::error(err.to_string()),
            };
            if let Err(err) = send(&writer, &codec, &response) {
                break Err(err);
            }
            continue;
        }

        let worker_session = Arc::clone(session);
        let worker_writer = Arc::clone(&writer);
        let spawned = thread::Builder::new()
            .name(format!("nopfs-session-{}-tag-{tag}", session.id()))
            .spawn(move || {
                let response = worker_session.handle(request);
                if let Err(err) = send(&worker_writer, &codec, &response) {
                    debug!(target: "nopfs", "session {}: reply to tag {tag} lost: {err}", worker_session.id());
                }
                worker_session.finish(tag);
            });
        match spawned {
            Ok(worker) => workers.push(worker),
            Err(err) => {
                session.finish(tag);
                break Err(err.into());
            }
        }
        workers.retain(|worker| !worker.is_finished());
    };

    // Flushing every fid kills running commands so blocked workers return.
    session.shutdown();
    join_all(&mut workers);
    outcome
}

fn join_all(workers: &mut Vec<JoinHandle<()>>) {
    for worker in workers.drain(..) {
        if worker.join().is_err() {
            warn!(target: "nopfs", "request worker panicked");
        }
    }
}

/// Read one frame, or `None` when the peer closed the connection cleanly.
fn read_frame<R: Read>(reader: &mut R, limit: u32) -> Result<Option<Vec<u8>>, ServerError> {
    let mut header = [0u8; 4];
    match reader.read_exact(&mut header) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(err) => return Err(err.into()),
    }
    let size = frame_size(header);
    if size < MIN_FRAME || size > limit {
        return Err(ServerError::FrameSize { size, limit });
    }
    let mut frame = vec![0u8; size as usize];
    frame[..4].copy_from_slice(&header);
    reader.read_exact(&mut frame[4..])?;
    Ok(Some(frame))
}

fn send(writer: &SharedWriter, codec: &Codec, response: &Response) -> Result<(), ServerError> {
    let frame = codec.encode_response(response)?;
    let mut stream = writer.lock().unwrap_or_else(PoisonError::into_inner);
    stream.write_all(&frame)?;
    stream.flush()?;
    Ok(())
}
