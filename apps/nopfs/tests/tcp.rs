// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Exercise the TCP transport end to end against a loopback server.
// Author: Lukas Bower
#![forbid(unsafe_code)]

use std::env;
use std::fs;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::path::PathBuf;
use std::process::{self, Command};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use nopfs::NopServer;
use nopfs_core::{AnyDir, Client, ClientError, Cmd, Dir, File, Transport};
use nopfs_wire::{
    frame_size, Codec, OpenMode, Request, RequestBody, Response, ResponseBody, MAX_MSIZE, NOFID,
};

/// Client transport speaking 9P2000 frames over a socket.
struct TcpTransport {
    stream: TcpStream,
    codec: Codec,
}

impl TcpTransport {
    fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).expect("connect");
        stream
            .set_read_timeout(Some(Duration::from_secs(20)))
            .expect("read timeout");
        Self {
            stream,
            codec: Codec,
        }
    }

    fn send(&mut self, request: &Request) {
        let frame = self.codec.encode_request(request).expect("encode");
        self.stream.write_all(&frame).expect("write frame");
    }

    fn receive(&mut self) -> Response {
        let mut header = [0u8; 4];
        self.stream.read_exact(&mut header).expect("frame header");
        let mut frame = vec![0u8; frame_size(header) as usize];
        frame[..4].copy_from_slice(&header);
        self.stream.read_exact(&mut frame[4..]).expect("frame body");
        self.codec.decode_response(&frame).expect("decode")
    }
}

impl Transport for TcpTransport {
    fn exchange(&mut self, request: Request) -> Result<Response, ClientError> {
        self.send(&request);
        Ok(self.receive())
    }
}

fn shell(script: &'static str) -> Arc<Cmd> {
    Cmd::new(move |path| {
        let mut command = Command::new("sh");
        command
            .arg("-c")
            .arg(script)
            .arg("nopfs")
            .arg(path.get(1).unwrap_or("").to_owned());
        command
    })
}

fn start() -> SocketAddr {
    serve(|_| {})
}

/// Loopback server whose host directory can be extended by the caller.
fn serve(extend: impl FnOnce(&AnyDir)) -> SocketAddr {
    let root = Dir::new();
    root.append("README.txt", File::new("loopback\n"));
    let host = AnyDir::new();
    host.add_static("clear", AnyDir::reset_control());
    host.append("echo", shell("printf '%s\\n' \"$1\""));
    host.append("slow", shell("exec sleep 30"));
    extend(&host);
    root.append("host", host);
    let server = NopServer::bind("127.0.0.1:0", root, MAX_MSIZE).expect("bind");
    server.spawn().expect("spawn").local_addr()
}

fn connect(addr: SocketAddr) -> Client<TcpTransport> {
    let mut client = Client::new(TcpTransport::connect(addr));
    let (msize, version) = client.version(MAX_MSIZE).unwrap();
    assert_eq!(msize, MAX_MSIZE);
    assert_eq!(version, "9P2000");
    client.attach(0).unwrap();
    client
}

/// Negotiate, attach fid 0 and open `host/192.0.2.9/<leaf>` on fid 1.
fn open_on_host(transport: &mut TcpTransport, leaf: &str) {
    let setup = [
        RequestBody::Version {
            msize: MAX_MSIZE,
            version: "9P2000".to_owned(),
        },
        RequestBody::Attach {
            fid: 0,
            afid: NOFID,
            uname: "tester".to_owned(),
            aname: String::new(),
        },
        RequestBody::Walk {
            fid: 0,
            newfid: 1,
            wnames: vec!["host".to_owned(), "192.0.2.9".to_owned(), leaf.to_owned()],
        },
        RequestBody::Open {
            fid: 1,
            mode: OpenMode::read_only(),
        },
    ];
    for (tag, body) in setup.into_iter().enumerate() {
        let response = transport.exchange(Request { tag: tag as u16, body }).unwrap();
        assert!(!matches!(response.body, ResponseBody::Error { .. }), "{response:?}");
    }
}

#[test]
fn files_and_commands_are_served_over_tcp() {
    let addr = start();
    let mut client = connect(addr);
    assert_eq!(client.read_path(0, 1, &["README.txt"]).unwrap(), b"loopback\n");
    assert_eq!(
        client.read_path(0, 1, &["host", "192.0.2.9", "echo"]).unwrap(),
        b"192.0.2.9\n"
    );
    let stat = {
        client.walk(0, 2, &["host"]).unwrap();
        client.stat(2).unwrap()
    };
    assert!(stat.is_dir());
    assert_eq!(stat.name, "host");
    client.clunk(2).unwrap();
}

#[test]
fn connections_have_independent_fids() {
    let addr = start();
    let mut first = connect(addr);
    let mut second = connect(addr);
    first.walk(0, 5, &["README.txt"]).unwrap();
    second.walk(0, 5, &["host"]).unwrap();
    assert!(!first.stat(5).unwrap().is_dir());
    assert!(second.stat(5).unwrap().is_dir());
    let err = second.walk(0, 5, &["README.txt"]).unwrap_err();
    assert_eq!(err.remote(), Some("fid 5 already in use"));
}

#[test]
fn tflush_is_answered_after_the_cancelled_read() {
    let addr = start();
    let mut transport = TcpTransport::connect(addr);
    open_on_host(&mut transport, "slow");

    let begun = Instant::now();
    transport.send(&Request {
        tag: 10,
        body: RequestBody::Read {
            fid: 1,
            offset: 0,
            count: 512,
        },
    });
    thread::sleep(Duration::from_millis(300));
    transport.send(&Request {
        tag: 11,
        body: RequestBody::Flush { oldtag: 10 },
    });

    let cancelled = transport.receive();
    assert_eq!(cancelled.tag, 10);
    assert_eq!(cancelled.body, ResponseBody::error("file does not exist"));
    let flushed = transport.receive();
    assert_eq!(flushed.tag, 11);
    assert_eq!(flushed.body, ResponseBody::Flush);
    assert!(begun.elapsed() < Duration::from_secs(10));
}

#[test]
fn oversized_frame_closes_the_connection() {
    let addr = start();
    let mut stream = TcpStream::connect(addr).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(10)))
        .unwrap();
    stream.write_all(&(MAX_MSIZE + 1).to_le_bytes()).unwrap();
    let mut buf = [0u8; 16];
    assert_eq!(stream.read(&mut buf).unwrap(), 0);

    // The listener keeps serving other clients.
    let mut client = connect(addr);
    assert_eq!(client.read_path(0, 1, &["README.txt"]).unwrap(), b"loopback\n");
}

#[cfg(target_os = "linux")]
#[test]
fn dropped_connection_reaps_a_blocked_command() {
    let pidfile = env::temp_dir().join(format!("nopfs-tcp-{}.pid", process::id()));
    let _ = fs::remove_file(&pidfile);
    let target = pidfile.clone();
    let addr = serve(move |host| {
        host.append(
            "held",
            Cmd::new(move |_| {
                let mut command = Command::new("sh");
                command
                    .arg("-c")
                    .arg("echo $$ > \"$1\"; exec sleep 30")
                    .arg("nopfs")
                    .arg(&target);
                command
            }),
        );
    });

    let mut transport = TcpTransport::connect(addr);
    open_on_host(&mut transport, "held");
    transport.send(&Request {
        tag: 10,
        body: RequestBody::Read {
            fid: 1,
            offset: 0,
            count: 512,
        },
    });
    let begun = Instant::now();
    let pid = loop {
        let written = fs::read_to_string(&pidfile).unwrap_or_default();
        if let Ok(pid) = written.trim().parse::<u32>() {
            break pid;
        }
        assert!(begun.elapsed() < Duration::from_secs(5), "command never started");
        thread::sleep(Duration::from_millis(20));
    };
    drop(transport);

    let proc_entry = PathBuf::from(format!("/proc/{pid}"));
    let dropped = Instant::now();
    while proc_entry.exists() {
        assert!(
            dropped.elapsed() < Duration::from_secs(10),
            "pid {pid} outlived its connection"
        );
        thread::sleep(Duration::from_millis(50));
    }
    let _ = fs::remove_file(&pidfile);

    let mut client = connect(addr);
    assert_eq!(client.read_path(0, 1, &["README.txt"]).unwrap(), b"loopback\n");
}
