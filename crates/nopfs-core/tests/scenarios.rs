// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Exercise end-to-end tree scenarios through an in-process session.
// Author: Lukas Bower
#![forbid(unsafe_code)]

use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use nopfs_core::{AnyDir, Client, Cmd, Dir, File, InProcessConnection, Node};
use nopfs_wire::{OpenMode, Stat, MAX_MSIZE};

fn connect(root: Arc<dyn Node>) -> Client<InProcessConnection> {
    let mut client = Client::new(InProcessConnection::new(root));
    client.version(MAX_MSIZE).expect("version");
    client.attach(1).expect("attach");
    client
}

fn listing(client: &mut Client<InProcessConnection>, names: &[&str]) -> Vec<String> {
    let bytes = client.read_path(1, 90, names).expect("read listing");
    Stat::decode_all(&bytes)
        .expect("decode listing")
        .into_iter()
        .map(|entry| entry.name)
        .collect()
}

#[test]
fn dir_with_single_file() {
    let root = Dir::new();
    root.append("a", File::new("x\n"));
    let mut client = connect(root);

    assert_eq!(listing(&mut client, &[]), ["a"]);
    assert_eq!(client.read_path(1, 2, &["a"]).expect("read a"), b"x\n");
}

#[test]
fn anydir_wildcard_subtree() {
    let root = Dir::new();
    let any = AnyDir::new();
    any.append("greeting", File::new("hi\n"));
    root.append("host", any);
    let mut client = connect(root);

    for first in ["anything", "example.org", "192.0.2.1"] {
        let data = client
            .read_path(1, 2, &["host", first, "greeting"])
            .expect("read greeting");
        assert_eq!(data, b"hi\n");
    }
}

#[test]
fn anydir_root_walks_in_one_request() {
    let any = AnyDir::new();
    any.append("greeting", File::new("hi\n"));
    let mut client = connect(any);
    let qids = client.walk(1, 2, &["anything", "greeting"]).expect("walk");
    assert_eq!(qids.len(), 2);
    assert!(qids[0].ty().is_dir());
    client.open(2, OpenMode::read_only()).expect("open");
    assert_eq!(client.read(2, 0, 64).expect("read"), b"hi\n");
}

#[test]
fn cmd_output_is_memoized_until_close() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let root = Dir::new();
    root.append(
        "uptime",
        Cmd::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            let mut command = Command::new("printf");
            command.arg("ok\\n");
            command
        }),
    );
    let mut client = connect(root);

    client.walk(1, 2, &["uptime"]).expect("walk");
    client.open(2, OpenMode::read_only()).expect("open");
    let first = client.read(2, 0, 64).expect("first read");
    let second = client.read(2, 0, 64).expect("second read");
    assert_eq!(first, b"ok\n");
    assert_eq!(first, second);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    client.clunk(2).expect("clunk");
    assert_eq!(client.read_path(1, 2, &["uptime"]).expect("reread"), b"ok\n");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn reset_control_clears_visited_names() {
    let root = Dir::new();
    let any = AnyDir::new();
    any.add_static("README.txt", File::new("wildcard host directory\n"));
    any.add_static("clear", AnyDir::reset_control());
    any.append("greeting", File::new("hi\n"));
    root.append("host", any);
    let mut client = connect(root);

    for name in ["one.example", "two.example", "three.example"] {
        client.walk(1, 2, &["host", name]).expect("visit");
        client.clunk(2).expect("clunk");
    }
    assert_eq!(
        listing(&mut client, &["host"]),
        ["README.txt", "clear", "one.example", "three.example", "two.example"]
    );

    client.walk(1, 3, &["host", "clear"]).expect("walk clear");
    client.open(3, OpenMode::write_only()).expect("open clear");
    assert_eq!(client.write(3, 0, b"flush please").expect("write"), 12);
    assert_eq!(client.read(3, 0, 16).expect("ack"), b"ok");
    client.clunk(3).expect("clunk clear");

    assert_eq!(listing(&mut client, &["host"]), ["README.txt", "clear"]);
    assert_eq!(
        client
            .read_path(1, 4, &["host", "two.example", "greeting"])
            .expect("still walkable"),
        b"hi\n"
    );
}

#[test]
fn directory_read_survives_a_wildcard_walk_between_chunks() {
    let any = AnyDir::new();
    any.add_static("README.txt", File::new("wildcard host directory\n"));
    let mut client = connect(any);
    for name in ["m1", "m2"] {
        client.walk(1, 2, &[name]).expect("visit");
        client.clunk(2).expect("clunk");
    }

    client.walk(1, 4, &[]).expect("walk reference");
    client.open(4, OpenMode::read_only()).expect("open reference");
    let entries = Stat::decode_all(&client.read_all(4, 8192).expect("reference"))
        .expect("decode reference");
    let mut head = Vec::new();
    for entry in &entries[..2] {
        entry.encode(&mut head).expect("encode");
    }

    client.walk(1, 2, &[]).expect("walk dir");
    client.open(2, OpenMode::read_only()).expect("open dir");
    let mut bytes = client
        .read(2, 0, head.len() as u32 + 8)
        .expect("first chunk");
    assert_eq!(bytes.len(), head.len());

    client.walk(1, 3, &["AAAA-new-host-name"]).expect("late visit");
    loop {
        let chunk = client.read(2, bytes.len() as u64, 8192).expect("next chunk");
        if chunk.is_empty() {
            break;
        }
        bytes.extend_from_slice(&chunk);
    }
    let names: Vec<String> = Stat::decode_all(&bytes)
        .expect("decode")
        .into_iter()
        .map(|entry| entry.name)
        .collect();
    assert_eq!(names, ["README.txt", "m1", "m2"]);

    let fresh: Vec<String> = Stat::decode_all(&client.read_all(2, 8192).expect("reread"))
        .expect("decode")
        .into_iter()
        .map(|entry| entry.name)
        .collect();
    assert_eq!(fresh, ["README.txt", "AAAA-new-host-name", "m1", "m2"]);
}
