// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Validate the 9P2000 session state machine over an in-process connection.
// Author: Lukas Bower
#![forbid(unsafe_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use nopfs_core::{
    AnyDir, Client, ClientError, Dir, File, Fun, InProcessConnection, Node, NodePath, NopError,
};
use nopfs_wire::{OpenMode, RequestBody, ResponseBody, Stat, DMDIR, IOHDRSZ, MAX_MSIZE};

fn tree() -> Arc<Dir> {
    let root = Dir::new();
    root.append("README.txt", File::new("read me\n"));
    let host = AnyDir::new();
    host.add_static("clear", AnyDir::reset_control());
    host.append("name", Fun::new(|path: &NodePath| Ok(format!("{}\n", path.get(1).unwrap_or("?")).into_bytes())));
    root.append("host", host);
    root
}

fn connect(root: Arc<dyn Node>) -> Client<InProcessConnection> {
    let mut client = Client::new(InProcessConnection::new(root));
    client.version(MAX_MSIZE).expect("version");
    client.attach(1).expect("attach");
    client
}

fn remote(err: ClientError) -> String {
    err.remote().expect("remote error").to_owned()
}

#[test]
fn version_negotiates_dialect_and_msize() {
    let mut client = Client::new(InProcessConnection::new(tree()));
    assert_eq!(client.version(4096).unwrap(), (4096, "9P2000".to_owned()));
    assert_eq!(client.version(1 << 20).unwrap(), (MAX_MSIZE, "9P2000".to_owned()));
    match client
        .call(RequestBody::Version {
            msize: 4096,
            version: "9P1999".to_owned(),
        })
        .unwrap()
    {
        ResponseBody::Version { version, .. } => assert_eq!(version, "unknown"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn version_releases_bound_fids() {
    let mut client = connect(tree());
    client.walk(1, 2, &["README.txt"]).unwrap();
    assert_eq!(client.transport().session().bound_fids(), 2);
    client.version(MAX_MSIZE).unwrap();
    assert_eq!(client.transport().session().bound_fids(), 0);
}

#[test]
fn attach_rejects_authentication() {
    let mut client = Client::new(InProcessConnection::new(tree()));
    client.version(MAX_MSIZE).unwrap();
    let err = client
        .call(RequestBody::Attach {
            fid: 1,
            afid: 5,
            uname: "u".to_owned(),
            aname: String::new(),
        })
        .unwrap_err();
    assert_eq!(remote(err), "authentication not supported");
    let err = client
        .call(RequestBody::Auth {
            afid: 5,
            uname: "u".to_owned(),
            aname: String::new(),
        })
        .unwrap_err();
    assert!(err.remote().is_some());
    let qid = client.attach(1).unwrap();
    assert!(qid.ty().is_dir());
    assert_eq!(qid.path(), NodePath::root().identity());
}

#[test]
fn walk_reports_partial_progress() {
    let mut client = connect(tree());
    let err = client.walk(1, 2, &["missing"]).unwrap_err();
    assert_eq!(remote(err), NopError::NotFound.ename());

    let qids = client.walk(1, 2, &["README.txt", "deeper"]).unwrap();
    assert_eq!(qids.len(), 1);
    assert!(client.stat(2).is_err(), "partial walk must not bind newfid");

    let qids = client.walk(1, 2, &["host", "example.org", "name"]).unwrap();
    assert_eq!(qids.len(), 3);
    assert_eq!(
        qids[2].path(),
        NodePath::from_components(["host", "example.org", "name"]).identity()
    );
}

#[test]
fn walk_to_bound_newfid_is_rejected_but_self_walk_rebinds() {
    let mut client = connect(tree());
    client.walk(1, 2, &["host"]).unwrap();
    let err = client.walk(1, 2, &["README.txt"]).unwrap_err();
    assert!(remote(err).contains("already in use"));

    client.walk(2, 2, &["example.org"]).unwrap();
    assert_eq!(client.stat(2).unwrap().name, "example.org");
}

#[test]
fn empty_walk_clones_the_fid() {
    let mut client = connect(tree());
    assert!(client.walk(1, 2, &[]).unwrap().is_empty());
    let stat = client.stat(2).unwrap();
    assert_eq!(stat.name, "/");
    assert_eq!(stat.mode, 0o555 | DMDIR);
    assert_eq!(stat.uid, "none");
}

#[test]
fn stat_reports_leaf_metadata() {
    let mut client = connect(tree());
    client.walk(1, 2, &["README.txt"]).unwrap();
    let stat = client.stat(2).unwrap();
    assert_eq!(stat.name, "README.txt");
    assert_eq!(stat.length, 8);
    assert_eq!(stat.mode, 0o444);
    assert!(!stat.qid.ty().is_dir());
    assert!(stat.mtime > 0);
}

#[test]
fn write_modes_follow_permission_bits() {
    let mut client = connect(tree());
    client.walk(1, 2, &["README.txt"]).unwrap();
    let err = client.open(2, OpenMode::write_only()).unwrap_err();
    assert_eq!(remote(err), "permission denied");
    client.open(2, OpenMode::read_only()).unwrap();
    let err = client.write(2, 0, b"nope").unwrap_err();
    assert_eq!(remote(err), "permission denied");

    let err = client.open(1, OpenMode::read_write()).unwrap_err();
    assert_eq!(remote(err), "permission denied");
}

#[test]
fn create_remove_and_wstat() {
    let mut client = connect(tree());
    let err = client
        .call(RequestBody::Create {
            fid: 1,
            name: "new".to_owned(),
            perm: 0o644,
            mode: OpenMode::read_write(),
        })
        .unwrap_err();
    assert_eq!(remote(err), "permission denied");

    client.walk(1, 2, &["README.txt"]).unwrap();
    let stat = client.stat(2).unwrap();
    assert_eq!(
        client.call(RequestBody::Wstat { fid: 2, stat }).unwrap(),
        ResponseBody::Wstat
    );
    assert!(client.call(RequestBody::Remove { fid: 2 }).is_err());
    let err = client.stat(2).unwrap_err();
    assert!(remote(err).contains("unknown fid"));
}

#[test]
fn clunk_resets_function_memo() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let root = Dir::new();
    root.append(
        "count",
        Fun::new(move |_: &NodePath| {
            let call = counter.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("{call}\n").into_bytes())
        }),
    );
    let mut client = connect(root);
    assert_eq!(client.read_path(1, 2, &["count"]).unwrap(), b"1\n");
    assert_eq!(client.read_path(1, 2, &["count"]).unwrap(), b"2\n");
    assert!(client.clunk(2).is_err(), "fid already clunked");
}

#[test]
fn reads_honour_offset_and_msize() {
    let big = vec![b'z'; 3000];
    let root = Dir::new();
    root.append("big", File::new(big.clone()));
    let mut client = Client::new(InProcessConnection::new(root));
    client.version(1024).unwrap();
    client.attach(1).unwrap();
    client.walk(1, 2, &["big"]).unwrap();
    client.open(2, OpenMode::read_only()).unwrap();
    let chunk = client.read(2, 0, 4096).unwrap();
    assert_eq!(chunk.len(), (1024 - IOHDRSZ) as usize);
    assert_eq!(client.read(2, 2990, 100).unwrap().len(), 10);
    assert!(client.read(2, 5000, 100).unwrap().is_empty());
    assert_eq!(client.read_all(2, 4096).unwrap(), big);
}

#[test]
fn directory_reads_split_on_record_boundaries() {
    let root = Dir::new();
    for index in 0..40 {
        root.append(format!("entry-{index:02}"), File::new("x"));
    }
    let mut client = Client::new(InProcessConnection::new(root));
    client.version(512).unwrap();
    client.attach(1).unwrap();
    client.walk(1, 2, &[]).unwrap();
    client.open(2, OpenMode::read_only()).unwrap();
    let first = client.read(2, 0, 512).unwrap();
    assert!(!first.is_empty());
    assert!(Stat::decode_all(&first).is_ok());
    let all = client.read_all(2, 512).unwrap();
    let entries = Stat::decode_all(&all).unwrap();
    assert_eq!(entries.len(), 40);
    assert_eq!(entries[0].name, "entry-00");
}

#[test]
fn unknown_fid_is_a_protocol_error() {
    let mut client = connect(tree());
    let err = client.read(42, 0, 10).unwrap_err();
    assert_eq!(remote(err), "unknown fid 42");
}
