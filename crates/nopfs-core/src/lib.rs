// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Expose the nopfs virtual filesystem dispatch engine.
// Author: Lukas Bower
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Virtual filesystem dispatch engine for nopfs.
//!
//! Trees are assembled once at start-up from [`Dir`], [`AnyDir`], [`File`],
//! [`Fun`], [`Cmd`] and [`Ctl`] templates, then served to every client through
//! a per-connection [`Session`] that binds fids to private node handles.

pub mod anydir;
pub mod client;
pub mod cmd;
pub mod ctl;
pub mod dir;
pub mod error;
pub mod fid;
pub mod file;
pub mod fun;
pub mod node;
pub mod path;
pub mod session;
mod sync;

pub use anydir::{reset_history, AnyDir};
pub use client::{Client, ClientError, InProcessConnection, Transport};
pub use cmd::{Cmd, CommandBuilder};
pub use ctl::{Ctl, CtlHandler};
pub use dir::Dir;
pub use error::{NopError, NopResult};
pub use fid::{FidTable, InFlight, TagError};
pub use file::File;
pub use fun::{Fun, Lookup};
pub use node::{qid, stat, Content, Node, Placement};
pub use path::{identity, NodePath};
pub use session::Session;
