// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Leaf node memoizing the combined output of an external process.
// Author: Lukas Bower

//! Command-backed files.
//!
//! Each handle runs its command at most once between closes. The running
//! child sits in its own slot, separate from the result lock the reader holds
//! while blocked, so [`Node::flush`] can kill it without waiting on the read.
//! A flush that lands while the process is still being started marks the
//! slot cancelled and the child is killed as soon as it is installed.

use std::any::Any;
use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex};

use log::{debug, warn};

use crate::error::{NopError, NopResult};
use crate::node::{Content, Node, Placement, FILE_PERMS};
use crate::path::NodePath;
use crate::sync::lock;

/// Builds the process to run for a handle's path.
pub type CommandBuilder = dyn Fn(&NodePath) -> Command + Send + Sync;

/// File whose content is the combined stdout and stderr of a process.
pub struct Cmd {
    builder: Arc<CommandBuilder>,
    result: Mutex<Option<NopResult<Content>>>,
    running: Mutex<RunSlot>,
    place: Placement,
}

/// Process state of a read in progress.
#[derive(Default)]
struct RunSlot {
    active: bool,
    cancelled: bool,
    child: Option<Child>,
}

impl Cmd {
    /// Command file template backed by `builder`.
    pub fn new<F>(builder: F) -> Arc<Self>
    where
        F: Fn(&NodePath) -> Command + Send + Sync + 'static,
    {
        Arc::new(Self {
            builder: Arc::new(builder),
            result: Mutex::new(None),
            running: Mutex::default(),
            place: Placement::default(),
        })
    }

    fn execute(&self) -> NopResult<Content> {
        let run = Running::begin(&self.running);
        let mut command = (self.builder)(self.path());
        let program = command.get_program().to_string_lossy().into_owned();
        let (mut output_pipe, stderr) = io::pipe().map_err(|err| spawn_failure(&program, err))?;
        let stdout = stderr
            .try_clone()
            .map_err(|err| spawn_failure(&program, err))?;
        command.stdin(Stdio::null()).stdout(stdout).stderr(stderr);
        let child = command
            .spawn()
            .map_err(|err| spawn_failure(&program, err))?;
        // The command keeps the write ends alive; the read below only sees EOF
        // once every writer is gone.
        drop(command);
        debug!(target: "nopfs", "cmd {}: spawned {} pid {}", self.path(), program, child.id());

        if run.install(child) {
            debug!(target: "nopfs", "cmd {}: cancelled while starting", self.path());
        }
        let mut output = Vec::new();
        output_pipe
            .read_to_end(&mut output)
            .map_err(|err| NopError::ExecutionFailure(format!("{program}: {err}")))?;
        let status = run
            .wait()
            .map_err(|err| NopError::ExecutionFailure(format!("{program}: {err}")))?;
        if status.success() {
            Ok(Content::from(output))
        } else {
            warn!(target: "nopfs", "cmd {}: {} {}", self.path(), program, status);
            Err(NopError::ExecutionFailure(format!("{program}: {status}")))
        }
    }

    fn kill_running(&self) {
        let mut guard = lock(&self.running);
        let slot = &mut *guard;
        match slot.child.as_mut() {
            Some(child) => {
                debug!(target: "nopfs", "cmd {}: killing pid {}", self.path(), child.id());
                if let Err(err) = child.kill() {
                    debug!(target: "nopfs", "cmd {}: kill failed: {}", self.path(), err);
                }
            }
            None if slot.active => slot.cancelled = true,
            None => {}
        }
    }
}

fn spawn_failure(program: &str, err: io::Error) -> NopError {
    NopError::ExecutionFailure(format!("{program}: {err}"))
}

/// Marks a read in progress for its whole duration. Keeps the child visible
/// to `flush` while its output is drained, and kills and reaps it on every
/// exit path that does not reach [`Running::wait`].
struct Running<'a> {
    slot: &'a Mutex<RunSlot>,
}

impl<'a> Running<'a> {
    fn begin(slot: &'a Mutex<RunSlot>) -> Self {
        let mut state = lock(slot);
        state.active = true;
        state.cancelled = false;
        Self { slot }
    }

    /// Store the child, killing it at once if a flush already arrived.
    /// Returns true when the child was killed.
    fn install(&self, mut child: Child) -> bool {
        let mut state = lock(self.slot);
        let cancelled = state.cancelled;
        if cancelled {
            let _ = child.kill();
        }
        state.child = Some(child);
        cancelled
    }

    fn wait(self) -> io::Result<ExitStatus> {
        let child = lock(self.slot).child.take();
        match child {
            Some(mut child) => child.wait(),
            None => Err(io::Error::other("child vanished from its slot")),
        }
    }
}

impl Drop for Running<'_> {
    fn drop(&mut self) {
        let child = {
            let mut state = lock(self.slot);
            state.active = false;
            state.cancelled = false;
            state.child.take()
        };
        if let Some(mut child) = child {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Node for Cmd {
    fn clone_node(&self) -> Box<dyn Node> {
        Box::new(Self {
            builder: Arc::clone(&self.builder),
            result: Mutex::new(None),
            running: Mutex::default(),
            place: self.place.clone(),
        })
    }

    fn path(&self) -> &NodePath {
        self.place.path()
    }

    fn set_path(&mut self, path: NodePath) {
        self.place.set_path(path);
    }

    fn parent(&self) -> Option<Arc<dyn Node>> {
        self.place.parent()
    }

    fn set_parent(&mut self, parent: Option<Arc<dyn Node>>) {
        self.place.set_parent(parent);
    }

    fn size(&self) -> u64 {
        // A running read holds the result lock; report 0 rather than block.
        match self.result.try_lock() {
            Ok(result) => match result.as_ref() {
                Some(Ok(content)) => content.len() as u64,
                _ => 0,
            },
            Err(_) => 0,
        }
    }

    fn permissions(&self) -> u32 {
        FILE_PERMS
    }

    fn read(&self) -> NopResult<Content> {
        let mut result = lock(&self.result);
        if let Some(memo) = result.as_ref() {
            return memo.clone();
        }
        let outcome = self.execute();
        *result = Some(outcome.clone());
        outcome
    }

    fn flush(&self) {
        self.kill_running();
    }

    fn close(&self) {
        self.kill_running();
        lock(&self.result).take();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
