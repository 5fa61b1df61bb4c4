// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Poll a radio's aflist report and publish its counters as files.
// Author: Lukas Bower

//! Radio counter provider.
//!
//! A background thread runs the `aflist` tool periodically, parses the
//! `  key........value` lines of its report and refreshes one [`File`] per
//! receive-power counter plus `all`, the raw report. Failed polls are logged
//! and leave the previous files in place.

use std::io;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info, warn};
use nopfs_core::{Dir, File, Node};
use regex::Regex;
use thiserror::Error;

/// Report line shape: two spaces, a key, a run of dots, the value.
pub const LINE_PATTERN: &str = r"^  (?P<k>[^ ][^.]+)\.+(?P<v>[^.].*)[ \t]*";
/// Only counters whose key starts with this are published individually.
pub const COUNTER_PREFIX: &str = "rxpower";
/// File holding the unparsed report.
pub const RAW_REPORT: &str = "all";

/// Errors raised while polling.
#[derive(Debug, Error)]
pub enum AflistError {
    /// The line pattern failed to compile.
    #[error("invalid report pattern: {0}")]
    Pattern(#[from] regex::Error),
    /// The report tool could not be started.
    #[error("{program}: {source}")]
    Spawn {
        /// Tool being run.
        program: String,
        /// Underlying failure.
        source: io::Error,
    },
    /// The report tool exited unsuccessfully.
    #[error("{program}: {status}")]
    Exit {
        /// Tool being run.
        program: String,
        /// Exit status reported.
        status: std::process::ExitStatus,
    },
}

/// Extracts `key........value` pairs from a report.
#[derive(Debug, Clone)]
pub struct ReportParser {
    line: Regex,
}

impl ReportParser {
    /// Compile the report line pattern.
    pub fn new() -> Result<Self, AflistError> {
        Ok(Self {
            line: Regex::new(LINE_PATTERN)?,
        })
    }

    /// Every key/value pair in `report`, in report order.
    pub fn pairs<'a>(&self, report: &'a str) -> Vec<(&'a str, &'a str)> {
        report
            .lines()
            .filter_map(|line| {
                let captures = self.line.captures(line)?;
                let key = captures.name("k")?.as_str();
                let value = captures.name("v")?.as_str().trim_end();
                Some((key, value))
            })
            .collect()
    }
}

/// Periodic poller owning the published directory.
pub struct AflistPoller {
    dir: Arc<Dir>,
    program: PathBuf,
    interval: Duration,
    parser: ReportParser,
}

impl AflistPoller {
    /// Poller running `program` every `interval`.
    pub fn new(program: PathBuf, interval: Duration) -> Result<Self, AflistError> {
        Ok(Self {
            dir: Dir::new(),
            program,
            interval,
            parser: ReportParser::new()?,
        })
    }

    /// Directory refreshed by this poller.
    #[must_use]
    pub fn directory(&self) -> Arc<Dir> {
        Arc::clone(&self.dir)
    }

    /// Publish the counters of `report` and the raw report itself.
    pub fn update(&self, report: &[u8]) {
        let text = String::from_utf8_lossy(report);
        let mut batch: Vec<(String, Arc<dyn Node>)> = self
            .parser
            .pairs(&text)
            .into_iter()
            .filter(|(key, _)| key.starts_with(COUNTER_PREFIX))
            .map(|(key, value)| {
                let file: Arc<dyn Node> = File::new(format!("{value}\n"));
                (key.to_owned(), file)
            })
            .collect();
        debug!(target: "nopfs", "aflist: {} counters", batch.len());
        let raw: Arc<dyn Node> = File::new(report.to_vec());
        batch.push((RAW_REPORT.to_owned(), raw));
        self.dir.extend(batch);
    }

    /// Run the report tool once and publish its output.
    pub fn poll(&self) -> Result<(), AflistError> {
        let program = self.program.display().to_string();
        let output = Command::new(&self.program)
            .output()
            .map_err(|source| AflistError::Spawn {
                program: program.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(AflistError::Exit {
                program,
                status: output.status,
            });
        }
        let mut report = output.stdout;
        report.extend_from_slice(&output.stderr);
        self.update(&report);
        Ok(())
    }

    /// Poll now and then every interval on a background thread.
    pub fn spawn(self) -> io::Result<JoinHandle<()>> {
        info!(
            target: "nopfs",
            "aflist: polling {} every {}s",
            self.program.display(),
            self.interval.as_secs()
        );
        thread::Builder::new()
            .name("aflist".to_owned())
            .spawn(move || loop {
                if let Err(err) = self.poll() {
                    warn!(target: "nopfs", "aflist: {err}");
                }
                thread::sleep(self.interval);
            })
    }
}
