//! Test doubles for the toolchain seam.
//!
//! [`RecordingRunner`] records every [`Invocation`] and answers with a
//! caller-supplied responder, which may also write files to simulate what
//! `xcodebuild` would have produced.

use crate::result::Result;
use crate::utils::process::{CommandOutput, CommandRunner, Invocation};
use std::sync::Mutex;

type Responder = Box<dyn Fn(&Invocation) -> Result<CommandOutput> + Send + Sync>;

pub struct RecordingRunner {
    responder: Responder,
    calls: Mutex<Vec<Invocation>>,
}

impl RecordingRunner {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&Invocation) -> Result<CommandOutput> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A runner for which every command succeeds with empty output.
    pub fn succeeding() -> Self {
        Self::new(|_| Ok(CommandOutput::success()))
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn calls_matching(&self, pred: impl Fn(&Invocation) -> bool) -> Vec<Invocation> {
        self.calls().into_iter().filter(|c| pred(c)).collect()
    }
}

impl CommandRunner for RecordingRunner {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(invocation.clone());
        }
        (self.responder)(invocation)
    }
}

/// True for `xcodebuild -create-xcframework …`.
pub fn is_packaging(inv: &Invocation) -> bool {
    inv.has_arg("-create-xcframework")
}

/// True for a slice or macOS compiler invocation.
pub fn is_compile(inv: &Invocation) -> bool {
    inv.program.ends_with("xcodebuild") && inv.has_arg("-scheme")
}
