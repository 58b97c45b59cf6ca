//! Per-frame target ledger
//!
//! Records, in program order, when each offscreen target is fully written and
//! when it is sampled. A read with no earlier write in the same frame, or a
//! read of the target currently being rendered into, is rejected.

use std::collections::HashMap;

use super::passes::{PassKind, TargetId};
use crate::render::{RenderError, RenderResult};

/// Kind of ledger event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// The target finished being written
    Write,
    /// The target was bound as an input
    Read,
}

/// One ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerEvent {
    /// Monotonic position within the frame
    pub sequence: u64,
    /// Pass that caused the event
    pub pass: PassKind,
    /// Target involved
    pub target: TargetId,
    /// Read or write
    pub access: Access,
}

/// Write/read history of the current frame
#[derive(Debug, Default)]
pub struct FrameLedger {
    next_sequence: u64,
    last_write: HashMap<TargetId, u64>,
    in_flight: Option<TargetId>,
    events: Vec<LedgerEvent>,
}

impl FrameLedger {
    /// Empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the previous frame
    pub fn begin_frame(&mut self) {
        self.next_sequence = 0;
        self.last_write.clear();
        self.in_flight = None;
        self.events.clear();
    }

    /// Mark `target` as the output of the pass now running (`None` for the screen)
    pub fn begin_output(&mut self, target: Option<TargetId>) {
        self.in_flight = target;
    }

    /// Mark the running pass's output as complete
    pub fn finish_output(&mut self, pass: PassKind) {
        if let Some(target) = self.in_flight.take() {
            let sequence = self.bump();
            self.last_write.insert(target, sequence);
            self.events.push(LedgerEvent {
                sequence,
                pass,
                target,
                access: Access::Write,
            });
        }
    }

    /// Record `pass` sampling `target`
    pub fn record_read(&mut self, pass: PassKind, target: TargetId) -> RenderResult<()> {
        if self.in_flight == Some(target) {
            return Err(RenderError::ReadOfBoundOutput { pass, target });
        }
        if !self.last_write.contains_key(&target) {
            return Err(RenderError::ReadBeforeWrite { pass, target });
        }

        let sequence = self.bump();
        self.events.push(LedgerEvent {
            sequence,
            pass,
            target,
            access: Access::Read,
        });
        Ok(())
    }

    /// Sequence number of the latest completed write of `target`
    pub fn last_write(&self, target: TargetId) -> Option<u64> {
        self.last_write.get(&target).copied()
    }

    /// All events of the current frame in order
    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    fn bump(&mut self) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        sequence
    }
}
