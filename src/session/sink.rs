// SPDX-License-Identifier: GPL-3.0-only

//! Scan result sink
//!
//! The single point where metadata batches turn into host-visible results.
//! Only the first object of a batch is examined; it is published if it is a
//! machine-readable code of an accepted symbol type with a string payload.
//!
//! Empty batches depend on the discipline: `Continuous` publishes "no
//! result" (`None`), `OneShot` never clears anything.

use crate::backends::{MetadataObject, SymbolSet, SymbolType};
use crate::config::{ResultDiscipline, SessionConfig};
use tokio::sync::watch;
use tracing::{debug, trace};

/// A decoded value accepted by the sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEvent {
    pub payload: String,
    pub symbol_type: SymbolType,
}

/// Filters metadata batches and republishes accepted codes
#[derive(Debug)]
pub struct ScanResultSink {
    accepted: SymbolSet,
    discipline: ResultDiscipline,
    /// Set after a one-shot publish
    closed: bool,
    result: watch::Sender<Option<String>>,
    scanned: watch::Sender<bool>,
}

impl Default for ScanResultSink {
    fn default() -> Self {
        Self::new(SymbolSet::new(), ResultDiscipline::default())
    }
}

impl ScanResultSink {
    pub fn new(accepted: SymbolSet, discipline: ResultDiscipline) -> Self {
        let (result, _) = watch::channel(None);
        let (scanned, _) = watch::channel(false);
        Self {
            accepted,
            discipline,
            closed: false,
            result,
            scanned,
        }
    }

    /// Adopt the accepted set and discipline of a config
    pub fn reconfigure(&mut self, config: &SessionConfig) {
        self.accepted = config.symbol_types.clone();
        self.discipline = config.discipline;
    }

    /// Reopen a closed one-shot sink and lower the scanned flag
    ///
    /// The last published result stays as it is.
    pub fn rearm(&mut self) {
        if self.closed {
            debug!("Re-arming one-shot result sink");
        }
        self.closed = false;
        self.scanned.send_replace(false);
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn discipline(&self) -> ResultDiscipline {
        self.discipline
    }

    pub fn subscribe_result(&self) -> watch::Receiver<Option<String>> {
        self.result.subscribe()
    }

    pub fn subscribe_scanned(&self) -> watch::Receiver<bool> {
        self.scanned.subscribe()
    }

    /// Process one metadata batch
    ///
    /// Returns the event that was published, if any.
    pub fn receive(&mut self, objects: &[MetadataObject]) -> Option<ScanEvent> {
        if self.closed {
            trace!(count = objects.len(), "Sink closed, ignoring batch");
            return None;
        }

        let Some(first) = objects.first() else {
            if self.discipline == ResultDiscipline::Continuous {
                self.result.send_replace(None);
            }
            return None;
        };

        let event = match first {
            MetadataObject::MachineReadableCode(code)
                if self.accepted.contains(&code.symbol_type) =>
            {
                code.payload.as_ref().map(|payload| ScanEvent {
                    payload: payload.clone(),
                    symbol_type: code.symbol_type,
                })
            }
            _ => None,
        }?;

        debug!(symbol = %event.symbol_type, payload = %event.payload, "Publishing scan result");
        self.result.send_replace(Some(event.payload.clone()));

        if self.discipline == ResultDiscipline::OneShot {
            self.scanned.send_replace(true);
            self.closed = true;
        }

        Some(event)
    }
}
