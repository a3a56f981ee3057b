//! Threat feed lifecycle: one fetch per mount, arcs rebuilt on arrival

use super::arcs::{generate_arcs, ThreatArc};
use super::places::ReferenceTable;
use crate::feed::{FeedError, ThreatFeed, ThreatRecord};
use rand::rngs::StdRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

type FetchResult = Result<Vec<ThreatRecord>, FeedError>;

#[derive(Debug)]
pub enum RefreshState {
    Idle,
    Loading,
    Ready(Vec<ThreatRecord>),
    Failed(FeedError),
}

impl RefreshState {
    pub fn label(&self) -> &'static str {
        match self {
            RefreshState::Idle => "idle",
            RefreshState::Loading => "loading",
            RefreshState::Ready(_) => "ready",
            RefreshState::Failed(_) => "failed",
        }
    }
}

pub struct RefreshController {
    feed: Option<Box<dyn ThreatFeed>>,
    table: Arc<ReferenceTable>,
    rng: StdRng,
    state: RefreshState,
    arcs: Vec<ThreatArc>,
    receiver: Option<Receiver<FetchResult>>,
    cancel_flag: Arc<AtomicBool>,
}

impl RefreshController {
    pub fn new(feed: Box<dyn ThreatFeed>, table: Arc<ReferenceTable>, rng: StdRng) -> Self {
        Self {
            feed: Some(feed),
            table,
            rng,
            state: RefreshState::Idle,
            arcs: Vec::new(),
            receiver: None,
            cancel_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start the single fetch for this controller. Returns false if it
    /// has already been mounted.
    pub fn mount(&mut self) -> bool {
        let Some(feed) = self.feed.take() else {
            tracing::debug!("refresh controller already mounted");
            return false;
        };

        let (tx, rx) = mpsc::channel();
        let cancel = self.cancel_flag.clone();
        tracing::info!(feed = feed.name(), "fetching threat records");

        thread::spawn(move || {
            let result = feed.fetch();
            if !cancel.load(Ordering::Relaxed) {
                let _ = tx.send(result);
            }
        });

        self.receiver = Some(rx);
        self.state = RefreshState::Loading;
        true
    }

    /// Apply a finished fetch, if any. Returns true when the state changed.
    pub fn poll(&mut self) -> bool {
        let result = match &self.receiver {
            Some(rx) => match rx.try_recv() {
                Ok(result) => result,
                Err(TryRecvError::Empty) => return false,
                Err(TryRecvError::Disconnected) => {
                    Err(FeedError::Network("feed worker exited without a result".to_string()))
                }
            },
            None => return false,
        };
        self.apply(result);
        true
    }

    /// Block until the fetch resolves or `timeout` passes.
    pub fn settle(&mut self, timeout: Duration) -> bool {
        let result = match &self.receiver {
            Some(rx) => match rx.recv_timeout(timeout) {
                Ok(result) => result,
                Err(RecvTimeoutError::Timeout) => return false,
                Err(RecvTimeoutError::Disconnected) => {
                    Err(FeedError::Network("feed worker exited without a result".to_string()))
                }
            },
            None => return false,
        };
        self.apply(result);
        true
    }

    fn apply(&mut self, result: FetchResult) {
        self.receiver = None;
        match result {
            Ok(records) => {
                // Whole-set swap; the renderer never sees a partial list
                self.arcs = generate_arcs(&records, &self.table, &mut self.rng);
                tracing::info!(records = records.len(), arcs = self.arcs.len(), "threat feed loaded");
                self.state = RefreshState::Ready(records);
            }
            Err(e) => {
                tracing::warn!(error = %e, "threat feed unavailable");
                self.arcs = Vec::new();
                self.state = RefreshState::Failed(e);
            }
        }
    }

    /// Stop listening. A fetch that resolves later is dropped unseen.
    pub fn teardown(&mut self) {
        self.cancel_flag.store(true, Ordering::Relaxed);
        if self.receiver.take().is_some() {
            tracing::debug!("discarding in-flight threat fetch");
        }
    }

    pub fn state(&self) -> &RefreshState {
        &self.state
    }

    pub fn arcs(&self) -> &[ThreatArc] {
        &self.arcs
    }

    pub fn records(&self) -> &[ThreatRecord] {
        match &self.state {
            RefreshState::Ready(records) => records,
            _ => &[],
        }
    }

    /// Why the last fetch failed, if it did.
    pub fn error(&self) -> Option<&FeedError> {
        match &self.state {
            RefreshState::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// Text for the status overlay.
    pub fn status_line(&self) -> String {
        match &self.state {
            RefreshState::Idle => "Threat feed idle".to_string(),
            RefreshState::Loading => "Connecting to threat feed…".to_string(),
            RefreshState::Ready(records) => format!("{} threats tracked", records.len()),
            RefreshState::Failed(_) => "Threat feed unavailable".to_string(),
        }
    }
}

impl Drop for RefreshController {
    fn drop(&mut self) {
        self.teardown();
    }
}
