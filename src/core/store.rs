//! Resource store
//!
//! Holds the last successfully fetched collection and the fetch status.
//! Every fetch is tagged with a sequence number; a response is applied only
//! when its number is the highest seen so far, so a slow early response can
//! never overwrite a later one.

use super::session::SessionId;
use crate::error::{log_error, CoreError, CoreResult};
use crate::resource::{decode_collection, Record, RecordId, ResourceKind};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum FetchStatus {
    #[default]
    Idle,
    Loading,
    Succeeded,
    Failed(CoreError),
}

impl FetchStatus {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn error(&self) -> Option<&CoreError> {
        match self {
            Self::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Handle for one outstanding fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub(crate) session: SessionId,
    pub(crate) seq: u64,
}

impl FetchTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Collection replaced
    Applied,
    /// Request failed; previous collection kept
    Failed(CoreError),
    /// Superseded by a later fetch and discarded
    Stale,
    /// Session gone or ticket from another session
    Ignored,
}

#[derive(Debug)]
pub struct ResourceStore {
    kind: ResourceKind,
    session: SessionId,
    collection: Vec<Record>,
    status: FetchStatus,
    /// Last sequence number handed out
    issued: u64,
    /// Highest sequence number whose response has arrived
    latest_seen: u64,
    last_updated: Option<DateTime<Utc>>,
}

impl ResourceStore {
    pub fn new(kind: ResourceKind, session: SessionId) -> Self {
        Self {
            kind,
            session,
            collection: Vec::new(),
            status: FetchStatus::Idle,
            issued: 0,
            latest_seen: 0,
            last_updated: None,
        }
    }

    pub fn collection(&self) -> &[Record] {
        &self.collection
    }

    pub fn status(&self) -> &FetchStatus {
        &self.status
    }

    /// When the collection was last replaced
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    pub fn find(&self, id: &RecordId) -> Option<&Record> {
        self.collection.iter().find(|r| r.id() == id)
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.find(id).is_some()
    }

    /// Issue a new fetch; supersedes any in flight
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.issued += 1;
        self.status = FetchStatus::Loading;
        debug!("{}: fetch #{} issued", self.kind, self.issued);
        FetchTicket {
            session: self.session,
            seq: self.issued,
        }
    }

    /// Apply a fetch response if it is the newest seen so far
    pub fn complete_fetch(&mut self, ticket: FetchTicket, result: CoreResult<Value>) -> FetchOutcome {
        if ticket.session != self.session {
            return FetchOutcome::Ignored;
        }
        if ticket.seq <= self.latest_seen {
            debug!(
                "{}: discarding stale fetch #{} (latest #{})",
                self.kind, ticket.seq, self.latest_seen
            );
            return FetchOutcome::Stale;
        }
        self.latest_seen = ticket.seq;
        let newest = ticket.seq == self.issued;

        match result.and_then(|body| decode_collection(self.kind, body)) {
            Ok(records) => {
                debug!("{}: fetch #{} applied, {} records", self.kind, ticket.seq, records.len());
                self.collection = records;
                self.last_updated = Some(Utc::now());
                self.status = if newest {
                    FetchStatus::Succeeded
                } else {
                    FetchStatus::Loading
                };
                FetchOutcome::Applied
            }
            Err(e) => {
                log_error(&format!("Failed to fetch {}", self.kind), &e);
                if newest {
                    self.status = FetchStatus::Failed(e.clone());
                }
                FetchOutcome::Failed(e)
            }
        }
    }
}
