//! Mutation coordinator
//!
//! Tracks which targets have a create/update/delete in flight. A second
//! request for the same target is refused with `CoreError::Busy` until the
//! first completes.

use super::session::SessionId;
use crate::api::TransportCall;
use crate::error::{CoreError, CoreResult};
use crate::resource::RecordId;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

impl MutationKind {
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    pub fn past_tense(&self) -> &'static str {
        match self {
            Self::Create => "created",
            Self::Update => "updated",
            Self::Delete => "deleted",
        }
    }

    pub fn present_participle(&self) -> &'static str {
        match self {
            Self::Create => "Creating",
            Self::Update => "Updating",
            Self::Delete => "Deleting",
        }
    }
}

/// What a mutation acts on
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MutationTarget {
    /// A record that does not exist yet
    New,
    Record(RecordId),
}

impl fmt::Display for MutationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => f.write_str("a new record"),
            Self::Record(id) => write!(f, "record {}", id),
        }
    }
}

/// Handle for one in-flight mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationTicket {
    pub(crate) session: SessionId,
    pub(crate) kind: MutationKind,
    pub(crate) target: MutationTarget,
    /// Which opening of the modal submitted this
    pub(crate) modal: u64,
}

impl MutationTicket {
    pub fn kind(&self) -> MutationKind {
        self.kind
    }

    pub fn target(&self) -> &MutationTarget {
        &self.target
    }
}

/// A validated mutation ready to send
#[derive(Debug, Clone, PartialEq)]
pub struct MutationRequest {
    pub ticket: MutationTicket,
    pub call: TransportCall,
}

#[derive(Debug, Default)]
pub struct MutationCoordinator {
    in_flight: HashSet<MutationTarget>,
}

impl MutationCoordinator {
    pub fn is_busy(&self, target: &MutationTarget) -> bool {
        self.in_flight.contains(target)
    }

    pub fn any_in_flight(&self) -> bool {
        !self.in_flight.is_empty()
    }

    pub fn begin(
        &mut self,
        session: SessionId,
        kind: MutationKind,
        target: MutationTarget,
        modal: u64,
    ) -> CoreResult<MutationTicket> {
        if !self.in_flight.insert(target.clone()) {
            return Err(CoreError::Busy(target.to_string()));
        }
        Ok(MutationTicket {
            session,
            kind,
            target,
            modal,
        })
    }

    /// Release the target. Returns false if it was not in flight.
    pub fn finish(&mut self, ticket: &MutationTicket) -> bool {
        self.in_flight.remove(&ticket.target)
    }
}
