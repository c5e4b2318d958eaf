//! Modal state machine
//!
//! Closed -> {Viewing, Editing, Deleting, Creating} -> Closed. There is no
//! direct edge between two open modals.

use crate::error::{CoreError, CoreResult};
use crate::resource::{Draft, Record, RecordId};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ModalState {
    #[default]
    Closed,
    /// Snapshot of the record taken when the modal opened
    Viewing(Record),
    Editing {
        draft: Draft,
        original_id: RecordId,
    },
    Deleting {
        target_id: RecordId,
    },
    Creating {
        draft: Draft,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalKind {
    Closed,
    Viewing,
    Editing,
    Deleting,
    Creating,
}

impl fmt::Display for ModalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Closed => "closed",
            Self::Viewing => "view",
            Self::Editing => "edit",
            Self::Deleting => "delete",
            Self::Creating => "create",
        };
        f.write_str(name)
    }
}

impl ModalState {
    pub fn kind(&self) -> ModalKind {
        match self {
            Self::Closed => ModalKind::Closed,
            Self::Viewing(_) => ModalKind::Viewing,
            Self::Editing { .. } => ModalKind::Editing,
            Self::Deleting { .. } => ModalKind::Deleting,
            Self::Creating { .. } => ModalKind::Creating,
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, Self::Closed)
    }

    /// Open a modal. Fails if another modal is already open.
    pub fn open(&mut self, next: ModalState) -> CoreResult<()> {
        if self.is_open() {
            return Err(CoreError::InvalidState(format!(
                "the {} dialog is already open",
                self.kind()
            )));
        }
        if !next.is_open() {
            return Err(CoreError::InvalidState("no dialog to open".to_string()));
        }
        *self = next;
        Ok(())
    }

    /// Close whatever is open and hand back the previous state
    pub fn close(&mut self) -> ModalState {
        std::mem::take(self)
    }

    /// The record this modal acts on, if any
    pub fn record_id(&self) -> Option<&RecordId> {
        match self {
            Self::Viewing(record) => Some(record.id()),
            Self::Editing { original_id, .. } => Some(original_id),
            Self::Deleting { target_id } => Some(target_id),
            Self::Closed | Self::Creating { .. } => None,
        }
    }

    pub fn references(&self, id: &RecordId) -> bool {
        self.record_id() == Some(id)
    }

    pub fn draft(&self) -> Option<&Draft> {
        match self {
            Self::Editing { draft, .. } | Self::Creating { draft } => Some(draft),
            _ => None,
        }
    }

    pub fn draft_mut(&mut self) -> Option<&mut Draft> {
        match self {
            Self::Editing { draft, .. } | Self::Creating { draft } => Some(draft),
            _ => None,
        }
    }

    /// Swap in a fresher copy of the viewed record. Only applies while the
    /// same record is still being viewed.
    pub fn refresh_snapshot(&mut self, record: Record) -> bool {
        match self {
            Self::Viewing(current) if current.id() == record.id() => {
                *current = record;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{get_resource, ResourceKind};

    fn creating() -> ModalState {
        let kind = ResourceKind::ToiletFacilities;
        ModalState::Creating {
            draft: Draft::blank(kind, get_resource(kind).unwrap()),
        }
    }

    #[test]
    fn test_open_then_close() {
        let mut modal = ModalState::default();
        modal
            .open(ModalState::Deleting {
                target_id: RecordId::from("t1"),
            })
            .unwrap();
        assert_eq!(modal.kind(), ModalKind::Deleting);
        assert!(modal.references(&RecordId::from("t1")));

        let previous = modal.close();
        assert_eq!(previous.kind(), ModalKind::Deleting);
        assert_eq!(modal, ModalState::Closed);
    }

    #[test]
    fn test_no_direct_switch_between_open_modals() {
        let mut modal = creating();
        let err = modal
            .open(ModalState::Deleting {
                target_id: RecordId::from("t1"),
            })
            .unwrap_err();
        assert_eq!(
            err,
            CoreError::InvalidState("the create dialog is already open".to_string())
        );
        assert_eq!(modal.kind(), ModalKind::Creating);
    }

    #[test]
    fn test_opening_closed_is_rejected() {
        let mut modal = ModalState::Closed;
        assert!(modal.open(ModalState::Closed).is_err());
    }

    #[test]
    fn test_draft_access() {
        let mut modal = creating();
        modal.draft_mut().unwrap().set("ward", "Kudan");
        assert_eq!(modal.draft().unwrap().get("ward"), "Kudan");
        assert!(modal.record_id().is_none());
        assert!(ModalState::Closed.draft().is_none());
    }
}
