//! Resource list and mutation coordinator
//!
//! The state machine behind every resource screen: fetch a collection,
//! derive metrics and pages from it, and run create/update/delete through
//! modal dialogs while keeping the list, the selection and the open modal
//! consistent.
//!
//! - [`store`] - Last fetched collection and sequence-tagged fetch status
//! - [`aggregate`] - Metric cards over the full collection
//! - [`paginate`] - Filtering and page slicing
//! - [`selection`] - Active record and row menu
//! - [`modal`] - Dialog state machine
//! - [`mutation`] - In-flight mutation tracking
//! - [`notify`] - Notifier collaborator
//! - [`session`] - Ties the above together for one screen

pub mod aggregate;
pub mod modal;
pub mod mutation;
pub mod notify;
pub mod paginate;
pub mod selection;
pub mod session;
pub mod store;

pub use aggregate::{aggregate, aggregate_at, Metric, MetricSpec, MetricValue, Metrics};
pub use modal::{ModalKind, ModalState};
pub use mutation::{MutationKind, MutationRequest, MutationTarget, MutationTicket};
pub use notify::{Notice, Notifier, Severity};
pub use paginate::{paginate, PageView, PageWindow, RecordFilter, DEFAULT_PAGE_SIZE};
pub use selection::{MenuAction, MenuAnchor, Selection};
pub use session::{
    DetailTicket, ResourceSession, SessionId, SessionOptions, StateChange, SubmitOutcome,
};
pub use store::{FetchOutcome, FetchStatus, FetchTicket};
