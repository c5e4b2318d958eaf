//! Resource session
//!
//! One session per resource screen. It owns the store, the page window and
//! filter, the selection, the modal and the in-flight mutations, and is the
//! only place that moves them between states.
//!
//! Network work is split into `begin_*` (issue a ticket, describe the
//! request) and `complete_*` (apply the response). The terminal front-end
//! runs the request on a spawned task in between; the async drivers at the
//! bottom of this file do the whole round trip inline.

use super::aggregate::{aggregate, aggregate_at, Metrics};
use super::modal::ModalState;
use super::mutation::{MutationCoordinator, MutationKind, MutationRequest, MutationTarget, MutationTicket};
use super::notify::{Notice, Notifier};
use super::paginate::{paginate, total_pages, CategoryFilter, PageView, PageWindow, RecordFilter};
use super::selection::{MenuAction, MenuAnchor, Selection};
use super::store::{FetchOutcome, FetchStatus, FetchTicket, ResourceStore};
use crate::api::{self, Transport, TransportCall};
use crate::error::{log_error, CoreError, CoreResult};
use crate::resource::{
    decode_single, get_resource, split_envelope, Draft, Record, RecordId, ResourceDef,
    ResourceKind,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    pub(crate) fn next() -> Self {
        Self(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Slice of session state that changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChange {
    Collection,
    FetchStatus,
    PageWindow,
    Selection,
    Modal,
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub page_size: usize,
    pub readonly: bool,
    pub request_timeout: Duration,
    /// Automatic retries for collection fetches (capped)
    pub fetch_retries: u32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            page_size: super::paginate::DEFAULT_PAGE_SIZE,
            readonly: false,
            request_timeout: Duration::from_secs(30),
            fetch_retries: 0,
        }
    }
}

/// Handle for a single-record detail fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailTicket {
    session: SessionId,
    seq: u64,
    id: RecordId,
}

impl DetailTicket {
    pub fn id(&self) -> &RecordId {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Mutation confirmed; `refresh` is the follow-up fetch to run
    Succeeded { refresh: Option<FetchTicket> },
    /// Mutation failed; the modal and draft are untouched
    Failed(CoreError),
    /// Session gone or ticket from another session
    Ignored,
}

pub struct ResourceSession {
    id: SessionId,
    kind: ResourceKind,
    def: &'static ResourceDef,
    store: ResourceStore,
    window: PageWindow,
    filter: RecordFilter,
    selection: Selection,
    modal: ModalState,
    /// Bumped each time a modal opens
    modal_epoch: u64,
    mutations: MutationCoordinator,
    options: SessionOptions,
    detail_seq: u64,
    mounted: bool,
    events: broadcast::Sender<StateChange>,
}

impl ResourceSession {
    pub fn new(kind: ResourceKind, options: SessionOptions) -> CoreResult<Self> {
        let def = get_resource(kind)
            .ok_or_else(|| CoreError::InvalidState(format!("unknown resource: {}", kind)))?;
        let window = PageWindow::new(options.page_size)?;
        let id = SessionId::next();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        debug!("{}: opened {} (page size {})", id, kind, options.page_size);

        Ok(Self {
            id,
            kind,
            def,
            store: ResourceStore::new(kind, id),
            window,
            filter: RecordFilter::default(),
            selection: Selection::default(),
            modal: ModalState::Closed,
            modal_epoch: 0,
            mutations: MutationCoordinator::default(),
            options,
            detail_seq: 0,
            mounted: true,
            events,
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn definition(&self) -> &'static ResourceDef {
        self.def
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn is_readonly(&self) -> bool {
        self.options.readonly
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn collection(&self) -> &[Record] {
        self.store.collection()
    }

    pub fn fetch_status(&self) -> &FetchStatus {
        self.store.status()
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.store.last_updated()
    }

    pub fn window(&self) -> PageWindow {
        self.window
    }

    pub fn filter(&self) -> &RecordFilter {
        &self.filter
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn modal(&self) -> &ModalState {
        &self.modal
    }

    pub fn record(&self, id: &RecordId) -> Option<&Record> {
        self.store.find(id)
    }

    /// Visible page of the filtered collection
    pub fn page(&self) -> PageView<'_> {
        paginate(
            self.store.collection(),
            &self.filter,
            &self.def.search_fields,
            self.window,
        )
    }

    /// Metric cards over the full collection
    pub fn metrics(&self) -> Metrics {
        aggregate(self.store.collection(), &self.def.metrics)
    }

    pub fn metrics_at(&self, now: DateTime<Utc>) -> Metrics {
        aggregate_at(self.store.collection(), &self.def.metrics, now)
    }

    pub fn is_busy(&self, target: &MutationTarget) -> bool {
        self.mutations.is_busy(target)
    }

    /// Whether the open modal's submission is in flight
    pub fn is_submitting(&self) -> bool {
        self.modal_target()
            .is_some_and(|target| self.mutations.is_busy(&target))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.events.subscribe()
    }

    fn emit(&self, change: StateChange) {
        // no subscribers is fine
        let _ = self.events.send(change);
    }

    fn total_pages(&self) -> usize {
        let matching = self
            .store
            .collection()
            .iter()
            .filter(|r| self.filter.matches(r, &self.def.search_fields))
            .count();
        total_pages(matching, self.window.page_size())
    }

    fn accepts(&self, session: SessionId) -> bool {
        if !self.mounted || session != self.id {
            debug!("{}: ignoring completion for {}", self.id, session);
            return false;
        }
        true
    }

    /// Ends the session; later completions are dropped without effect
    pub fn unmount(&mut self) {
        debug!("{}: unmounted", self.id);
        self.mounted = false;
    }

    // =========================================================================
    // Fetch
    // =========================================================================

    /// Start a collection refresh. `None` once unmounted.
    pub fn begin_refresh(&mut self) -> Option<FetchTicket> {
        if !self.mounted {
            return None;
        }
        let ticket = self.store.begin_fetch();
        self.emit(StateChange::FetchStatus);
        Some(ticket)
    }

    pub fn complete_refresh(&mut self, ticket: FetchTicket, result: CoreResult<Value>) -> FetchOutcome {
        if !self.accepts(ticket.session) {
            return FetchOutcome::Ignored;
        }
        let status_before = self.store.status().clone();
        let outcome = self.store.complete_fetch(ticket, result);
        if matches!(outcome, FetchOutcome::Applied) {
            self.emit(StateChange::Collection);
        }
        // an older failed fetch leaves the status alone
        if self.store.status() != &status_before {
            self.emit(StateChange::FetchStatus);
        }
        if matches!(outcome, FetchOutcome::Applied) {
            self.reconcile();
        }
        outcome
    }

    /// Bring selection, modal and page back in line with the collection
    fn reconcile(&mut self) {
        if self.selection.retain(self.store.collection()) {
            self.emit(StateChange::Selection);
        }

        let orphaned = self
            .modal
            .record_id()
            .is_some_and(|id| !self.store.contains(id));
        if orphaned {
            let closed = self.modal.close();
            debug!("{}: closed {} dialog for a removed record", self.id, closed.kind());
            self.emit(StateChange::Modal);
        }

        let pages = self.total_pages();
        if self.window.clamp(pages) {
            self.emit(StateChange::PageWindow);
        }
    }

    // =========================================================================
    // Paging and filtering
    // =========================================================================

    pub fn next_page(&mut self) -> bool {
        let pages = self.total_pages();
        let changed = self.window.next(pages);
        if changed {
            self.emit(StateChange::PageWindow);
        }
        changed
    }

    pub fn prev_page(&mut self) -> bool {
        let changed = self.window.prev();
        if changed {
            self.emit(StateChange::PageWindow);
        }
        changed
    }

    pub fn set_page(&mut self, page: usize) -> bool {
        let pages = self.total_pages();
        let changed = self.window.set_page(page, pages);
        if changed {
            self.emit(StateChange::PageWindow);
        }
        changed
    }

    pub fn set_page_size(&mut self, page_size: usize) -> CoreResult<()> {
        if self.window.set_page_size(page_size)? {
            self.emit(StateChange::PageWindow);
        }
        Ok(())
    }

    /// Set the text filter; a change always returns to page 1
    pub fn set_filter_text(&mut self, text: &str) {
        if self.filter.text == text {
            return;
        }
        self.filter.text = text.to_string();
        self.window.reset();
        self.emit(StateChange::PageWindow);
    }

    /// Set or clear the category filter; a change always returns to page 1
    pub fn set_category(&mut self, value: Option<&str>) -> CoreResult<()> {
        let category = match value {
            None => None,
            Some(value) => {
                let field = self.def.category_field.as_deref().ok_or_else(|| {
                    CoreError::InvalidState(format!("{} has no category filter", self.kind))
                })?;
                if !self.def.category_choices().iter().any(|c| c == value) {
                    return Err(CoreError::validation(
                        field,
                        format!("unknown category: {}", value),
                    ));
                }
                Some(CategoryFilter {
                    field: field.to_string(),
                    value: value.to_string(),
                })
            }
        };
        if self.filter.category != category {
            self.filter.category = category;
            self.window.reset();
            self.emit(StateChange::PageWindow);
        }
        Ok(())
    }

    /// Step through "all" and each category choice in order
    pub fn cycle_category(&mut self) -> CoreResult<()> {
        let choices = self.def.category_choices();
        let next = match &self.filter.category {
            None => choices.first(),
            Some(current) => choices
                .iter()
                .position(|c| *c == current.value)
                .and_then(|idx| choices.get(idx + 1)),
        };
        self.set_category(next.map(|s| s.as_str()))
    }

    // =========================================================================
    // Selection and modals
    // =========================================================================

    /// Open the row menu for a record in the collection
    pub fn open_menu(&mut self, id: &RecordId, anchor: MenuAnchor) -> CoreResult<()> {
        if !self.store.contains(id) {
            return Err(CoreError::InvalidState(format!("record {} is not loaded", id)));
        }
        self.selection.open_menu_for(id.clone(), anchor);
        self.emit(StateChange::Selection);
        Ok(())
    }

    pub fn close_menu(&mut self) {
        if self.selection.close_menu() {
            self.emit(StateChange::Selection);
        }
    }

    /// Act on the active record. Returns a detail ticket when viewing a kind
    /// that re-fetches records on view.
    pub fn choose(&mut self, action: MenuAction) -> CoreResult<Option<DetailTicket>> {
        let id = self
            .selection
            .active()
            .cloned()
            .ok_or_else(|| CoreError::InvalidState("no record selected".to_string()))?;
        if matches!(action, MenuAction::Edit | MenuAction::Delete) {
            self.ensure_writable(action.label())?;
        }
        let record = self
            .store
            .find(&id)
            .cloned()
            .ok_or_else(|| CoreError::InvalidState(format!("record {} is not loaded", id)))?;

        let next = match action {
            MenuAction::View => ModalState::Viewing(record),
            MenuAction::Edit => ModalState::Editing {
                draft: Draft::from_record(self.def, &record),
                original_id: id.clone(),
            },
            MenuAction::Delete => ModalState::Deleting {
                target_id: id.clone(),
            },
        };
        self.open_modal(next)?;
        self.close_menu();
        self.emit(StateChange::Modal);

        if action == MenuAction::View && self.def.fetch_detail {
            return Ok(Some(self.begin_detail(id)));
        }
        Ok(None)
    }

    /// Open the create form with a blank draft
    pub fn open_create(&mut self) -> CoreResult<()> {
        self.ensure_writable("Add")?;
        self.open_modal(ModalState::Creating {
            draft: Draft::blank(self.kind, self.def),
        })?;
        self.close_menu();
        self.emit(StateChange::Modal);
        Ok(())
    }

    fn open_modal(&mut self, next: ModalState) -> CoreResult<()> {
        self.modal.open(next)?;
        self.modal_epoch += 1;
        Ok(())
    }

    /// Close the open modal. An in-flight submission still completes.
    pub fn cancel_modal(&mut self) {
        if self.modal.is_open() {
            self.modal.close();
            self.emit(StateChange::Modal);
        }
    }

    /// Edit the open form's draft
    pub fn update_draft(&mut self, edit: impl FnOnce(&ResourceDef, &mut Draft)) -> bool {
        let def = self.def;
        let Some(draft) = self.modal.draft_mut() else {
            return false;
        };
        edit(def, draft);
        self.emit(StateChange::Modal);
        true
    }

    fn ensure_writable(&self, action: &str) -> CoreResult<()> {
        if self.options.readonly {
            return Err(CoreError::ReadOnly(action.to_string()));
        }
        Ok(())
    }

    fn modal_target(&self) -> Option<MutationTarget> {
        match &self.modal {
            ModalState::Creating { .. } => Some(MutationTarget::New),
            ModalState::Editing { original_id, .. } => Some(MutationTarget::Record(original_id.clone())),
            ModalState::Deleting { target_id } => Some(MutationTarget::Record(target_id.clone())),
            ModalState::Closed | ModalState::Viewing(_) => None,
        }
    }

    // =========================================================================
    // Detail
    // =========================================================================

    fn begin_detail(&mut self, id: RecordId) -> DetailTicket {
        self.detail_seq += 1;
        DetailTicket {
            session: self.id,
            seq: self.detail_seq,
            id,
        }
    }

    /// Apply a fetched record to the view modal, if it is still showing it
    pub fn complete_detail(
        &mut self,
        ticket: DetailTicket,
        result: CoreResult<Value>,
        notifier: &mut dyn Notifier,
    ) -> bool {
        if !self.accepts(ticket.session) || ticket.seq != self.detail_seq {
            return false;
        }
        if !self.modal.references(&ticket.id) {
            return false;
        }
        match result.and_then(|body| decode_single(self.kind, body)) {
            Ok(record) if record.id() == &ticket.id => {
                let replaced = self.modal.refresh_snapshot(record);
                if replaced {
                    self.emit(StateChange::Modal);
                }
                replaced
            }
            Ok(record) => {
                let err = CoreError::Decode(format!(
                    "asked for {} but received {}",
                    ticket.id,
                    record.id()
                ));
                log_error("Failed to load record", &err);
                notifier.notify(Notice::error(format!(
                    "Failed to load {}: {}",
                    self.def.singular.to_lowercase(),
                    err
                )));
                false
            }
            Err(err) => {
                log_error("Failed to load record", &err);
                notifier.notify(Notice::error(format!(
                    "Failed to load {}: {}",
                    self.def.singular.to_lowercase(),
                    err
                )));
                false
            }
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Validate the open form and reserve its target.
    ///
    /// Validation failures are recorded on the draft and nothing is sent.
    pub fn begin_submit(&mut self) -> CoreResult<MutationRequest> {
        if !self.mounted {
            return Err(CoreError::InvalidState("session is closed".to_string()));
        }
        let target = self
            .modal_target()
            .ok_or_else(|| CoreError::InvalidState("nothing to submit".to_string()))?;
        let kind = match &self.modal {
            ModalState::Creating { .. } => MutationKind::Create,
            ModalState::Editing { .. } => MutationKind::Update,
            _ => MutationKind::Delete,
        };
        self.ensure_writable(kind.verb())?;
        if self.mutations.is_busy(&target) {
            return Err(CoreError::Busy(target.to_string()));
        }

        let path = self.def.path.clone();
        let def = self.def;
        let events = &self.events;
        let call = match &mut self.modal {
            ModalState::Creating { draft } => {
                let body = validate_draft(events, def, draft)?;
                TransportCall::Post { path, body }
            }
            ModalState::Editing { draft, original_id } => {
                let id = original_id.clone();
                let body = validate_draft(events, def, draft)?;
                TransportCall::Put { path, id, body }
            }
            ModalState::Deleting { target_id } => TransportCall::Delete {
                path,
                id: target_id.clone(),
            },
            ModalState::Closed | ModalState::Viewing(_) => {
                return Err(CoreError::InvalidState("nothing to submit".to_string()))
            }
        };

        let ticket = self.mutations.begin(self.id, kind, target, self.modal_epoch)?;
        debug!("{}: {} {} dispatched", self.id, kind.verb(), ticket.target());
        self.emit(StateChange::Busy);
        Ok(MutationRequest { ticket, call })
    }

    /// Apply a mutation response.
    ///
    /// Success closes the modal that submitted (if that same opening is still
    /// up) and any modal on a deleted record, clears a deleted selection,
    /// notifies once and hands back a refresh ticket. Failure notifies and
    /// leaves the modal and its draft as they were.
    pub fn complete_submit(
        &mut self,
        ticket: MutationTicket,
        result: CoreResult<Value>,
        notifier: &mut dyn Notifier,
    ) -> SubmitOutcome {
        if !self.accepts(ticket.session) {
            return SubmitOutcome::Ignored;
        }
        self.mutations.finish(&ticket);
        self.emit(StateChange::Busy);

        match result {
            Ok(response) => {
                let (_, message) = split_envelope(response);
                let message = message.unwrap_or_else(|| {
                    format!("{} {} successfully", self.def.singular, ticket.kind.past_tense())
                });
                info!("{}: {}", self.kind, message);

                let deleted = match (ticket.kind, &ticket.target) {
                    (MutationKind::Delete, MutationTarget::Record(id)) => Some(id),
                    _ => None,
                };
                let acting = ticket.modal == self.modal_epoch;
                let orphaned = deleted.is_some_and(|id| self.modal.references(id));
                if self.modal.is_open() && (acting || orphaned) {
                    let closed = self.modal.close();
                    debug!("{}: closed {} dialog after {}", self.id, closed.kind(), ticket.kind.verb());
                    self.emit(StateChange::Modal);
                }
                if let Some(id) = deleted {
                    if self.selection.references(id) && self.selection.clear() {
                        self.emit(StateChange::Selection);
                    }
                }
                notifier.notify(Notice::success(message));

                SubmitOutcome::Succeeded {
                    refresh: self.begin_refresh(),
                }
            }
            Err(err) => {
                log_error(
                    &format!("Failed to {} {}", ticket.kind.verb(), self.kind),
                    &err,
                );
                notifier.notify(Notice::error(format!(
                    "Failed to {} {}: {}",
                    ticket.kind.verb(),
                    self.def.singular.to_lowercase(),
                    err
                )));
                SubmitOutcome::Failed(err)
            }
        }
    }

    // =========================================================================
    // Async drivers
    // =========================================================================

    /// Fetch the collection and apply it
    pub async fn refresh(&mut self, transport: &dyn Transport) -> FetchOutcome {
        let Some(ticket) = self.begin_refresh() else {
            return FetchOutcome::Ignored;
        };
        let result = api::fetch_collection(
            transport,
            &self.def.path,
            self.options.request_timeout,
            self.options.fetch_retries,
        )
        .await;
        self.complete_refresh(ticket, result)
    }

    /// Submit the open form and, on success, re-fetch the collection
    pub async fn submit(
        &mut self,
        transport: &dyn Transport,
        notifier: &mut dyn Notifier,
    ) -> CoreResult<SubmitOutcome> {
        let request = self.begin_submit()?;
        let result = api::execute(transport, &request.call, self.options.request_timeout).await;
        let outcome = self.complete_submit(request.ticket, result, notifier);

        if let SubmitOutcome::Succeeded {
            refresh: Some(ticket),
        } = &outcome
        {
            let result = api::fetch_collection(
                transport,
                &self.def.path,
                self.options.request_timeout,
                self.options.fetch_retries,
            )
            .await;
            self.complete_refresh(*ticket, result);
        }
        Ok(outcome)
    }

    /// Run a menu action, loading record details when the kind asks for it
    pub async fn act(
        &mut self,
        action: MenuAction,
        transport: &dyn Transport,
        notifier: &mut dyn Notifier,
    ) -> CoreResult<()> {
        if let Some(ticket) = self.choose(action)? {
            let result = api::fetch_record(
                transport,
                &self.def.path,
                ticket.id(),
                self.options.request_timeout,
            )
            .await;
            self.complete_detail(ticket, result, notifier);
        }
        Ok(())
    }
}

/// Validate a form draft; field messages land on the draft either way
fn validate_draft(
    events: &broadcast::Sender<StateChange>,
    def: &ResourceDef,
    draft: &mut Draft,
) -> CoreResult<Value> {
    draft.validate(def).inspect_err(|e| {
        log_error("Form validation failed", e);
        let _ = events.send(StateChange::Modal);
    })
}
