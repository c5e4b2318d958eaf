//! Application State
//!
//! Central application state for the washpro terminal front-end. The
//! resource session owns all record state; the app adds the cursor, input
//! buffers, notifications and the task plumbing that carries transport
//! results back to the event loop.

use crate::config::Config;
use crate::notification::NotificationManager;
use anyhow::Result;
use crossterm::event::KeyCode;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc};
use washpro::api::{self, Transport};
use washpro::core::{
    DetailTicket, FetchTicket, MenuAction, MenuAnchor, MutationTicket, Notice, Notifier, PageView,
    ResourceSession, SessionOptions, StateChange, SubmitOutcome,
};
use washpro::error::{CoreError, CoreResult};
use washpro::resource::{FieldInput, Record, ResourceKind};

/// First table row on screen (header block + metric cards + table header)
pub const TABLE_TOP_ROW: u16 = 11;

/// Application modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,        // Viewing list
    Filter,        // / filter input
    Help,          // ? help popup
    Notifications, // Notifications history panel
}

/// Transport results coming back from spawned tasks
#[derive(Debug)]
pub enum AppEvent {
    Fetched {
        ticket: FetchTicket,
        result: CoreResult<Value>,
    },
    Mutated {
        ticket: MutationTicket,
        result: CoreResult<Value>,
    },
    Detail {
        ticket: DetailTicket,
        result: CoreResult<Value>,
    },
}

/// Main application state
pub struct App {
    pub transport: Arc<dyn Transport>,
    pub session: ResourceSession,
    pub config: Config,
    pub notifications: NotificationManager,

    // Navigation state
    pub mode: Mode,
    /// Row index within the visible page
    pub cursor: usize,
    pub filter_input: String,
    /// Focused field of the open form
    pub form_field: usize,
    /// Scroll offset of the view dialog
    pub view_scroll: u16,
    /// For double-g
    pub last_key_press: Option<(KeyCode, Instant)>,

    /// Shown in the header
    pub api_label: String,
    /// Write the last viewed resource back to the config file
    pub persist_config: bool,
    options: SessionOptions,
    changes: broadcast::Receiver<StateChange>,
    tx: mpsc::UnboundedSender<AppEvent>,
    rx: mpsc::UnboundedReceiver<AppEvent>,
}

impl App {
    pub fn new(
        transport: Arc<dyn Transport>,
        kind: ResourceKind,
        options: SessionOptions,
        config: Config,
        api_label: String,
    ) -> Result<Self> {
        let session = ResourceSession::new(kind, options)?;
        let changes = session.subscribe();
        let notifications = NotificationManager::with_settings(
            config.notifications.max_history,
            Duration::from_secs(config.notifications.toast_duration_secs),
        );
        let (tx, rx) = mpsc::unbounded_channel();

        Ok(Self {
            transport,
            session,
            config,
            notifications,
            mode: Mode::Normal,
            cursor: 0,
            filter_input: String::new(),
            form_field: 0,
            view_scroll: 0,
            last_key_press: None,
            api_label,
            persist_config: false,
            options,
            changes,
            tx,
            rx,
        })
    }

    pub fn kind(&self) -> ResourceKind {
        self.session.kind()
    }

    pub fn page(&self) -> PageView<'_> {
        self.session.page()
    }

    pub fn selected_record(&self) -> Option<&Record> {
        self.page().rows.get(self.cursor).map(|row| row.record)
    }

    /// Report an operator-facing error as a notification
    pub fn report(&mut self, error: &CoreError) {
        let notice = if error.is_expected() {
            Notice::warning(error.to_string())
        } else {
            Notice::error(error.to_string())
        };
        self.notifications.notify(notice);
    }

    // =========================================================================
    // Background tasks
    // =========================================================================

    /// Re-fetch the current collection in the background
    pub fn refresh(&mut self) {
        if let Some(ticket) = self.session.begin_refresh() {
            self.spawn_fetch(ticket);
        }
    }

    fn spawn_fetch(&self, ticket: FetchTicket) {
        let transport = Arc::clone(&self.transport);
        let tx = self.tx.clone();
        let path = self.session.definition().path.clone();
        let options = self.options;
        tokio::spawn(async move {
            let result = api::fetch_collection(
                transport.as_ref(),
                &path,
                options.request_timeout,
                options.fetch_retries,
            )
            .await;
            let _ = tx.send(AppEvent::Fetched { ticket, result });
        });
    }

    fn spawn_detail(&self, ticket: DetailTicket) {
        let transport = Arc::clone(&self.transport);
        let tx = self.tx.clone();
        let path = self.session.definition().path.clone();
        let timeout = self.options.request_timeout;
        tokio::spawn(async move {
            let result = api::fetch_record(transport.as_ref(), &path, ticket.id(), timeout).await;
            let _ = tx.send(AppEvent::Detail { ticket, result });
        });
    }

    /// Apply every transport result that has arrived. Returns true if any did.
    pub fn process_events(&mut self) -> bool {
        let mut any = false;
        while let Ok(event) = self.rx.try_recv() {
            any = true;
            self.apply_event(event);
        }
        self.sync_changes();
        any
    }

    pub fn apply_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Fetched { ticket, result } => {
                self.session.complete_refresh(ticket, result);
            }
            AppEvent::Mutated { ticket, result } => {
                let outcome =
                    self.session
                        .complete_submit(ticket, result, &mut self.notifications);
                if let SubmitOutcome::Succeeded {
                    refresh: Some(ticket),
                } = outcome
                {
                    self.spawn_fetch(ticket);
                }
            }
            AppEvent::Detail { ticket, result } => {
                self.session
                    .complete_detail(ticket, result, &mut self.notifications);
            }
        }
    }

    /// React to session transitions the UI keeps derived state for
    fn sync_changes(&mut self) {
        let mut clamp = false;
        loop {
            match self.changes.try_recv() {
                Ok(StateChange::Collection | StateChange::PageWindow) => clamp = true,
                Ok(StateChange::Modal) => {
                    if !self.session.modal().is_open() {
                        self.form_field = 0;
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::TryRecvError::Lagged(_)) => clamp = true,
                Err(_) => break,
            }
        }
        if clamp {
            self.clamp_cursor();
        }
    }

    fn clamp_cursor(&mut self) {
        let rows = self.page().rows.len();
        self.cursor = self.cursor.min(rows.saturating_sub(1));
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    pub fn next(&mut self) {
        let rows = self.page().rows.len();
        if rows > 0 {
            self.cursor = (self.cursor + 1).min(rows - 1);
        }
    }

    pub fn previous(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn go_to_top(&mut self) {
        self.cursor = 0;
    }

    pub fn go_to_bottom(&mut self) {
        self.cursor = self.page().rows.len().saturating_sub(1);
    }

    pub fn next_page(&mut self) {
        if self.session.next_page() {
            self.cursor = 0;
        }
    }

    pub fn prev_page(&mut self) {
        if self.session.prev_page() {
            self.cursor = 0;
        }
    }

    pub fn switch_resource(&mut self, kind: ResourceKind) -> Result<()> {
        if kind == self.kind() {
            return Ok(());
        }
        let session = ResourceSession::new(kind, self.options)?;
        self.session.unmount();
        self.changes = session.subscribe();
        self.session = session;
        self.cursor = 0;
        self.filter_input.clear();
        self.form_field = 0;
        self.mode = Mode::Normal;
        tracing::info!("Switched to {}", kind);

        if self.persist_config {
            if let Err(e) = self.config.set_last_resource(kind) {
                tracing::warn!("Failed to save config: {}", e);
            }
        }
        self.refresh();
        Ok(())
    }

    // =========================================================================
    // Filter
    // =========================================================================

    pub fn enter_filter_mode(&mut self) {
        self.mode = Mode::Filter;
    }

    pub fn apply_filter(&mut self) {
        self.session.set_filter_text(&self.filter_input);
        self.cursor = 0;
    }

    pub fn clear_filter(&mut self) {
        self.filter_input.clear();
        self.apply_filter();
        self.mode = Mode::Normal;
    }

    pub fn cycle_category(&mut self) {
        match self.session.cycle_category() {
            Ok(()) => self.cursor = 0,
            Err(e) => self.report(&e),
        }
    }

    // =========================================================================
    // Menu and modals
    // =========================================================================

    pub fn open_menu(&mut self) {
        let Some(id) = self.selected_record().map(|r| r.id().clone()) else {
            return;
        };
        let anchor = MenuAnchor {
            row: TABLE_TOP_ROW + self.cursor as u16,
            col: 8,
        };
        if let Err(e) = self.session.open_menu(&id, anchor) {
            self.report(&e);
        }
    }

    pub fn close_menu(&mut self) {
        self.session.close_menu();
    }

    pub fn choose(&mut self, action: MenuAction) {
        match self.session.choose(action) {
            Ok(Some(ticket)) => self.spawn_detail(ticket),
            Ok(None) => {}
            Err(e) => {
                self.session.close_menu();
                self.report(&e);
            }
        }
        self.form_field = 0;
        self.view_scroll = 0;
    }

    pub fn open_create(&mut self) {
        match self.session.open_create() {
            Ok(()) => self.form_field = 0,
            Err(e) => self.report(&e),
        }
    }

    pub fn cancel_modal(&mut self) {
        self.session.cancel_modal();
        self.form_field = 0;
    }

    /// Submit the open form or confirm the open delete
    pub fn submit(&mut self) {
        match self.session.begin_submit() {
            Ok(request) => {
                let transport = Arc::clone(&self.transport);
                let tx = self.tx.clone();
                let timeout = self.options.request_timeout;
                self.notifications.notify(Notice::info(format!(
                    "{} {}...",
                    request.ticket.kind().present_participle(),
                    self.session.definition().singular.to_lowercase()
                )));
                tokio::spawn(async move {
                    let result = api::execute(transport.as_ref(), &request.call, timeout).await;
                    let _ = tx.send(AppEvent::Mutated {
                        ticket: request.ticket,
                        result,
                    });
                });
            }
            Err(CoreError::Validation { field, .. }) => {
                self.focus_field(&field);
                self.notifications
                    .notify(Notice::warning("Please correct the highlighted fields"));
            }
            Err(e) => self.report(&e),
        }
    }

    // =========================================================================
    // Form editing
    // =========================================================================

    fn form_len(&self) -> usize {
        self.session.definition().fields.len()
    }

    fn focus_field(&mut self, key: &str) {
        if let Some(idx) = self
            .session
            .definition()
            .fields
            .iter()
            .position(|f| f.key == key)
        {
            self.form_field = idx;
        }
    }

    pub fn next_field(&mut self) {
        let len = self.form_len();
        if len > 0 {
            self.form_field = (self.form_field + 1) % len;
        }
    }

    pub fn prev_field(&mut self) {
        let len = self.form_len();
        if len > 0 {
            self.form_field = (self.form_field + len - 1) % len;
        }
    }

    pub fn type_char(&mut self, c: char) {
        let Some(field) = self.session.definition().fields.get(self.form_field) else {
            return;
        };
        if matches!(field.input, FieldInput::Choice { .. }) {
            return;
        }
        let key = field.key.clone();
        self.session.update_draft(|_, draft| {
            let mut value = draft.get(&key).to_string();
            value.push(c);
            draft.set(&key, value);
        });
    }

    pub fn backspace(&mut self) {
        let Some(field) = self.session.definition().fields.get(self.form_field) else {
            return;
        };
        if matches!(field.input, FieldInput::Choice { .. }) {
            return;
        }
        let key = field.key.clone();
        self.session.update_draft(|_, draft| {
            let mut value = draft.get(&key).to_string();
            value.pop();
            draft.set(&key, value);
        });
    }

    pub fn cycle_choice(&mut self, forward: bool) {
        let Some(field) = self.session.definition().fields.get(self.form_field) else {
            return;
        };
        let key = field.key.clone();
        self.session
            .update_draft(|def, draft| draft.cycle_choice(def, &key, forward));
    }

    // =========================================================================
    // Overlays
    // =========================================================================

    pub fn enter_help_mode(&mut self) {
        self.mode = Mode::Help;
    }

    pub fn enter_notifications_mode(&mut self) {
        self.mode = Mode::Notifications;
    }

    pub fn exit_mode(&mut self) {
        self.mode = Mode::Normal;
    }

    /// Drop the session so late task results are ignored
    pub fn shutdown(&mut self) {
        self.session.unmount();
    }
}
