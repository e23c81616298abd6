//! Runs a [`FilterSession`] on tokio: executes its effects, owns the debounce
//! timer and feeds fetch completions back in.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::client::{FetchError, ListingSource};
use crate::facets::Bounds;
use crate::filters::{ActiveFilter, FilterState};
use crate::model::{ListingKind, ResultPage};
use crate::session::{Effect, FilterSession, Seq};

/// Host routing layer. `push` must update the query string without a full
/// page reload.
pub trait Navigator: Send + Sync {
    fn push(&self, path: &str, query: &str);
}

/// Navigator that just remembers every URL it was asked to show.
#[derive(Default)]
pub struct HistoryNavigator {
    entries: Mutex<Vec<String>>,
}

impl HistoryNavigator {
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }
}

impl Navigator for HistoryNavigator {
    fn push(&self, path: &str, query: &str) {
        self.entries.lock().push(crate::query::href(path, query));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// URL changed outside the session (first load, back button, link).
    Navigate(String),
    Toggle { field: String, value: String },
    SetRange { field: String, bounds: Bounds },
    ClearAll,
    SetPage(u32),
    SetLimit(u32),
}

/// What a view needs to render the page right now.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub query: String,
    pub filters: FilterState,
    pub results: ResultPage,
    pub active_filters: Vec<ActiveFilter>,
    pub loading: bool,
}

impl SessionSnapshot {
    fn of(session: &FilterSession) -> Self {
        SessionSnapshot {
            query: session.current_url_query(),
            filters: session.filters().clone(),
            results: session.results().clone(),
            active_filters: session.active_filters(),
            loading: session.is_loading(),
        }
    }
}

pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<SessionSnapshot>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub async fn send(&self, command: Command) -> anyhow::Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| anyhow::anyhow!("listing session has stopped"))
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver that is notified after every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// Stop accepting commands and wait for the session task to finish.
    pub async fn shutdown(self) {
        drop(self.commands);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "listing session task ended abnormally");
        }
    }
}

/// Start a session task. `initial` is shown until the first fetch lands.
pub fn spawn_session(
    kind: ListingKind,
    initial: ResultPage,
    source: Arc<dyn ListingSource>,
    navigator: Arc<dyn Navigator>,
) -> SessionHandle {
    let session = FilterSession::new(kind, initial);
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (snap_tx, snap_rx) = watch::channel(SessionSnapshot::of(&session));
    let (done_tx, done_rx) = mpsc::unbounded_channel();
    let driver = Driver { session, source, navigator, commands: cmd_rx, done_tx, done_rx, snapshots: snap_tx };
    let task = tokio::spawn(driver.run());
    SessionHandle { commands: cmd_tx, snapshots: snap_rx, task }
}

type Completion = (Seq, Result<ResultPage, FetchError>);

struct Driver {
    session: FilterSession,
    source: Arc<dyn ListingSource>,
    navigator: Arc<dyn Navigator>,
    commands: mpsc::Receiver<Command>,
    done_tx: mpsc::UnboundedSender<Completion>,
    done_rx: mpsc::UnboundedReceiver<Completion>,
    snapshots: watch::Sender<SessionSnapshot>,
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(d) => tokio::time::sleep_until(d).await,
        None => std::future::pending().await,
    }
}

impl Driver {
    async fn run(mut self) {
        loop {
            let deadline = self.session.pending_deadline();
            let effects = tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => self.handle(cmd),
                    None => break,
                },
                Some((seq, result)) = self.done_rx.recv() => {
                    let applied = self.session.apply_response(seq, result);
                    tracing::debug!(seq, ?applied, "listing response");
                    Vec::new()
                }
                _ = wait_until(deadline) => self.session.debounce_elapsed(Instant::now()),
            };
            self.execute(effects);
            self.snapshots.send_replace(SessionSnapshot::of(&self.session));
        }
        tracing::debug!(kind = self.session.kind().segment(), "listing session stopped");
    }

    fn handle(&mut self, cmd: Command) -> Vec<Effect> {
        match cmd {
            Command::Navigate(query) => self.session.hydrate(&query),
            Command::Toggle { field, value } => self.session.toggle(&field, &value),
            Command::SetRange { field, bounds } => self.session.set_range(&field, bounds, Instant::now()),
            Command::ClearAll => self.session.clear_all(),
            Command::SetPage(page) => self.session.set_page(page),
            Command::SetLimit(limit) => self.session.set_limit(limit),
        }
    }

    fn execute(&self, effects: Vec<Effect>) {
        let kind = self.session.kind();
        for effect in effects {
            match effect {
                Effect::PushUrl(query) => {
                    tracing::info!(%query, "url updated");
                    self.navigator.push(&kind.page_path(), &query);
                }
                Effect::Fetch { seq, query } => {
                    let source = self.source.clone();
                    let done = self.done_tx.clone();
                    tokio::spawn(async move {
                        let result = source.fetch_page(kind, &query).await;
                        // receiver gone means the session stopped
                        let _ = done.send((seq, result));
                    });
                }
                Effect::ArmDebounce(_) | Effect::CancelDebounce => {}
            }
        }
    }
}
