//! Runs a [`MapSession`] on a single owner task.
//!
//! The presentation layer sends [`Command`]s through a [`SessionHandle`].
//! Geocoding calls run on their own tasks and send their replies back to
//! the owner, so the store is only ever touched from one place. At most
//! one call is outstanding: starting a new search aborts the previous
//! one, and a reply from an aborted call is dropped.

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::models::{Location, LocationId, MapViewport};
use crate::search::{GeocodeReply, PendingSearch, SearchOutcome, SearchStep};
use crate::session::MapSession;
use crate::{PlaceMapError, Result};

const COMMAND_CAPACITY: usize = 32;
const OUTCOME_CAPACITY: usize = 32;

/// User actions forwarded from the presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetSearchText(String),
    SubmitSearch(String),
    SelectLocations(Vec<LocationId>),
    DeleteLocation(LocationId),
    DeleteSelected,
}

/// What the list pane renders
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreSnapshot {
    pub locations: Vec<Location>,
    pub selection: Vec<LocationId>,
    pub search_text: String,
}

impl StoreSnapshot {
    fn of(session: &MapSession) -> Self {
        Self {
            locations: session.locations().to_vec(),
            selection: session.selection(),
            search_text: session.search_text().to_string(),
        }
    }
}

/// Presentation-side handle to a running session
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    outcomes: mpsc::Receiver<SearchOutcome>,
    viewport: watch::Receiver<MapViewport>,
    snapshot: watch::Receiver<StoreSnapshot>,
    task: JoinHandle<Result<MapSession>>,
}

impl SessionHandle {
    /// # Errors
    /// The session task has stopped.
    pub async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| PlaceMapError::session("session task has stopped"))
    }

    pub async fn submit_search(&self, text: &str) -> Result<()> {
        self.send(Command::SubmitSearch(text.to_string())).await
    }

    pub async fn select_locations(&self, ids: Vec<LocationId>) -> Result<()> {
        self.send(Command::SelectLocations(ids)).await
    }

    pub async fn delete_location(&self, id: LocationId) -> Result<()> {
        self.send(Command::DeleteLocation(id)).await
    }

    pub async fn delete_selected(&self) -> Result<()> {
        self.send(Command::DeleteSelected).await
    }

    /// Next finished search, in completion order.
    ///
    /// Outcomes are buffered up to a fixed capacity; once the buffer is
    /// full newer ones are dropped until it is drained.
    pub async fn next_outcome(&mut self) -> Option<SearchOutcome> {
        self.outcomes.recv().await
    }

    #[must_use]
    pub fn viewport(&self) -> watch::Receiver<MapViewport> {
        self.viewport.clone()
    }

    #[must_use]
    pub fn snapshot(&self) -> watch::Receiver<StoreSnapshot> {
        self.snapshot.clone()
    }

    /// Stop the owner task after queued commands and hand back the session
    ///
    /// # Errors
    /// The task panicked or stopped on a fatal store error.
    pub async fn shutdown(self) -> Result<MapSession> {
        let SessionHandle { commands, task, .. } = self;
        drop(commands);
        task.await
            .map_err(|e| PlaceMapError::session(format!("session task failed: {e}")))?
    }
}

/// Move `session` onto a new owner task
pub fn spawn(session: MapSession) -> SessionHandle {
    let (commands_tx, commands_rx) = mpsc::channel(COMMAND_CAPACITY);
    let (outcomes_tx, outcomes_rx) = mpsc::channel(OUTCOME_CAPACITY);
    let (snapshot_tx, snapshot_rx) = watch::channel(StoreSnapshot::of(&session));
    let viewport = session.subscribe_viewport();

    let task = tokio::spawn(run(session, commands_rx, outcomes_tx, snapshot_tx));

    SessionHandle {
        commands: commands_tx,
        outcomes: outcomes_rx,
        viewport,
        snapshot: snapshot_rx,
        task,
    }
}

/// The geocoding call currently in flight
struct Outstanding {
    ticket: u64,
    task: JoinHandle<()>,
}

impl Outstanding {
    fn cancel(self) {
        debug!("Cancelling geocoding call (ticket {})", self.ticket);
        self.task.abort();
    }
}

async fn run(
    mut session: MapSession,
    mut commands: mpsc::Receiver<Command>,
    outcomes: mpsc::Sender<SearchOutcome>,
    snapshot: watch::Sender<StoreSnapshot>,
) -> Result<MapSession> {
    let (replies_tx, mut replies) = mpsc::unbounded_channel::<GeocodeReply>();
    let mut outstanding: Option<Outstanding> = None;

    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else {
                    debug!("All session handles dropped, stopping");
                    break;
                };
                apply(&mut session, command, &mut outstanding, &outcomes, &replies_tx).await;
            }
            Some(reply) = replies.recv() => {
                if outstanding.as_ref().is_some_and(|o| o.ticket == reply.ticket) {
                    outstanding = None;
                    let outcome = session.complete_search(reply).await.inspect_err(|e| {
                        error!("Stopping session: {}", e);
                    })?;
                    report(&outcomes, outcome);
                } else {
                    debug!("Dropping reply for cancelled search '{}'", reply.query);
                }
            }
        }
        snapshot.send_replace(StoreSnapshot::of(&session));
    }

    if let Some(pending) = outstanding.take() {
        pending.cancel();
    }
    Ok(session)
}

fn start_geocode(
    session: &MapSession,
    pending: PendingSearch,
    replies: &mpsc::UnboundedSender<GeocodeReply>,
) -> Outstanding {
    let ticket = pending.ticket();
    let geocoder = session.geocoder();
    let timeout = session.search_timeout();
    let replies = replies.clone();
    let task = tokio::spawn(async move {
        let reply = pending.run(geocoder.as_ref(), timeout).await;
        let _ = replies.send(reply);
    });
    Outstanding { ticket, task }
}

fn report(outcomes: &mpsc::Sender<SearchOutcome>, outcome: SearchOutcome) {
    if let Err(mpsc::error::TrySendError::Full(outcome)) = outcomes.try_send(outcome) {
        warn!("Outcome buffer full, dropping {:?}", outcome);
    }
}

async fn apply(
    session: &mut MapSession,
    command: Command,
    outstanding: &mut Option<Outstanding>,
    outcomes: &mpsc::Sender<SearchOutcome>,
    replies: &mpsc::UnboundedSender<GeocodeReply>,
) {
    match command {
        Command::SetSearchText(text) => session.set_search_text(&text).await,
        Command::SubmitSearch(text) => {
            let step = session.begin_search(&text).await;
            if !matches!(step, SearchStep::Idle) {
                if let Some(previous) = outstanding.take() {
                    previous.cancel();
                    report(outcomes, SearchOutcome::Superseded);
                }
            }
            match step {
                SearchStep::Idle => report(outcomes, SearchOutcome::Ignored),
                SearchStep::Resolved(id) => report(outcomes, SearchOutcome::SelectedExisting(id)),
                SearchStep::Pending(pending) => {
                    *outstanding = Some(start_geocode(session, pending, replies));
                }
            }
        }
        Command::SelectLocations(ids) => session.select_locations(ids),
        Command::DeleteLocation(id) => {
            session.delete_location(id);
        }
        Command::DeleteSelected => {
            session.delete_selected();
        }
    }
}
