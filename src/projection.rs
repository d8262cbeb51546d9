//! Observable in-memory mirror of the track library.
//!
//! The projection never touches storage itself: every mutation goes through
//! [`LibraryManager`] and the projection applies the result as a minimal edit
//! of its cached list. Subscribers get a [`watch::Receiver`] that replays the
//! latest snapshot on subscribe; dropping the receiver unsubscribes.
//!
//! Operations are not serialized. Overlapping operations each move the
//! state through `Loading` and the last one to finish decides what
//! subscribers see.

use std::sync::Arc;

use log::{debug, error};
use tokio::sync::watch;

use crate::{
    domain::{Track, TrackForm, TrackId, TrackUpdate},
    library::{LibraryError, LibraryManager},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperationState {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LibrarySnapshot {
    /// newest first
    pub tracks: Vec<Track>,
    pub state: OperationState,
    pub error: Option<String>,
    pub selected: Option<Track>,
}

impl LibrarySnapshot {
    fn forget(&mut self, id: TrackId) {
        self.tracks.retain(|t| t.id != id);
        if self.selected.as_ref().is_some_and(|t| t.id == id) {
            self.selected = None;
        }
    }
}

pub struct LibraryProjection {
    manager: Arc<LibraryManager>,
    cell: watch::Sender<LibrarySnapshot>,
}

impl LibraryProjection {
    /// starts empty and idle, call [`Self::refresh`] to load the library
    pub fn new(manager: Arc<LibraryManager>) -> Self {
        let (cell, _) = watch::channel(LibrarySnapshot::default());
        Self { manager, cell }
    }

    pub fn subscribe(&self) -> watch::Receiver<LibrarySnapshot> {
        self.cell.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.cell.receiver_count()
    }

    pub fn snapshot(&self) -> LibrarySnapshot {
        self.cell.borrow().clone()
    }

    pub fn tracks(&self) -> Vec<Track> {
        self.cell.borrow().tracks.clone()
    }

    pub fn state(&self) -> OperationState {
        self.cell.borrow().state
    }

    pub fn last_error(&self) -> Option<String> {
        self.cell.borrow().error.clone()
    }

    pub fn selected(&self) -> Option<Track> {
        self.cell.borrow().selected.clone()
    }

    /// Reloads every track from the store, replacing the cached list.
    ///
    /// Recovery path after storage was changed behind the projection's back.
    pub async fn refresh(&self) -> Result<(), LibraryError> {
        self.begin();
        match self.manager.list_tracks().await {
            Ok(tracks) => {
                debug!("Projection reloaded {} tracks", tracks.len());
                self.cell.send_modify(|s| {
                    s.selected = s
                        .selected
                        .take()
                        .and_then(|sel| tracks.iter().find(|t| t.id == sel.id).cloned());
                    s.tracks = tracks;
                    s.state = OperationState::Success;
                });
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    pub async fn create_track(&self, form: TrackForm) -> Result<Track, LibraryError> {
        self.begin();
        match self.manager.create_track(form).await {
            Ok(track) => {
                self.cell.send_modify(|s| {
                    s.tracks.insert(0, track.clone());
                    s.state = OperationState::Success;
                });
                Ok(track)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    pub async fn update_track(
        &self,
        id: TrackId,
        update: TrackUpdate,
    ) -> Result<Track, LibraryError> {
        self.begin();
        match self.manager.update_track(id, update).await {
            Ok(track) => {
                self.cell.send_modify(|s| {
                    if let Some(slot) = s.tracks.iter_mut().find(|t| t.id == id) {
                        *slot = track.clone();
                    }
                    if s.selected.as_ref().is_some_and(|t| t.id == id) {
                        s.selected = Some(track.clone());
                    }
                    s.state = OperationState::Success;
                });
                Ok(track)
            }
            Err(e) => {
                if e.is_not_found() {
                    self.cell.send_modify(|s| s.forget(id));
                }
                Err(self.fail(e))
            }
        }
    }

    pub async fn delete_track(&self, id: TrackId) -> Result<(), LibraryError> {
        self.begin();
        match self.manager.delete_track(id).await {
            Ok(()) => {
                self.cell.send_modify(|s| {
                    s.forget(id);
                    s.state = OperationState::Success;
                });
                Ok(())
            }
            Err(e) => {
                if e.is_not_found() {
                    self.cell.send_modify(|s| s.forget(id));
                }
                Err(self.fail(e))
            }
        }
    }

    /// fetches one track from the store and selects it
    pub async fn open_track(&self, id: TrackId) -> Result<Option<Track>, LibraryError> {
        self.begin();
        match self.manager.get_track(id).await {
            Ok(Some(track)) => {
                self.cell.send_modify(|s| {
                    if let Some(slot) = s.tracks.iter_mut().find(|t| t.id == id) {
                        *slot = track.clone();
                    }
                    s.selected = Some(track.clone());
                    s.state = OperationState::Success;
                });
                Ok(Some(track))
            }
            Ok(None) => {
                self.cell.send_modify(|s| {
                    s.forget(id);
                    s.selected = None;
                    s.state = OperationState::Success;
                });
                Ok(None)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Selects a cached track without touching storage.
    ///
    /// Returns false, and clears the selection, when the id is not cached.
    pub fn select_track(&self, id: TrackId) -> bool {
        let mut found = false;
        self.cell.send_modify(|s| {
            s.selected = s.tracks.iter().find(|t| t.id == id).cloned();
            found = s.selected.is_some();
        });
        found
    }

    pub fn clear_selection(&self) {
        self.cell.send_if_modified(|s| s.selected.take().is_some());
    }

    /// `Error -> Idle`. Does nothing in other states and never retries.
    pub fn clear_error(&self) {
        self.cell.send_if_modified(|s| {
            if s.state != OperationState::Error {
                return false;
            }
            s.state = OperationState::Idle;
            s.error = None;
            true
        });
    }

    fn begin(&self) {
        self.cell.send_modify(|s| {
            s.state = OperationState::Loading;
            s.error = None;
        });
    }

    fn fail(&self, err: LibraryError) -> LibraryError {
        error!("Library operation failed: {err}");
        let message = err.to_string();
        self.cell.send_modify(|s| {
            s.state = OperationState::Error;
            s.error = Some(message);
        });
        err
    }
}
