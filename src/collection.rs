use std::sync::Arc;

use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, warn};

use crate::{
    api::MovieService,
    error::{AppError, AppResult},
    loader::{Generation, LoadState, Ticket, publish},
    models::{ConfirmedDelete, Movie},
    session::SessionStore,
};

/// The signed-in user's submitted movies.
///
/// Follows the session: signing in loads that user's collection, signing out
/// empties it, and a load started for a previous user never lands.
pub struct MyCollection<S> {
    service: Arc<S>,
    session: SessionStore,
    state: Arc<watch::Sender<LoadState<Vec<Movie>>>>,
    generation: Generation,
    watcher: JoinHandle<()>,
}

impl<S> MyCollection<S>
where
    S: MovieService + 'static,
{
    pub fn new(service: Arc<S>, session: SessionStore) -> Self {
        let (tx, _rx) = watch::channel(LoadState::Loading);
        let state = Arc::new(tx);
        let generation = Generation::new();

        let watcher = tokio::spawn(watch_session(
            service.clone(),
            session.clone(),
            state.clone(),
            generation.clone(),
        ));

        Self { service, session, state, generation, watcher }
    }

    pub fn state(&self) -> LoadState<Vec<Movie>> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LoadState<Vec<Movie>>> {
        self.state.subscribe()
    }

    /// Whether the current user may edit or delete `movie`.
    pub fn can_modify(&self, movie: &Movie) -> bool {
        self.session.email().is_some_and(|email| movie.is_owned_by(&email))
    }

    /// Deletes a confirmed movie and drops it from the list. On failure the
    /// list is left alone and the error is returned for display.
    pub async fn delete(&self, request: ConfirmedDelete) -> AppResult<()> {
        let session = self.session.current().ok_or(AppError::Unauthenticated)?;
        if !session.owns(request.added_by()) {
            return Err(AppError::NotOwner { owner: request.added_by().to_string() });
        }

        let id = request.id().clone();
        if let Err(err) = self.service.delete_movie(request).await {
            warn!(movie_id = %id, error = %err, "delete failed");
            return Err(err);
        }

        self.state.send_if_modified(|state| match state {
            LoadState::Ready(movies) => {
                let before = movies.len();
                movies.retain(|m| m.id != id);
                movies.len() != before
            },
            _ => false,
        });
        Ok(())
    }

    /// Reloads for the current session, e.g. after adding a movie.
    pub fn reload(&self) {
        let ticket = self.generation.advance();
        tokio::spawn(load_for(
            self.service.clone(),
            self.session.email(),
            self.state.clone(),
            ticket,
        ));
    }
}

impl<S> Drop for MyCollection<S> {
    fn drop(&mut self) {
        self.generation.invalidate();
        self.watcher.abort();
    }
}

async fn watch_session<S>(
    service: Arc<S>,
    session: SessionStore,
    state: Arc<watch::Sender<LoadState<Vec<Movie>>>>,
    generation: Generation,
) where
    S: MovieService + 'static,
{
    let mut rx = session.subscribe();
    loop {
        let email = rx.borrow_and_update().as_ref().map(|s| s.email.clone());
        let ticket = generation.advance();
        tokio::spawn(load_for(service.clone(), email, state.clone(), ticket));

        if rx.changed().await.is_err() {
            break;
        }
    }
}

async fn load_for<S>(
    service: Arc<S>,
    email: Option<String>,
    state: Arc<watch::Sender<LoadState<Vec<Movie>>>>,
    ticket: Ticket,
) where
    S: MovieService + 'static,
{
    let Some(email) = email else {
        debug!("no session, collection is empty");
        publish(&state, &ticket, LoadState::Ready(Vec::new()));
        return;
    };

    publish(&state, &ticket, LoadState::Loading);
    let result = service.my_collection(&email).await;
    publish(&state, &ticket, result.into());
}
