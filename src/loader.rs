use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use tokio::{sync::watch, task::JoinHandle};
use tracing::debug;

use crate::{
    api::MovieService,
    error::AppResult,
    models::{Movie, MovieId},
};

#[derive(Clone, Debug, PartialEq)]
pub enum LoadState<T> {
    Loading,
    Ready(T),
    Failed(String),
}

impl<T> LoadState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            LoadState::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            LoadState::Failed(message) => Some(message.as_str()),
            _ => None,
        }
    }
}

impl<T> From<AppResult<T>> for LoadState<T> {
    fn from(result: AppResult<T>) -> Self {
        match result {
            Ok(value) => LoadState::Ready(value),
            Err(err) => LoadState::Failed(err.to_string()),
        }
    }
}

/// Monotonic request counter shared between a controller and the tasks it
/// spawns. Starting a new request or tearing the controller down makes every
/// older [`Ticket`] stale.
#[derive(Clone, Debug, Default)]
pub struct Generation(Arc<AtomicU64>);

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self) -> Ticket {
        let value = self.0.fetch_add(1, Ordering::SeqCst) + 1;
        Ticket { generation: self.clone(), value }
    }

    pub fn invalidate(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Debug)]
pub struct Ticket {
    generation: Generation,
    value: u64,
}

impl Ticket {
    pub fn is_current(&self) -> bool {
        self.generation.current() == self.value
    }

    pub fn value(&self) -> u64 {
        self.value
    }
}

/// Publishes `value` unless `ticket` has been superseded. Returns whether it
/// was published.
pub(crate) fn publish<T>(
    state: &watch::Sender<LoadState<T>>,
    ticket: &Ticket,
    value: LoadState<T>,
) -> bool {
    // Checked under the channel's write lock so a newer request cannot slip in
    // between the check and the write.
    let published = state.send_if_modified(|current| {
        if !ticket.is_current() {
            return false;
        }
        *current = value;
        true
    });
    if !published {
        debug!(ticket = ticket.value(), "discarding stale result");
    }
    published
}

/// State behind the movie details page.
pub struct MovieDetails<S> {
    service: Arc<S>,
    state: Arc<watch::Sender<LoadState<Movie>>>,
    generation: Generation,
    current_id: Option<MovieId>,
    task: Option<JoinHandle<()>>,
}

impl<S> MovieDetails<S>
where
    S: MovieService + 'static,
{
    pub fn new(service: Arc<S>) -> Self {
        let (tx, _rx) = watch::channel(LoadState::Loading);
        Self {
            service,
            state: Arc::new(tx),
            generation: Generation::new(),
            current_id: None,
            task: None,
        }
    }

    /// Starts loading `id`. A load still in flight for a previous id keeps
    /// running but its result is dropped.
    pub fn load(&mut self, id: MovieId) {
        let ticket = self.generation.advance();
        self.state.send_replace(LoadState::Loading);
        self.current_id = Some(id.clone());

        let service = self.service.clone();
        let state = self.state.clone();
        debug!(movie_id = %id, ticket = ticket.value(), "loading movie details");
        self.task = Some(tokio::spawn(async move {
            let result = service.get_movie(&id).await;
            publish(&state, &ticket, result.into());
        }));
    }

    pub fn current_id(&self) -> Option<&MovieId> {
        self.current_id.as_ref()
    }

    pub fn state(&self) -> LoadState<Movie> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LoadState<Movie>> {
        self.state.subscribe()
    }
}

impl<S> Drop for MovieDetails<S> {
    fn drop(&mut self) {
        self.generation.invalidate();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
