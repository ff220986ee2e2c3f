use std::{cmp::Reverse, sync::Arc, time::Duration};

use tokio::{sync::watch, task::JoinHandle};
use tracing::debug;

use crate::{
    api::MovieService,
    loader::{Generation, LoadState, publish},
    models::Movie,
    query::MovieFilter,
};

pub const TOP_RATED_LIMIT: usize = 5;
pub const RECENTLY_ADDED_LIMIT: usize = 6;
pub const FEATURED_LIMIT: usize = 3;

/// Highest rated first; equal ratings keep their list order.
pub fn top_rated(movies: &[Movie]) -> Vec<Movie> {
    let mut sorted = movies.to_vec();
    sorted.sort_by(|a, b| b.rating_or_zero().total_cmp(&a.rating_or_zero()));
    sorted.truncate(TOP_RATED_LIMIT);
    sorted
}

/// Newest first, by the creation time embedded in the id. Ids without a
/// readable timestamp go last.
pub fn recently_added(movies: &[Movie]) -> Vec<Movie> {
    let mut sorted = movies.to_vec();
    sorted.sort_by_cached_key(|m| Reverse(m.id.created_at()));
    sorted.truncate(RECENTLY_ADDED_LIMIT);
    sorted
}

/// Banner slides: the service's own order, no sorting.
pub fn featured(movies: &[Movie]) -> Vec<Movie> {
    movies.iter().take(FEATURED_LIMIT).cloned().collect()
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct HomeSections {
    pub featured: Vec<Movie>,
    pub top_rated: Vec<Movie>,
    pub recently_added: Vec<Movie>,
    pub total_movies: usize,
}

impl HomeSections {
    pub fn from_movies(movies: &[Movie]) -> Self {
        Self {
            featured: featured(movies),
            top_rated: top_rated(movies),
            recently_added: recently_added(movies),
            total_movies: movies.len(),
        }
    }
}

/// Home page loader. Fetches the full list once and holds the sections back
/// until `reveal_delay` has passed since the refresh started.
pub struct HomeFeed<S> {
    service: Arc<S>,
    reveal_delay: Duration,
    state: Arc<watch::Sender<LoadState<HomeSections>>>,
    generation: Generation,
    task: Option<JoinHandle<()>>,
}

impl<S> HomeFeed<S>
where
    S: MovieService + 'static,
{
    pub fn new(service: Arc<S>, reveal_delay: Duration) -> Self {
        let (tx, _rx) = watch::channel(LoadState::Loading);
        Self {
            service,
            reveal_delay,
            state: Arc::new(tx),
            generation: Generation::new(),
            task: None,
        }
    }

    pub fn refresh(&mut self) {
        let ticket = self.generation.advance();
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.state.send_replace(LoadState::Loading);

        let service = self.service.clone();
        let state = self.state.clone();
        let reveal_delay = self.reveal_delay;
        self.task = Some(tokio::spawn(async move {
            let reveal_at = tokio::time::Instant::now() + reveal_delay;
            let result = service.list_movies(&MovieFilter::default()).await;
            let sections = result.map(|movies| HomeSections::from_movies(&movies));

            tokio::time::sleep_until(reveal_at).await;
            if let Ok(sections) = &sections {
                debug!(
                    total = sections.total_movies,
                    featured = sections.featured.len(),
                    top_rated = sections.top_rated.len(),
                    recently_added = sections.recently_added.len(),
                    "home sections ready"
                );
            }
            publish(&state, &ticket, sections.into());
        }));
    }

    pub fn state(&self) -> LoadState<HomeSections> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LoadState<HomeSections>> {
        self.state.subscribe()
    }
}

impl<S> Drop for HomeFeed<S> {
    fn drop(&mut self) {
        self.generation.invalidate();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
