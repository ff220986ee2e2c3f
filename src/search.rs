use std::{sync::Arc, time::Duration};

use tokio::sync::watch;
use tracing::debug;

use crate::{
    api::MovieService,
    debounce::Debouncer,
    loader::{LoadState, publish},
    models::Movie,
    query::MovieFilter,
};

/// The filterable "all movies" list. Filter edits are debounced and only the
/// newest request may update the visible list.
pub struct MovieSearch<S> {
    service: Arc<S>,
    filter: MovieFilter,
    state: Arc<watch::Sender<LoadState<Vec<Movie>>>>,
    debouncer: Debouncer,
}

impl<S> MovieSearch<S>
where
    S: MovieService + 'static,
{
    pub fn new(service: Arc<S>, quiet_period: Duration) -> Self {
        let (tx, _rx) = watch::channel(LoadState::Loading);
        Self {
            service,
            filter: MovieFilter::default(),
            state: Arc::new(tx),
            debouncer: Debouncer::new(quiet_period),
        }
    }

    /// Initial load of the unfiltered list.
    pub fn start(&mut self) {
        self.schedule();
    }

    pub fn filter(&self) -> &MovieFilter {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: MovieFilter) {
        self.filter = filter;
        self.schedule();
    }

    /// Applies an in-place edit to the filter, e.g. a genre checkbox toggle.
    pub fn update_filter(&mut self, edit: impl FnOnce(&mut MovieFilter)) {
        edit(&mut self.filter);
        self.schedule();
    }

    pub fn state(&self) -> LoadState<Vec<Movie>> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LoadState<Vec<Movie>>> {
        self.state.subscribe()
    }

    fn schedule(&mut self) {
        let filter = self.filter.clone();
        let service = self.service.clone();
        let state = self.state.clone();

        let ticket = self.debouncer.supersede();
        self.state.send_replace(LoadState::Loading);
        self.debouncer.schedule(ticket.clone(), move |ticket| async move {
            debug!(query = %filter.to_query_string(), ticket = ticket.value(), "searching movies");
            let result = service.list_movies(&filter).await;
            publish(&state, &ticket, result.into());
        });
        debug!(ticket = ticket.value(), "movie search scheduled");
    }
}
