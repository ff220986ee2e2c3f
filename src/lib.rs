pub mod api;
pub mod carousel;
pub mod collection;
pub mod config;
pub mod debounce;
pub mod error;
pub mod loader;
pub mod models;
pub mod query;
pub mod search;
pub mod session;
pub mod views;

pub use crate::{
    api::{MovieApi, MovieService},
    config::Config,
    error::{AppError, AppResult},
    loader::LoadState,
    models::{Movie, MovieDraft, MovieId},
    query::MovieFilter,
    session::{Session, SessionStore},
};
