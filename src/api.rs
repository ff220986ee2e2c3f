use std::{num::NonZeroU32, sync::Arc};

use async_trait::async_trait;
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    error::{AppError, AppResult},
    models::{ConfirmedDelete, Movie, MovieDraft, MovieId},
    query::MovieFilter,
    session::SessionStore,
};

/// Operations the controllers need from the movie service.
#[async_trait]
pub trait MovieService: Send + Sync {
    async fn list_movies(&self, filter: &MovieFilter) -> AppResult<Vec<Movie>>;

    async fn get_movie(&self, id: &MovieId) -> AppResult<Movie>;

    async fn create_movie(&self, draft: &MovieDraft) -> AppResult<Option<Movie>>;

    async fn update_movie(&self, existing: &Movie, draft: &MovieDraft) -> AppResult<Option<Movie>>;

    async fn delete_movie(&self, request: ConfirmedDelete) -> AppResult<()>;

    async fn my_collection(&self, email: &str) -> AppResult<Vec<Movie>>;
}

/// HTTP client for the remote movie service.
///
/// The bearer credential is looked up in the [`SessionStore`] each time a
/// request is built, so sign-in and sign-out take effect on the next call.
pub struct MovieApi {
    client: reqwest::Client,
    base_url: String,
    session: SessionStore,
    limiter: Option<Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>>,
}

impl MovieApi {
    /// `rps` caps outgoing requests per second; 0 turns the cap off.
    pub fn new(client: reqwest::Client, base_url: String, session: SessionStore, rps: u32) -> Self {
        let limiter =
            NonZeroU32::new(rps).map(|n| Arc::new(RateLimiter::direct(Quota::per_second(n))));
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        Self { client, base_url, session, limiter }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    async fn request(&self, method: Method, path: &str) -> RequestBuilder {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }

        let url = format!("{}{}", self.base_url, path);
        let token = self.session.access_token();
        debug!(method = %method, url = %url, authenticated = token.is_some(), "sending request");

        let req = self.client.request(method, url);
        match token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    fn require_owner(&self, added_by: &str) -> AppResult<()> {
        let session = self.session.current().ok_or(AppError::Unauthenticated)?;
        if !session.owns(added_by) {
            return Err(AppError::NotOwner { owner: added_by.to_string() });
        }
        Ok(())
    }
}

#[async_trait]
impl MovieService for MovieApi {
    async fn list_movies(&self, filter: &MovieFilter) -> AppResult<Vec<Movie>> {
        let path = format!("/api/movies{}", filter.to_query_string());
        let resp = self.request(Method::GET, &path).await.send().await?;
        let body = read_body(resp, "Failed to load movies").await?;
        let movies = decode_list(body)?;
        debug!(count = movies.len(), "loaded movies");
        Ok(movies)
    }

    async fn get_movie(&self, id: &MovieId) -> AppResult<Movie> {
        let path = format!("/api/movies/{}", urlencoding::encode(id.as_str()));
        let resp = self.request(Method::GET, &path).await.send().await?;
        let body = read_body(resp, "Failed to fetch movie details").await?;
        decode_one(body)?.ok_or_else(|| AppError::NotFound("Movie details not found".to_string()))
    }

    async fn create_movie(&self, draft: &MovieDraft) -> AppResult<Option<Movie>> {
        let session = self.session.current().ok_or(AppError::Unauthenticated)?;
        let payload = draft.validate(&session.email)?;

        let resp = self.request(Method::POST, "/api/movies/add").await.json(&payload).send().await?;
        let body = read_body(resp, "Failed to create movie").await?;
        debug!(title = %payload.title, "movie created");
        Ok(decode_one(body).unwrap_or_else(|err| {
            warn!(error = %err, "create response did not contain a movie");
            None
        }))
    }

    async fn update_movie(&self, existing: &Movie, draft: &MovieDraft) -> AppResult<Option<Movie>> {
        self.require_owner(&existing.added_by)?;
        // addedBy always comes from the stored movie, never from the form.
        let payload = draft.validate(&existing.added_by)?;

        let path = format!("/api/movies/update/{}", urlencoding::encode(existing.id.as_str()));
        let resp = self.request(Method::PUT, &path).await.json(&payload).send().await?;
        let body = read_body(resp, "Failed to update movie").await?;
        debug!(movie_id = %existing.id, "movie updated");
        Ok(decode_one(body).unwrap_or_else(|err| {
            warn!(movie_id = %existing.id, error = %err, "update response did not contain a movie");
            None
        }))
    }

    async fn delete_movie(&self, request: ConfirmedDelete) -> AppResult<()> {
        self.require_owner(request.added_by())?;

        let path = format!("/api/movies/{}", urlencoding::encode(request.id().as_str()));
        let resp = self.request(Method::DELETE, &path).await.send().await?;
        read_body(resp, "Failed to delete movie").await?;
        debug!(movie_id = %request.id(), title = %request.title(), "movie deleted");
        Ok(())
    }

    async fn my_collection(&self, email: &str) -> AppResult<Vec<Movie>> {
        let path = format!("/api/movies/my-collection/{}", urlencoding::encode(email));
        let resp = self.request(Method::GET, &path).await.send().await?;
        let body = read_body(resp, "Failed to load collection").await?;
        let movies = decode_list(body)?;
        debug!(email = %email, count = movies.len(), "loaded collection");
        Ok(movies)
    }
}

async fn read_body(resp: Response, fallback: &str) -> AppResult<Value> {
    let status = resp.status();
    let text = resp.text().await?;

    if !status.is_success() {
        warn!(status = %status, "request failed");
        return Err(AppError::from_response(status, &text, fallback));
    }

    if status == StatusCode::NO_CONTENT || text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&text)?)
}

/// Single-movie endpoints answer with either `{ "data": movie }` or the
/// bare movie; list endpoints with `{ "data": [...] }` or a bare array.
fn unwrap_envelope(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        },
        other => other,
    }
}

/// Records that do not decode are skipped so one bad movie does not hide
/// the rest of the list.
fn decode_list(body: Value) -> AppResult<Vec<Movie>> {
    let items = match unwrap_envelope(body) {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        other => return decode(other),
    };

    let total = items.len();
    let movies: Vec<Movie> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<Movie>(item) {
            Ok(movie) => Some(movie),
            Err(err) => {
                warn!(error = %err, "skipping movie that failed to decode");
                None
            },
        })
        .collect();
    if movies.len() != total {
        debug!(kept = movies.len(), total, "dropped undecodable movies");
    }
    Ok(movies)
}

fn decode_one(body: Value) -> AppResult<Option<Movie>> {
    match unwrap_envelope(body) {
        Value::Null => Ok(None),
        Value::Object(map) if map.is_empty() => Ok(None),
        // Acknowledgement bodies (`{"message": ...}`) decode into a movie
        // with no id; those are not movies.
        value => decode::<Movie>(value).map(|m| Some(m).filter(|m| !m.id.as_str().is_empty())),
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> AppResult<T> {
    Ok(serde_json::from_value(value)?)
}
