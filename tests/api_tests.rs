use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Path, Request, State},
    http::{StatusCode, header::AUTHORIZATION},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use moviemaster::{
    AppError, Movie, MovieApi, MovieDraft, MovieFilter, MovieId, MovieService, Session,
    SessionStore,
};
use serde_json::{Value, json};

#[derive(Clone, Debug)]
struct Seen {
    method: String,
    path: String,
    query: Option<String>,
    authorization: Option<String>,
}

#[derive(Clone, Default)]
struct FakeService {
    seen: Arc<Mutex<Vec<Seen>>>,
    bodies: Arc<Mutex<Vec<Value>>>,
}

impl FakeService {
    fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }

    fn last(&self) -> Seen {
        self.seen().last().cloned().expect("no request recorded")
    }
}

fn movie_json(id: &str, title: &str, added_by: &str) -> Value {
    json!({
        "_id": id,
        "title": title,
        "genre": "Drama",
        "releaseYear": 1995,
        "director": "Michael Mann",
        "cast": ["Al Pacino", "Robert De Niro"],
        "rating": 8.3,
        "duration": 170,
        "plotSummary": "Cops and robbers.",
        "posterUrl": "https://img.example.com/heat.jpg",
        "language": "English",
        "country": "USA",
        "addedBy": added_by,
    })
}

async fn record(State(fake): State<FakeService>, req: Request, next: Next) -> Response {
    let seen = Seen {
        method: req.method().to_string(),
        path: req.uri().path().to_string(),
        query: req.uri().query().map(str::to_string),
        authorization: req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    };
    fake.seen.lock().unwrap().push(seen);
    next.run(req).await
}

async fn list() -> Json<Value> {
    Json(json!({ "data": [
        movie_json("650000000000000000000001", "Heat", "ana@example.com"),
        movie_json("660000000000000000000002", "Collateral", "bo@example.com"),
    ]}))
}

async fn one(Path(id): Path<String>) -> Response {
    match id.as_str() {
        "bare" => Json(movie_json("bare", "Heat", "ana@example.com")).into_response(),
        "wrapped" => {
            let movie = movie_json("wrapped", "Heat", "ana@example.com");
            Json(json!({ "data": movie })).into_response()
        },
        "empty" => Json(json!({ "data": null })).into_response(),
        _ => (StatusCode::NOT_FOUND, Json(json!({ "message": "No movie with that id" })))
            .into_response(),
    }
}

async fn add(State(fake): State<FakeService>, Json(body): Json<Value>) -> Response {
    fake.bodies.lock().unwrap().push(body.clone());
    let mut created = body;
    created["_id"] = json!("670000000000000000000003");
    (StatusCode::CREATED, Json(json!({ "data": created }))).into_response()
}

async fn update(
    State(fake): State<FakeService>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    fake.bodies.lock().unwrap().push(body);
    Json(json!({ "message": format!("updated {id}") })).into_response()
}

async fn remove(req: Request) -> Response {
    if req.headers().get(AUTHORIZATION).is_none() {
        return (StatusCode::UNAUTHORIZED, Json(json!({}))).into_response();
    }
    Json(json!({ "deleted": true })).into_response()
}

async fn collection(Path(email): Path<String>) -> Json<Value> {
    Json(json!([movie_json("650000000000000000000001", "Heat", &email)]))
}

async fn broken() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response()
}

async fn spawn_service() -> (String, FakeService) {
    let fake = FakeService::default();
    let app = Router::new()
        .route("/api/movies", get(list))
        .route("/api/movies/add", post(add))
        .route("/api/movies/update/{id}", put(update))
        .route("/api/movies/my-collection/{email}", get(collection))
        .route("/api/movies/{id}", get(one).delete(remove))
        .route("/broken/api/movies", get(broken))
        .layer(middleware::from_fn_with_state(fake.clone(), record))
        .with_state(fake.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), fake)
}

fn client(base_url: &str, session: &SessionStore) -> MovieApi {
    MovieApi::new(reqwest::Client::new(), base_url.to_string(), session.clone(), 0)
}

fn draft() -> MovieDraft {
    MovieDraft {
        title: "Thief".into(),
        genre: "Crime".into(),
        release_year: "1981".into(),
        director: "Michael Mann".into(),
        cast: "James Caan, Tuesday Weld".into(),
        rating: "7.4".into(),
        duration: "123".into(),
        plot_summary: "One last job.".into(),
        poster_url: "https://img.example.com/thief.jpg".into(),
        language: "English".into(),
        country: "USA".into(),
    }
}

#[tokio::test]
async fn bearer_header_follows_the_session() {
    let (base, fake) = spawn_service().await;
    let session = SessionStore::new();
    let api = client(&base, &session);

    api.list_movies(&MovieFilter::default()).await.unwrap();
    assert_eq!(fake.last().authorization, None);

    session.sign_in(Session::new("ana@example.com", "token-1"));
    api.list_movies(&MovieFilter::default()).await.unwrap();
    assert_eq!(fake.last().authorization.as_deref(), Some("Bearer token-1"));

    session.sign_in(Session::new("ana@example.com", "token-2"));
    api.get_movie(&MovieId::new("bare")).await.unwrap();
    assert_eq!(fake.last().authorization.as_deref(), Some("Bearer token-2"));

    session.sign_out();
    api.list_movies(&MovieFilter::default()).await.unwrap();
    assert_eq!(fake.last().authorization, None);
}

#[tokio::test]
async fn list_sends_filter_query() {
    let (base, fake) = spawn_service().await;
    let api = client(&base, &SessionStore::new());

    let movies = api.list_movies(&MovieFilter::default()).await.unwrap();
    assert_eq!(movies.len(), 2);
    assert_eq!(movies[0].title, "Heat");
    assert_eq!(movies[1].added_by, "bo@example.com");
    assert_eq!(fake.last().query, None);

    let filter = MovieFilter::from_form(["Action", "Drama"], "6", "");
    api.list_movies(&filter).await.unwrap();
    let seen = fake.last();
    assert_eq!(seen.path, "/api/movies");
    assert_eq!(seen.query.as_deref(), Some("genres=Action,Drama&minRating=6"));
}

#[tokio::test]
async fn single_movie_envelopes_are_normalized() {
    let (base, _fake) = spawn_service().await;
    let api = client(&base, &SessionStore::new());

    let bare = api.get_movie(&MovieId::new("bare")).await.unwrap();
    let wrapped = api.get_movie(&MovieId::new("wrapped")).await.unwrap();
    assert_eq!(bare.title, wrapped.title);
    assert_eq!(wrapped.id.as_str(), "wrapped");
    assert_eq!(wrapped.cast, vec!["Al Pacino", "Robert De Niro"]);

    let err = api.get_movie(&MovieId::new("empty")).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(err.to_string(), "Movie details not found");

    let err = api.get_movie(&MovieId::new("missing")).await.unwrap_err();
    assert_eq!(err.status(), Some(reqwest::StatusCode::NOT_FOUND));
    assert_eq!(err.to_string(), "No movie with that id");
}

#[tokio::test]
async fn error_without_message_uses_fallback() {
    let (base, _fake) = spawn_service().await;
    let api = client(&format!("{base}/broken"), &SessionStore::new());

    let err = api.list_movies(&MovieFilter::default()).await.unwrap_err();
    assert_eq!(err.status(), Some(reqwest::StatusCode::INTERNAL_SERVER_ERROR));
    assert_eq!(err.to_string(), "Failed to load movies");
}

#[tokio::test]
async fn transport_failure_is_reported() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let api = client(&format!("http://{addr}"), &SessionStore::new());
    let err = api.list_movies(&MovieFilter::default()).await.unwrap_err();
    assert!(matches!(err, AppError::Transport(_)));
}

#[tokio::test]
async fn create_requires_session_and_stamps_owner() {
    let (base, fake) = spawn_service().await;
    let session = SessionStore::new();
    let api = client(&base, &session);

    let err = api.create_movie(&draft()).await.unwrap_err();
    assert!(matches!(err, AppError::Unauthenticated));
    assert!(fake.seen().is_empty());

    session.sign_in(Session::new("ana@example.com", "tok"));
    let created = api.create_movie(&draft()).await.unwrap().unwrap();
    assert_eq!(created.id.as_str(), "670000000000000000000003");
    assert_eq!(created.added_by, "ana@example.com");

    let body = fake.bodies.lock().unwrap().last().cloned().unwrap();
    assert_eq!(body["addedBy"], "ana@example.com");
    assert_eq!(body["cast"], json!(["James Caan", "Tuesday Weld"]));
    assert_eq!(body["releaseYear"], 1981);

    let mut bad = draft();
    bad.poster_url.clear();
    let err = api.create_movie(&bad).await.unwrap_err();
    assert_eq!(err.to_string(), "Poster URL is required.");
}

#[tokio::test]
async fn update_keeps_original_owner_and_checks_ownership() {
    let (base, fake) = spawn_service().await;
    let session = SessionStore::new();
    let api = client(&base, &session);

    let existing: Movie =
        serde_json::from_value(movie_json("650000000000000000000001", "Heat", "ana@example.com"))
            .unwrap();

    session.sign_in(Session::new("bo@example.com", "tok"));
    let err = api.update_movie(&existing, &draft()).await.unwrap_err();
    assert!(matches!(err, AppError::NotOwner { .. }));
    assert!(fake.seen().is_empty());

    session.sign_in(Session::new("ana@example.com", "tok"));
    let updated = api.update_movie(&existing, &draft()).await.unwrap();
    assert!(updated.is_none());

    let seen = fake.last();
    assert_eq!(seen.method, "PUT");
    assert_eq!(seen.path, "/api/movies/update/650000000000000000000001");
    assert_eq!(seen.authorization.as_deref(), Some("Bearer tok"));
    let body = fake.bodies.lock().unwrap().last().cloned().unwrap();
    assert_eq!(body["addedBy"], "ana@example.com");
    assert_eq!(body["title"], "Thief");
}

#[tokio::test]
async fn delete_is_owner_only_and_authenticated() {
    let (base, fake) = spawn_service().await;
    let session = SessionStore::new();
    let api = client(&base, &session);

    let movie: Movie =
        serde_json::from_value(movie_json("650000000000000000000001", "Heat", "ana@example.com"))
            .unwrap();

    let err = api.delete_movie(movie.request_delete().confirm()).await.unwrap_err();
    assert!(matches!(err, AppError::Unauthenticated));

    session.sign_in(Session::new("ana@example.com", "tok"));
    api.delete_movie(movie.request_delete().confirm()).await.unwrap();
    let seen = fake.last();
    assert_eq!(seen.method, "DELETE");
    assert_eq!(seen.path, "/api/movies/650000000000000000000001");

    // Signed in without a usable token: the service rejects it with no message.
    session.sign_in(Session::new("ana@example.com", ""));
    let err = api.delete_movie(movie.request_delete().confirm()).await.unwrap_err();
    assert_eq!(err.status(), Some(reqwest::StatusCode::UNAUTHORIZED));
    assert_eq!(err.to_string(), "Failed to delete movie");
}

#[tokio::test]
async fn collection_accepts_bare_array_and_encodes_email() {
    let (base, fake) = spawn_service().await;
    let session = SessionStore::new();
    session.sign_in(Session::new("ana+films@example.com", "tok"));
    let api = client(&base, &session);

    let movies = api.my_collection("ana+films@example.com").await.unwrap();
    assert_eq!(movies.len(), 1);
    assert_eq!(movies[0].added_by, "ana+films@example.com");

    let seen = fake.last();
    assert_eq!(seen.path, "/api/movies/my-collection/ana%2Bfilms%40example.com");
    assert_eq!(seen.authorization.as_deref(), Some("Bearer tok"));
}
