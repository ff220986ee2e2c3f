use std::fmt;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, AppResult};

/// Identifier assigned by the movie service. The first 8 hex characters are
/// the creation time in seconds since the epoch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovieId(String);

impl MovieId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn created_at(&self) -> Option<Timestamp> {
        let prefix = self.0.get(..8)?;
        let seconds = u32::from_str_radix(prefix, 16).ok()?;
        Timestamp::from_second(i64::from(seconds)).ok()
    }
}

impl fmt::Display for MovieId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MovieId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawMovie")]
pub struct Movie {
    #[serde(rename = "_id")]
    pub id: MovieId,
    pub title: String,
    pub genre: String,
    pub release_year: i32,
    pub director: String,
    pub cast: Vec<String>,
    pub rating: Option<f64>,
    pub duration: u32,
    pub plot_summary: String,
    pub poster_url: String,
    pub language: String,
    pub country: String,
    pub added_by: String,
}

impl Movie {
    /// Rating used for ordering; missing ratings count as 0.
    pub fn rating_or_zero(&self) -> f64 {
        self.rating.filter(|r| r.is_finite()).unwrap_or(0.0)
    }

    pub fn is_owned_by(&self, email: &str) -> bool {
        self.added_by == email
    }

    pub fn request_delete(&self) -> PendingDelete {
        PendingDelete {
            id: self.id.clone(),
            title: self.title.clone(),
            added_by: self.added_by.clone(),
        }
    }
}

/// Movie as the service sends it. Records may carry `_id`, `id`, or both,
/// and numeric fields sometimes arrive as strings or `null`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawMovie {
    #[serde(rename = "_id")]
    object_id: Option<MovieId>,
    id: Option<MovieId>,
    title: String,
    genre: String,
    release_year: Value,
    director: String,
    cast: Vec<String>,
    rating: Value,
    duration: Value,
    plot_summary: String,
    poster_url: String,
    language: String,
    country: String,
    added_by: String,
}

impl From<RawMovie> for Movie {
    fn from(raw: RawMovie) -> Self {
        let id = raw
            .object_id
            .filter(|id| !id.as_str().is_empty())
            .or(raw.id)
            .unwrap_or_default();
        Self {
            id,
            title: raw.title,
            genre: raw.genre,
            release_year: whole_number(&raw.release_year).unwrap_or_default(),
            director: raw.director,
            cast: raw.cast,
            rating: lenient_number(&raw.rating),
            duration: whole_number(&raw.duration).unwrap_or_default(),
            plot_summary: raw.plot_summary,
            poster_url: raw.poster_url,
            language: raw.language,
            country: raw.country,
            added_by: raw.added_by,
        }
    }
}

fn lenient_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

fn whole_number<T: TryFrom<i64>>(value: &Value) -> Option<T> {
    lenient_number(value)
        .filter(|n| n.fract() == 0.0)
        .and_then(|n| T::try_from(n as i64).ok())
}

/// A delete that has not been confirmed yet. Only [`PendingDelete::confirm`]
/// produces something the delete call accepts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingDelete {
    id: MovieId,
    title: String,
    added_by: String,
}

impl PendingDelete {
    pub fn prompt(&self) -> String {
        format!("Delete \"{}\"? This cannot be undone.", self.title)
    }

    pub fn confirm(self) -> ConfirmedDelete {
        ConfirmedDelete { id: self.id, title: self.title, added_by: self.added_by }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfirmedDelete {
    id: MovieId,
    title: String,
    added_by: String,
}

impl ConfirmedDelete {
    pub fn id(&self) -> &MovieId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn added_by(&self) -> &str {
        &self.added_by
    }
}

/// Body sent to the create and update endpoints.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoviePayload {
    pub title: String,
    pub genre: String,
    pub release_year: i32,
    pub director: String,
    pub cast: Vec<String>,
    pub rating: f64,
    pub duration: u32,
    pub plot_summary: String,
    pub poster_url: String,
    pub language: String,
    pub country: String,
    pub added_by: String,
}

/// Raw text of the add/edit movie form.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MovieDraft {
    pub title: String,
    pub genre: String,
    pub release_year: String,
    pub director: String,
    /// Comma separated.
    pub cast: String,
    pub rating: String,
    pub duration: String,
    pub plot_summary: String,
    pub poster_url: String,
    pub language: String,
    pub country: String,
}

impl MovieDraft {
    /// Pre-fill the edit form from a stored movie.
    pub fn from_movie(movie: &Movie) -> Self {
        Self {
            title: movie.title.clone(),
            genre: movie.genre.clone(),
            release_year: movie.release_year.to_string(),
            director: movie.director.clone(),
            cast: movie.cast.join(", "),
            rating: movie.rating.map(|r| r.to_string()).unwrap_or_default(),
            duration: movie.duration.to_string(),
            plot_summary: movie.plot_summary.clone(),
            poster_url: movie.poster_url.clone(),
            language: movie.language.clone(),
            country: movie.country.clone(),
        }
    }

    /// Checks fields in form order and reports the first problem.
    pub fn validate(&self, added_by: &str) -> AppResult<MoviePayload> {
        fn required(value: &str, message: &str) -> AppResult<String> {
            let value = value.trim();
            if value.is_empty() {
                return Err(AppError::Validation(message.to_string()));
            }
            Ok(value.to_string())
        }

        fn number<T: std::str::FromStr>(value: &str, message: &str) -> AppResult<T> {
            value.trim().parse().map_err(|_| AppError::Validation(message.to_string()))
        }

        let title = required(&self.title, "Title is required.")?;
        let genre = required(&self.genre, "Genre is required.")?;
        let release_year =
            number(&self.release_year, "Release year is required and must be a number.")?;
        let director = required(&self.director, "Director is required.")?;

        let cast: Vec<String> = self
            .cast
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        if cast.is_empty() {
            return Err(AppError::Validation("Cast is required (comma-separated).".to_string()));
        }

        let rating: f64 = number(&self.rating, "Rating is required and must be a number.")?;
        if !rating.is_finite() {
            return Err(AppError::Validation(
                "Rating is required and must be a number.".to_string(),
            ));
        }
        if !(0.0..=10.0).contains(&rating) {
            return Err(AppError::Validation("Rating must be between 0 and 10.".to_string()));
        }

        let duration =
            number(&self.duration, "Duration is required and must be a number (minutes).")?;
        let plot_summary = required(&self.plot_summary, "Plot summary is required.")?;
        let poster_url = required(&self.poster_url, "Poster URL is required.")?;
        let language = required(&self.language, "Language is required.")?;
        let country = required(&self.country, "Country is required.")?;

        Ok(MoviePayload {
            title,
            genre,
            release_year,
            director,
            cast,
            rating,
            duration,
            plot_summary,
            poster_url,
            language,
            country,
            added_by: added_by.to_string(),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Genre {
    pub name: &'static str,
}

impl Genre {
    pub fn slug(self) -> String {
        self.name.to_lowercase()
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        GENRES.iter().copied().find(|g| g.name.eq_ignore_ascii_case(slug.trim()))
    }
}

pub const GENRES: [Genre; 12] = [
    Genre { name: "Action" },
    Genre { name: "Drama" },
    Genre { name: "Comedy" },
    Genre { name: "Adventure" },
    Genre { name: "Sci-Fi" },
    Genre { name: "Romance" },
    Genre { name: "Horror" },
    Genre { name: "Thriller" },
    Genre { name: "Animation" },
    Genre { name: "Fantasy" },
    Genre { name: "Mystery" },
    Genre { name: "Documentary" },
];
