use tracing::debug;

use crate::models::Genre;

/// Filter state of the movie list page.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MovieFilter {
    genres: Vec<String>,
    pub min_rating: Option<f64>,
    pub max_rating: Option<f64>,
}

impl MovieFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a filter from raw form values. Blank or unparseable rating
    /// text leaves that bound unset.
    pub fn from_form<I, S>(genres: I, min_rating: &str, max_rating: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut filter = Self::new();
        for genre in genres {
            filter.select_genre(genre.as_ref());
        }
        filter.min_rating = parse_rating("minRating", min_rating);
        filter.max_rating = parse_rating("maxRating", max_rating);
        filter
    }

    /// Filter behind a genre link such as `/genre/sci-fi`. Unknown slugs give
    /// `None`.
    pub fn for_genre_slug(slug: &str) -> Option<Self> {
        let genre = Genre::from_slug(slug)?;
        let mut filter = Self::new();
        filter.select_genre(genre.name);
        Some(filter)
    }

    pub fn genres(&self) -> &[String] {
        &self.genres
    }

    /// Adds a genre, keeping selection order. Blank labels and repeats are ignored.
    pub fn select_genre(&mut self, genre: &str) -> bool {
        let genre = genre.trim();
        if genre.is_empty() || self.genres.iter().any(|g| g == genre) {
            return false;
        }
        self.genres.push(genre.to_string());
        true
    }

    pub fn deselect_genre(&mut self, genre: &str) -> bool {
        let before = self.genres.len();
        self.genres.retain(|g| g != genre.trim());
        self.genres.len() != before
    }

    pub fn toggle_genre(&mut self, genre: &str) {
        if !self.deselect_genre(genre) {
            self.select_genre(genre);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.genres.is_empty() && self.min_rating.is_none() && self.max_rating.is_none()
    }

    /// Query string for `GET /api/movies`, including the leading `?`, or an
    /// empty string when no filter is set. `min > max` is sent as-is.
    pub fn to_query_string(&self) -> String {
        let mut params = Vec::with_capacity(3);

        if !self.genres.is_empty() {
            let joined = self
                .genres
                .iter()
                .map(|g| urlencoding::encode(g).into_owned())
                .collect::<Vec<_>>()
                .join(",");
            params.push(format!("genres={joined}"));
        }
        if let Some(min) = self.min_rating {
            params.push(format!("minRating={}", format_rating(min)));
        }
        if let Some(max) = self.max_rating {
            params.push(format!("maxRating={}", format_rating(max)));
        }

        if params.is_empty() { String::new() } else { format!("?{}", params.join("&")) }
    }
}

fn parse_rating(name: &str, raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        _ => {
            debug!(param = name, value = %raw, "ignoring unparseable rating bound");
            None
        },
    }
}

// f64's Display already drops a trailing ".0".
fn format_rating(value: f64) -> String {
    value.to_string()
}
