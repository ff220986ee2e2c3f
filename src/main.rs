use std::sync::Arc;

use anyhow::Context;
use futures::future;
use moviemaster::{
    Config, MovieApi, MovieFilter, MovieService, SessionStore, carousel::CarouselDriver,
    views::HomeSections,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,moviemaster=debug".to_string()),
        )
        .init();

    let config = Arc::new(Config::from_env()?);

    let http = reqwest::Client::builder()
        .user_agent("moviemaster/0.1")
        .timeout(config.request_timeout())
        .build()?;

    let session = SessionStore::new();
    if let Some(preset) = config.session() {
        tracing::debug!(name = ?preset.display_name, "using preset session");
        session.sign_in(preset);
    }

    let api = MovieApi::new(http, config.api_base_url.clone(), session.clone(), config.api_rps);
    tracing::info!(api = %api.base_url(), signed_in = session.is_signed_in(), "starting");

    let collection = async {
        match session.email() {
            Some(email) => api.my_collection(&email).await.map(Some),
            None => Ok(None),
        }
    };
    let (movies, collection) =
        future::try_join(api.list_movies(&MovieFilter::default()), collection)
            .await
            .context("loading movies")?;

    let home = HomeSections::from_movies(&movies);
    tracing::info!(total = home.total_movies, "catalog loaded");

    let carousel =
        CarouselDriver::new(home.featured.len(), config.carousel_interval(), config.reduced_motion);
    if let Some(slide) = carousel.carousel().current().and_then(|i| home.featured.get(i)) {
        tracing::info!(title = %slide.title, slides = home.featured.len(), "featured");
    }
    for (rank, movie) in home.top_rated.iter().enumerate() {
        tracing::info!(
            rank = rank + 1,
            title = %movie.title,
            rating = movie.rating_or_zero(),
            "top rated"
        );
    }
    for movie in &home.recently_added {
        tracing::info!(title = %movie.title, added = ?movie.id.created_at(), "recently added");
    }

    if let Some(mine) = collection {
        tracing::info!(count = mine.len(), "my collection");
        for movie in &mine {
            tracing::info!(id = %movie.id, title = %movie.title, "owned");
        }
    }

    Ok(())
}
