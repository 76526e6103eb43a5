use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Form, Path, Query, State, rejection::FormRejection},
    http::StatusCode,
    response::{Html, Redirect},
    routing::{get, post},
};
use serde::Deserialize;
use tracing::{debug, info};

use crate::{
    AppState,
    client::ClientKey,
    error::{AppError, AppResult},
    filter::{FilterParams, MovieFilter, query_fragment},
    forms::{RatingForm, ReviewForm},
    models::{FILTER_PAGE_SIZE, LIST_PAGE_SIZE, MovieSummaries, SEARCH_PAGE_SIZE, page_number},
    templates::{self, Listing},
};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/filter/", get(filter))
        .route("/filter/json/", get(filter_json))
        .route("/search/", get(search))
        .route("/rating/", post(add_rating))
        .route("/actor/{name}/", get(actor_detail))
        .route("/{movie}/", get(movie_detail))
        .route("/{movie}/review/", post(add_review))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    page: Option<String>,
}

pub async fn index(
    State(state): State<Arc<AppState>>,
    Query(q): Query<PageQuery>,
) -> AppResult<Html<String>> {
    let number = page_number(q.page.as_deref())?;
    let page = state.catalog.list_published(LIST_PAGE_SIZE, number).await?;
    let sidebar = state.catalog.sidebar().await?;
    let listing = Listing { heading: "Movies", path: "/", query: String::new() };
    Ok(Html(templates::movie_list_page(&listing, &page, &sidebar)))
}

pub async fn filter(
    State(state): State<Arc<AppState>>,
    axum_extra::extract::Query(params): axum_extra::extract::Query<FilterParams>,
) -> AppResult<Html<String>> {
    let number = page_number(params.page.as_deref())?;
    let movie_filter = MovieFilter::from_params(&params);
    debug!(
        years = ?movie_filter.years,
        genres = ?movie_filter.genres,
        combinator = ?movie_filter.combinator(),
        "filtering movies"
    );

    let page = state.catalog.filter_movies(&movie_filter, FILTER_PAGE_SIZE, number).await?;
    let sidebar = state.catalog.sidebar().await?;
    let listing = Listing {
        heading: "Filtered movies",
        path: "/filter/",
        query: format!(
            "{}{}",
            query_fragment("year", &params.year),
            query_fragment("genre", &params.genre)
        ),
    };
    Ok(Html(templates::movie_list_page(&listing, &page, &sidebar)))
}

pub async fn filter_json(
    State(state): State<Arc<AppState>>,
    axum_extra::extract::Query(params): axum_extra::extract::Query<FilterParams>,
) -> AppResult<Json<MovieSummaries>> {
    let movies = state.catalog.filter_summaries(&MovieFilter::from_params(&params)).await?;
    Ok(Json(MovieSummaries { movies }))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    q: Option<String>,
    page: Option<String>,
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(sq): Query<SearchQuery>,
) -> AppResult<Html<String>> {
    let number = page_number(sq.page.as_deref())?;
    let term = sq.q.unwrap_or_default();
    let page = state.catalog.search(&term, SEARCH_PAGE_SIZE, number).await?;
    let sidebar = state.catalog.sidebar().await?;
    let listing = Listing {
        heading: "Search results",
        path: "/search/",
        query: query_fragment("q", std::slice::from_ref(&term)),
    };
    Ok(Html(templates::movie_list_page(&listing, &page, &sidebar)))
}

pub async fn movie_detail(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    ClientKey(client): ClientKey,
) -> AppResult<Html<String>> {
    let movie = state.catalog.published_by_slug(&slug).await?.ok_or(AppError::NotFound)?;
    let detail = state.catalog.movie_detail(movie, client.as_deref()).await?;
    let sidebar = state.catalog.sidebar().await?;
    Ok(Html(templates::movie_detail_page(&detail, &sidebar)))
}

pub async fn actor_detail(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> AppResult<Html<String>> {
    let detail = state.catalog.actor_by_name(&name).await?.ok_or(AppError::NotFound)?;
    let sidebar = state.catalog.sidebar().await?;
    Ok(Html(templates::actor_page(&detail, &sidebar)))
}

/// Stores the review when the form is valid; invalid submissions are dropped.
/// Either way the client goes back to the movie page.
pub async fn add_review(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<String>,
    form: Result<Form<ReviewForm>, FormRejection>,
) -> AppResult<Redirect> {
    let movie_id: i32 = movie_id.parse().map_err(|_| AppError::NotFound)?;
    let movie = state.catalog.movie_by_id(movie_id).await?.ok_or(AppError::NotFound)?;

    let review = match form {
        Ok(Form(form)) => form.validate().map_err(|e| e.to_string()),
        Err(rejection) => Err(rejection.body_text()),
    };

    match review {
        Ok(review) => {
            let saved = state.catalog.add_review(movie.id, review).await?;
            info!(movie_id = movie.id, review_id = saved.id, parent_id = ?saved.parent_id, "review added");
        }
        Err(reason) => debug!(movie_id = movie.id, %reason, "discarding invalid review"),
    }

    Ok(Redirect::to(&templates::movie_href(&movie)))
}

pub async fn add_rating(
    State(state): State<Arc<AppState>>,
    ClientKey(client): ClientKey,
    form: Result<Form<RatingForm>, FormRejection>,
) -> AppResult<StatusCode> {
    let Some(ip) = client else {
        debug!("rating without a resolvable client address");
        return Ok(StatusCode::BAD_REQUEST);
    };

    let vote = match form {
        Ok(Form(form)) => form.validate(),
        Err(rejection) => {
            debug!(reason = %rejection.body_text(), "undecodable rating form");
            return Ok(StatusCode::BAD_REQUEST);
        }
    };
    let vote = match vote {
        Ok(vote) => vote,
        Err(e) => {
            debug!(error = %e, "invalid rating form");
            return Ok(StatusCode::BAD_REQUEST);
        }
    };

    if state.catalog.upsert_rating(&ip, vote).await? {
        debug!(%ip, movie_id = vote.movie_id, star_id = vote.star_id, "rating saved");
        Ok(StatusCode::CREATED)
    } else {
        debug!(movie_id = vote.movie_id, star_id = vote.star_id, "rating references unknown row");
        Ok(StatusCode::BAD_REQUEST)
    }
}
