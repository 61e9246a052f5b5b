//! Web server for kitab - browse recommendations as a cover gallery

use axum::{
    extract::{Path as AxumPath, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::{
    config::Config,
    present::{example_query, Gallery, EXAMPLE_QUERIES},
    recommend::{self, Recommender, Tone},
    types::BookId,
};

pub struct AppState {
    pub recommender: Arc<Recommender>,
    pub config: Config,
}

#[derive(Deserialize)]
pub struct RecommendParams {
    #[serde(default)]
    q: String,
    #[serde(default = "default_selector")]
    category: String,
    #[serde(default = "default_selector")]
    tone: String,
    /// Id of a canned example query; replaces `q`
    example: Option<String>,
    /// Overrides the configured number of results
    limit: Option<usize>,
}

fn default_selector() -> String {
    recommend::ALL.to_string()
}

#[derive(Serialize)]
pub struct RecommendResponse {
    pub query: String,
    pub category: String,
    pub tone: String,
    pub gallery: Gallery,
    pub took_ms: u64,
}

#[derive(Serialize)]
pub struct ExampleQuery {
    pub id: &'static str,
    pub query: &'static str,
}

#[derive(Serialize)]
pub struct OptionsResponse {
    pub categories: Vec<String>,
    pub tones: Vec<&'static str>,
    pub examples: Vec<ExampleQuery>,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub total_books: usize,
    pub total_categories: usize,
    pub index_entries: usize,
    pub index: String,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (status, Json(ErrorResponse { error: error.into() })).into_response()
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(serve_index))
        .route("/cover-not-found.svg", get(serve_placeholder))
        .route("/api/options", get(handle_options))
        .route("/api/recommend", get(handle_recommend))
        .route("/api/stats", get(handle_stats))
        .route("/api/books/:book_id", get(handle_book))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the web server
pub async fn serve(state: AppState, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(Arc::new(state));

    let addr = format!("0.0.0.0:{}", port);
    println!("\n📚 kitab web server starting...");
    println!("   Local:    http://localhost:{}", port);
    println!("   Network:  http://<your-ip>:{}", port);
    println!("\n💡 Open in browser to find your next book!");
    println!("   Press Ctrl+C to stop\n");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Listening");
    axum::serve(listener, app).await?;

    Ok(())
}

/// Serve the HTML interface
async fn serve_index() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

/// Cover shown for books without a thumbnail
async fn serve_placeholder() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "image/svg+xml")],
        include_str!("../static/cover-not-found.svg"),
    )
}

/// Selector values for the search form
async fn handle_options(State(state): State<Arc<AppState>>) -> Json<OptionsResponse> {
    let mut categories = vec![recommend::ALL.to_string()];
    categories.extend(state.recommender.catalog().categories());

    Json(OptionsResponse {
        categories,
        tones: Tone::OPTIONS.iter().map(|t| t.label()).collect(),
        examples: EXAMPLE_QUERIES
            .iter()
            .map(|&(id, query)| ExampleQuery { id, query })
            .collect(),
    })
}

/// Handle recommendation requests
async fn handle_recommend(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecommendParams>,
) -> Response {
    let start = std::time::Instant::now();

    let text = match params.example.as_deref() {
        Some(id) => match example_query(id) {
            Ok(query) => query.to_string(),
            Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
        },
        None => params.q,
    };

    let mut query = recommend::Query::new(text, &params.category, &params.tone)
        .with_search_config(&state.config.search);
    if let Some(limit) = params.limit {
        query.final_k = limit;
        query.initial_k = query.initial_k.max(limit);
    }

    // Embedding the query is CPU-bound
    let worker_state = state.clone();
    let worker_query = query.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        Gallery::search(
            &worker_state.recommender,
            &worker_query,
            &worker_state.config.display,
        )
    })
    .await;

    let gallery = match outcome {
        Ok(Ok(gallery)) => gallery,
        Ok(Err(e)) => {
            tracing::error!(error = %e, query = %query.text, "Recommendation failed");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Recommendation failed, please try again",
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "Recommendation task panicked");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Recommendation failed, please try again",
            );
        }
    };

    let took_ms = start.elapsed().as_millis() as u64;

    (
        StatusCode::OK,
        Json(RecommendResponse {
            query: query.text,
            category: params.category,
            tone: query.tone.label().to_string(),
            gallery,
            took_ms,
        }),
    )
        .into_response()
}

/// Handle stats requests
async fn handle_stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    let catalog = state.recommender.catalog();
    let index = state.recommender.index();

    Json(StatsResponse {
        total_books: catalog.len(),
        total_categories: catalog.categories().len(),
        index_entries: index.len(),
        index: index.describe(),
    })
}

/// Full record for a single book
async fn handle_book(
    State(state): State<Arc<AppState>>,
    AxumPath(book_id): AxumPath<BookId>,
) -> Response {
    match state.recommender.catalog().get(book_id) {
        Some(book) => (StatusCode::OK, Json(book.clone())).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "Book not found"),
    }
}
