//! Landing page pointing at the metrics endpoint.

use axum::{Router, extract::State, response::Html, routing::get};

use crate::state::AppState;

/// Registers the index route.
pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(index))
}

async fn index(State(state): State<AppState>) -> Html<String> {
    Html(format!(
        "<html>\n<head><title>Snapcraft Metrics Exporter</title></head>\n<body>\n<h1>Snapcraft Exporter</h1>\n<p><a href='{}'>Metrics</a></p>\n</body>\n</html>\n",
        state.config.metrics_path
    ))
}
