//! Site API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! JSON endpoints live under `/api/`; `/health` and `/robots.txt` sit at the
//! root where crawlers and the hosting platform expect them.
//!
//! Layers (outermost → innermost): CORS → access log → handler. Visitor
//! routes (chat, registration, preferences) also pass through the visitor
//! middleware, which resolves `X-Session-Id`.

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::api::endpoints;
use crate::api::error::ApiError;
use crate::api::middleware;
use crate::api::types::ApiContext;

/// Build the site router over a prepared context.
pub fn site_router(ctx: ApiContext) -> Router {
    let cors = cors_layer(&ctx.config.site_url);

    let visitor = Router::new()
        .route("/chat/send", post(endpoints::chat::send))
        .route("/chat/messages", get(endpoints::chat::messages))
        .route("/chat/clear", post(endpoints::chat::clear))
        .route("/registration", post(endpoints::registration::submit))
        .route("/registration/wizard", get(endpoints::registration::wizard_state))
        .route("/registration/wizard/fields", put(endpoints::registration::wizard_fields))
        .route("/registration/wizard/next", post(endpoints::registration::wizard_next))
        .route("/registration/wizard/previous", post(endpoints::registration::wizard_previous))
        .route("/registration/wizard/submit", post(endpoints::registration::wizard_submit))
        .route(
            "/preferences/theme",
            get(endpoints::preferences::get_theme).put(endpoints::preferences::set_theme),
        )
        .route_layer(axum::middleware::from_fn(middleware::visitor::identify_visitor));

    let api = Router::new()
        .route("/sitemap", get(endpoints::site::sitemap))
        .route("/dashboard", get(endpoints::dashboard::overview))
        .merge(visitor);

    Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/robots.txt", get(endpoints::site::robots))
        .nest("/api", api)
        .fallback(not_found)
        .with_state(ctx)
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(cors)
}

async fn not_found() -> ApiError {
    ApiError::NotFound("No such route".into())
}

/// Allow the configured site origin; any origin if it is not a valid header value.
fn cors_layer(site_url: &str) -> CorsLayer {
    let origin = match HeaderValue::from_str(site_url.trim_end_matches('/')) {
        Ok(value) => AllowOrigin::exact(value),
        Err(_) => AllowOrigin::from(Any),
    };
    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::CONTENT_TYPE, middleware::visitor::SESSION_HEADER])
        .expose_headers([middleware::visitor::SESSION_HEADER])
}
