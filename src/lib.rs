pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod integrations;
pub mod jobs;
pub mod messages;
pub mod middleware;
pub mod models;
pub mod observer;
pub mod services;
pub mod state;

use axum::{
    http::HeaderValue,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::SecurityConfig;
use crate::middleware::{jwt_auth_middleware, require_admin_middleware};
use crate::state::AppState;

/// The full HTTP application: public, protected and elevated tiers.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.security);

    Router::new()
        .merge(public_routes())
        .merge(protected_routes(state.clone()))
        .merge(elevated_routes(state.clone()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    use handlers::public;

    Router::new()
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .route("/webhooks/stripe", post(public::stripe_webhook))
        .route("/oauth/datev/callback", get(public::datev_callback))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use handlers::protected::{auth, banking, companies, data, documents, email, integrations, sequences, support};

    Router::new()
        .route("/api/auth/whoami", get(auth::whoami))
        // Companies
        .route("/api/companies", post(companies::create))
        .route(
            "/api/companies/:company_id",
            get(companies::get).patch(companies::update).delete(companies::delete),
        )
        .route("/api/companies/:company_id/usage", get(companies::usage))
        // Finance documents
        .route(
            "/api/companies/:company_id/documents/:kind",
            get(documents::list).post(documents::create),
        )
        .route(
            "/api/companies/:company_id/documents/:kind/:id",
            get(documents::get).put(documents::replace).delete(documents::delete),
        )
        .route(
            "/api/companies/:company_id/documents/:kind/:id/:action",
            get(documents::links).post(documents::action),
        )
        .route("/api/companies/:company_id/sequences", get(sequences::list))
        .route("/api/companies/:company_id/sequences/:kind", put(sequences::update))
        // Generic company data
        .route(
            "/api/companies/:company_id/data/:collection",
            get(data::list).post(data::create),
        )
        .route(
            "/api/companies/:company_id/data/:collection/:id",
            get(data::get).put(data::replace).patch(data::merge).delete(data::delete),
        )
        .route("/api/companies/:company_id/find/:collection", post(data::find))
        // Banking
        .route(
            "/api/companies/:company_id/transactions",
            get(banking::list).post(banking::import),
        )
        .route(
            "/api/companies/:company_id/transactions/:tx_id/links",
            post(banking::link),
        )
        .route(
            "/api/companies/:company_id/transactions/:tx_id/links/:document_id",
            axum::routing::delete(banking::unlink),
        )
        // Email
        .route(
            "/api/companies/:company_id/email/config",
            get(email::get_config).put(email::put_config),
        )
        .route(
            "/api/companies/:company_id/email/messages",
            get(email::list_messages).post(email::upsert_messages),
        )
        .route(
            "/api/companies/:company_id/email/messages/:message_id",
            axum::routing::patch(email::update_message),
        )
        // Integrations
        .route(
            "/api/companies/:company_id/integrations/datev",
            axum::routing::delete(integrations::datev_disconnect),
        )
        .route(
            "/api/companies/:company_id/integrations/datev/authorize",
            get(integrations::datev_authorize),
        )
        // Support
        .route(
            "/api/support/tickets",
            get(support::list_tickets).post(support::create_ticket),
        )
        .route_layer(from_fn_with_state(state, jwt_auth_middleware))
}

fn elevated_routes(state: AppState) -> Router<AppState> {
    use handlers::elevated::{companies, jobs, tickets, workspaces};

    Router::new()
        .route("/api/admin/companies", get(companies::list))
        .route("/api/admin/companies/:company_id", axum::routing::delete(companies::delete))
        .route("/api/admin/companies/:company_id/lock", post(companies::lock))
        .route("/api/admin/companies/:company_id/unlock", post(companies::unlock))
        .route("/api/admin/tickets", get(tickets::list).post(tickets::create))
        .route("/api/admin/tickets/:id", get(tickets::get).patch(tickets::update))
        .route("/api/admin/tickets/:id/comments", post(tickets::add_comment))
        .route("/api/admin/workspaces", get(workspaces::list).post(workspaces::create))
        .route(
            "/api/admin/workspaces/:id",
            get(workspaces::get).patch(workspaces::update).delete(workspaces::delete),
        )
        .route("/api/admin/workspaces/:id/tasks", post(workspaces::add_task))
        .route(
            "/api/admin/workspaces/:id/tasks/:task_id",
            axum::routing::patch(workspaces::update_task).delete(workspaces::delete_task),
        )
        .route(
            "/api/admin/workspaces/:id/tasks/:task_id/comments",
            post(workspaces::comment_task),
        )
        .route("/api/admin/jobs/usage", post(jobs::run_usage))
        .route("/api/admin/jobs/gmail-watch", post(jobs::run_gmail_watch))
        // Layers run bottom-up: the token is verified before the role check.
        .route_layer(from_fn(require_admin_middleware))
        .route_layer(from_fn_with_state(state, jwt_auth_middleware))
}

/// Configured origins, or any origin when the list is empty.
fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if !security.enable_cors {
        return CorsLayer::new();
    }
    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(origins)
    }
}
