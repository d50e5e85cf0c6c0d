use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::{AppConfig, SecurityConfig};
use crate::database::DatabaseManager;
use crate::handlers::{elevated, protected, public};
use crate::middleware::{cron_secret_middleware, jwt_auth_middleware, validate_user_middleware};
use crate::services::mailer;
use crate::state::AppState;

/// Build the full application router around `state`
pub fn app(state: AppState) -> Router {
    let api = &state.config.api;
    let mut router = Router::new()
        .merge(public_routes())
        .merge(protected_routes(state.clone()))
        .merge(elevated_routes(state.clone()))
        .layer(DefaultBodyLimit::max(api.max_request_size_bytes));

    if let Some(cors) = cors_layer(&state.config.security) {
        router = router.layer(cors);
    }
    if api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router.with_state(state)
}

fn cors_layer(security: &SecurityConfig) -> Option<CorsLayer> {
    if !security.enable_cors {
        return None;
    }
    if security.cors_origins.is_empty() || security.cors_origins.iter().any(|o| o == "*") {
        return Some(CorsLayer::permissive());
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any),
    )
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .route("/api/auth/register", post(public::register))
        .route("/api/auth/login", post(public::login))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(account_routes())
        .merge(bill_routes())
        .merge(team_routes())
        .merge(notification_routes())
        .merge(finance_routes())
        // last layer runs first: token, then user lookup
        .route_layer(from_fn_with_state(state.clone(), validate_user_middleware))
        .route_layer(from_fn_with_state(state, jwt_auth_middleware))
}

fn elevated_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/notifications/send", get(elevated::notifications_send))
        .route_layer(from_fn_with_state(state, cron_secret_middleware))
}

fn account_routes() -> Router<AppState> {
    use protected::{auth, profile};

    Router::new()
        .route("/api/auth/whoami", get(auth::whoami))
        .route("/api/profile", get(profile::profile_get).patch(profile::profile_update))
        .route("/api/profile/password", post(profile::profile_password))
        .route("/api/profile/delete", post(profile::profile_delete))
}

fn bill_routes() -> Router<AppState> {
    use protected::{bills, categories};

    Router::new()
        .route("/api/bills", get(bills::bill_list).post(bills::bill_create))
        .route(
            "/api/bills/:id",
            get(bills::bill_get).patch(bills::bill_update).delete(bills::bill_delete),
        )
        .route(
            "/api/categories",
            get(categories::category_list).post(categories::category_create),
        )
        .route(
            "/api/categories/:id",
            get(categories::category_get)
                .put(categories::category_update)
                .patch(categories::category_update)
                .delete(categories::category_delete),
        )
}

fn team_routes() -> Router<AppState> {
    use protected::{invitations, teams};

    Router::new()
        .route("/api/teams", get(teams::team_list).post(teams::team_create))
        .route(
            "/api/teams/:id",
            get(teams::team_get).patch(teams::team_update).delete(teams::team_delete),
        )
        .route(
            "/api/teams/:id/members",
            get(teams::member_list).post(teams::member_add),
        )
        .route(
            "/api/teams/:id/members/:member_id",
            get(teams::member_get)
                .patch(teams::member_update)
                .delete(teams::member_remove),
        )
        .route("/api/invitations", get(invitations::invitation_list))
        .route(
            "/api/invitations/:id",
            get(invitations::invitation_get)
                .post(invitations::invitation_respond)
                .delete(invitations::invitation_cancel),
        )
}

fn notification_routes() -> Router<AppState> {
    use protected::notifications;

    Router::new()
        .route(
            "/api/notifications",
            get(notifications::notification_list)
                .patch(notifications::notification_bulk_update)
                .delete(notifications::notification_bulk_delete),
        )
        .route(
            "/api/notifications/:id",
            get(notifications::notification_get)
                .patch(notifications::notification_update)
                .delete(notifications::notification_delete),
        )
}

fn finance_routes() -> Router<AppState> {
    use protected::{assets, scheduled_payments, transactions};

    Router::new()
        .route(
            "/api/transactions",
            get(transactions::transaction_list).post(transactions::transaction_create),
        )
        .route(
            "/api/transactions/:id",
            get(transactions::transaction_get)
                .put(transactions::transaction_update)
                .patch(transactions::transaction_approve)
                .delete(transactions::transaction_delete),
        )
        .route("/api/assets", get(assets::asset_list).post(assets::asset_create))
        .route(
            "/api/assets/:id",
            get(assets::asset_get).put(assets::asset_update).delete(assets::asset_delete),
        )
        .route(
            "/api/scheduled-payments",
            get(scheduled_payments::scheduled_payment_list).post(scheduled_payments::scheduled_payment_create),
        )
        .route(
            "/api/scheduled-payments/:id",
            get(scheduled_payments::scheduled_payment_get)
                .put(scheduled_payments::scheduled_payment_update)
                .delete(scheduled_payments::scheduled_payment_delete),
        )
}

/// Connect, migrate when configured, and build the shared state
pub async fn prepare(config: AppConfig) -> anyhow::Result<AppState> {
    let pool = DatabaseManager::connect(&config.database).await?;
    if config.database.run_migrations {
        DatabaseManager::migrate(&pool).await?;
    }

    let mailer = mailer::from_config(&config.notifications);
    Ok(AppState::new(pool, mailer, config))
}

/// Serve on an already-bound listener until ctrl-c
pub async fn serve(listener: TcpListener, state: AppState) -> anyhow::Result<()> {
    tracing::info!("BillSmart API listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    tracing::info!("Starting BillSmart API in {:?} mode", config.environment);
    let port = config.api.port;
    let state = prepare(config).await?;
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    serve(listener, state).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
