use axum::{
    extract::{rejection::QueryRejection, DefaultBodyLimit, Query, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::limit::ConcurrencyLimitLayer;
use tower::ServiceBuilder;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;
use tracing::{debug, info};

use crate::cli::ServeArgs;
use crate::core::api::{HealthResponse, ReadsetQuery, SearchReadsParams};
use crate::core::types::QueryType;
use crate::readstore::{ReadStore, StoreConfig, StoreError};
use crate::utils::validation::validate_name;

/// Requests are all GETs; nothing legitimate comes close to this
pub const MAX_REQUEST_BODY_SIZE: usize = 64 * 1024;
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const MAX_CONCURRENT_REQUESTS: usize = 100;

/// Shared application state
pub struct AppState {
    pub store: Arc<ReadStore>,
}

/// Error body returned by every endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_type: String,
    pub details: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SnpQuery {
    snp: String,
}

/// Create a safe error response that prevents information disclosure
/// while logging detailed errors server-side for debugging
pub fn create_safe_error_response(
    error_type: &str,
    user_message: &str,
    internal_error: Option<&str>,
) -> ErrorResponse {
    if let Some(internal_msg) = internal_error {
        tracing::error!(error_type, "Internal error: {}", internal_msg);
    }

    ErrorResponse {
        error: user_message.to_string(),
        error_type: error_type.to_string(),
        details: None,
    }
}

fn error_response(status: StatusCode, body: ErrorResponse) -> Response {
    (status, Json(body)).into_response()
}

fn store_error_response(e: &StoreError) -> Response {
    match e {
        StoreError::Validation(v) => error_response(
            StatusCode::BAD_REQUEST,
            create_safe_error_response("validation_error", &v.to_string(), None),
        ),
        StoreError::InvalidPageToken => error_response(
            StatusCode::BAD_REQUEST,
            create_safe_error_response("invalid_page_token", "Invalid page token", None),
        ),
        StoreError::UnknownReadset(id) => error_response(
            StatusCode::NOT_FOUND,
            create_safe_error_response("not_found", &format!("Unknown readset: {id}"), None),
        ),
        _ => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            create_safe_error_response(
                "internal_error",
                "The read store could not answer this query",
                Some(&e.to_string()),
            ),
        ),
    }
}

fn query_rejection_response(rejection: &QueryRejection) -> Response {
    error_response(
        StatusCode::BAD_REQUEST,
        create_safe_error_response("invalid_query", &rejection.body_text(), None),
    )
}

/// Run the read-store server
///
/// # Errors
///
/// Returns an error if the data directory cannot be loaded, the tokio runtime
/// cannot be created or the server fails to start.
pub fn run(args: ServeArgs) -> anyhow::Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move { run_server(args).await })
}

/// Create the application router with all routes and middleware configured.
///
/// Per-IP rate limiting needs the peer address, so it only works when the
/// router is served with connect info; pass `rate_limit: false` otherwise.
///
/// # Errors
///
/// Returns an error if the rate limiter configuration is invalid.
pub fn create_router(store: Arc<ReadStore>, rate_limit: bool) -> anyhow::Result<Router> {
    let state = Arc::new(AppState { store });

    let mut app = Router::new()
        .route("/api/reads", get(reads_handler))
        .route("/api/readsets", get(readsets_handler))
        .route("/api/snps", get(snps_handler))
        .route("/api/health", get(health_handler))
        .with_state(state);

    if rate_limit {
        // One request replenished every 100 ms, bursts of 50 for paging
        let governor_conf = GovernorConfigBuilder::default()
            .per_millisecond(100)
            .burst_size(50)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limit configuration"))?;
        app = app.layer(GovernorLayer {
            config: Arc::new(governor_conf),
        });
    }

    let app = app.layer(
        ServiceBuilder::new()
            .layer(SetResponseHeaderLayer::if_not_present(
                HeaderName::from_static("x-content-type-options"),
                HeaderValue::from_static("nosniff"),
            ))
            .layer(SetResponseHeaderLayer::if_not_present(
                HeaderName::from_static("x-frame-options"),
                HeaderValue::from_static("DENY"),
            ))
            .layer(SetResponseHeaderLayer::if_not_present(
                HeaderName::from_static("referrer-policy"),
                HeaderValue::from_static("strict-origin-when-cross-origin"),
            ))
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                REQUEST_TIMEOUT,
            ))
            .layer(ConcurrencyLimitLayer::new(MAX_CONCURRENT_REQUESTS))
            .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_SIZE)),
    );

    Ok(app)
}

async fn run_server(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = StoreConfig::new(&args.data_dir).with_page_size(args.page_size);
    if let Some(snps) = &args.snps {
        config = config.with_snp_table(snps);
    }

    let store = ReadStore::open(&config)?;
    info!(
        readsets = store.readsets().len(),
        snps = store.snps().len(),
        data_dir = %args.data_dir.display(),
        "Loaded read store"
    );
    let app = create_router(Arc::new(store), !args.no_rate_limit)?;

    let addr = format!("{}:{}", args.address, args.port);
    println!("Starting readgraph read store at http://{addr}");

    if args.open {
        let _ = open::that(format!("http://{addr}/api/readsets"));
    }

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// `GET /api/reads`: one page of reads, or coverage, for a region
async fn reads_handler(
    State(state): State<Arc<AppState>>,
    params: Result<Query<SearchReadsParams>, QueryRejection>,
) -> Response {
    let Query(params) = match params {
        Ok(params) => params,
        Err(rejection) => return query_rejection_response(&rejection),
    };
    debug!(
        readsets = %params.readset_ids,
        sequence = %params.sequence_name,
        start = params.sequence_start,
        end = params.sequence_end,
        query_type = ?params.query_type,
        "Reads query"
    );

    match params.query_type {
        QueryType::Reads => match state.store.search_reads(&params) {
            Ok(response) => Json(response).into_response(),
            Err(e) => store_error_response(&e),
        },
        QueryType::Coverage => match state.store.coverage(&params) {
            Ok(response) => Json(response).into_response(),
            Err(e) => store_error_response(&e),
        },
    }
}

/// `GET /api/readsets`
async fn readsets_handler(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ReadsetQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return query_rejection_response(&rejection),
    };

    match state.store.search_readsets(&query) {
        Ok(response) => Json(response).into_response(),
        Err(e) => store_error_response(&e),
    }
}

/// `GET /api/snps?snp=<id>`
async fn snps_handler(
    State(state): State<Arc<AppState>>,
    query: Result<Query<SnpQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return query_rejection_response(&rejection),
    };
    if let Err(e) = validate_name(&query.snp) {
        return store_error_response(&StoreError::Validation(e));
    }

    Json(state.store.lookup_snp(&query.snp)).into_response()
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        readsets: state.store.readsets().len(),
    })
}
