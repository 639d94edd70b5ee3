use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use anyhow::Context;
use axum::{
    Extension, Json, Router,
    extract::{MatchedPath, Path, Request, State, rejection::{JsonRejection, PathRejection}},
    http::{self, HeaderName, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use platform_api::{ApiError, ApiResult};
use platform_authn::{AuthnError, TokenIssuer, bearer_token};
use platform_authz::{AccessPolicy, PolicyContext};
use platform_db::DbPool;
use products_hr::{AuthenticatedEmployee, EmployeeDto, EmployeeService, SeaOrmEmployeeRepository};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{debug, info};

use crate::config::AppConfig;

pub const HEALTH: &str = "/health";
pub const AUTHENTICATE: &str = "/api/employee/authenticate";
pub const REGISTER: &str = "/api/employee/register";
pub const EMPLOYEES: &str = "/api/employee";
pub const EMPLOYEE_BY_ID: &str = "/api/employee/{id}";

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub service: EmployeeService,
    pub policy: Arc<AccessPolicy>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(pool: DbPool, config: Arc<AppConfig>) -> Result<Self, AuthnError> {
        let tokens = Arc::new(TokenIssuer::new(&config.jwt_secret)?);
        let repository = Arc::new(SeaOrmEmployeeRepository::new(pool.clone()));
        Ok(Self {
            pool,
            service: EmployeeService::new(repository, tokens),
            policy: Arc::new(access_policy()),
            config,
        })
    }
}

/// Identity established by the access gate for the current request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CurrentEmployee {
    pub id: i32,
}

/// Every route the server exposes and who may call it.
pub fn access_policy() -> AccessPolicy {
    AccessPolicy::default()
        .public("GET", HEALTH)
        .public("POST", AUTHENTICATE)
        .public("POST", REGISTER)
        .authenticated("GET", EMPLOYEES)
        .authenticated("GET", EMPLOYEE_BY_ID)
        .authenticated("PUT", EMPLOYEE_BY_ID)
}

#[derive(Clone, Debug)]
pub struct ServeConfig {
    addr: SocketAddr,
}

impl ServeConfig {
    pub fn new(host: IpAddr, port: u16) -> Self {
        Self {
            addr: SocketAddr::from((host, port)),
        }
    }
}

pub async fn serve(config: ServeConfig, state: AppState) -> anyhow::Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;

    info!(%config.addr, "job portal server listening");
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();
    let allow_origin = if allowed.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(allowed)
    };
    CorsLayer::new()
        .allow_headers([http::header::CONTENT_TYPE, http::header::AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_origin(allow_origin)
}

pub fn build_router(state: AppState) -> Router {
    let request_id = MakeRequestUuid;
    let header_name = HeaderName::from_static("x-request-id");
    Router::new()
        .route(HEALTH, get(health_handler))
        .route(AUTHENTICATE, post(authenticate_handler))
        .route(REGISTER, post(register_handler))
        .route(EMPLOYEES, get(list_handler))
        .route(EMPLOYEE_BY_ID, get(get_handler).put(update_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), access_gate))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(header_name.clone(), request_id))
                .layer(PropagateRequestIdLayer::new(header_name))
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.cors_allowed_origins)),
        )
        .with_state(state)
}

/// Single authorization gate: looks the matched route up in the policy table and,
/// where a caller is required, demands a valid bearer token.
async fn access_gate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());

    let current = request
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
        .and_then(|token| match state.service.tokens().verify(token) {
            Ok(claims) => claims.employee_id().ok(),
            Err(err) => {
                debug!(error = %err, "bearer token rejected");
                None
            }
        })
        .map(|id| CurrentEmployee { id });

    // HEAD is served by GET routes and shares their policy.
    let method = if request.method() == Method::HEAD {
        Method::GET.as_str()
    } else {
        request.method().as_str()
    };
    let ctx = PolicyContext {
        method,
        route: &route,
        authenticated: current.is_some(),
    };
    if let Err(err) = state.policy.check(&ctx) {
        debug!(error = %err, "request denied");
        return Err(ApiError::Unauthorized);
    }

    if let Some(current) = current {
        request.extensions_mut().insert(current);
    }
    Ok(next.run(request).await)
}

fn json_body(payload: Result<Json<EmployeeDto>, JsonRejection>) -> ApiResult<EmployeeDto> {
    payload
        .map(|Json(dto)| dto)
        .map_err(|rejection| ApiError::invalid_input(rejection.body_text()))
}

fn path_id(path: Result<Path<i32>, PathRejection>) -> ApiResult<i32> {
    path
        .map(|Path(id)| id)
        .map_err(|rejection| ApiError::invalid_input(rejection.body_text()))
}

async fn authenticate_handler(
    State(state): State<AppState>,
    payload: Result<Json<EmployeeDto>, JsonRejection>,
) -> ApiResult<Json<AuthenticatedEmployee>> {
    let credentials = json_body(payload)?;
    Ok(Json(state.service.authenticate(credentials).await?))
}

async fn register_handler(
    State(state): State<AppState>,
    payload: Result<Json<EmployeeDto>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let dto = json_body(payload)?;
    state.service.register(dto).await?;
    Ok(StatusCode::OK)
}

async fn list_handler(State(state): State<AppState>) -> ApiResult<Json<Vec<EmployeeDto>>> {
    Ok(Json(state.service.list().await?))
}

async fn get_handler(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
) -> ApiResult<Json<EmployeeDto>> {
    let id = path_id(path)?;
    Ok(Json(state.service.get(id).await?))
}

async fn update_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentEmployee>,
    path: Result<Path<i32>, PathRejection>,
    payload: Result<Json<EmployeeDto>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let id = path_id(path)?;
    let dto = json_body(payload)?;
    info!(caller = caller.id, employee_id = id, "employee update requested");
    state.service.update(id, dto).await?;
    Ok(StatusCode::OK)
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let db_ok = platform_db::ping(&state.pool).await;
    Json(HealthResponse {
        ok: db_ok,
        db_ok,
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    db_ok: bool,
    version: &'static str,
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install CTRL+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    ctrl_c.await;

    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    };
}
