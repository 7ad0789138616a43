use std::sync::Arc;

use crate::{
    config::Config,
    error::{ApiError, ApiResult},
    main_lib::AppState,
};
use askai_core::{PromptRequest, RelayAnswer};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, Method, Uri},
    routing::{get, post, MethodRouter},
    Extension, Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// A registered route, as listed by `GET /routes`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteInfo {
    pub path: &'static str,
    pub methods: Vec<&'static str>,
}

/// Router builder that remembers what it registered
struct RouteRegistry {
    router: Router<Arc<AppState>>,
    routes: Vec<RouteInfo>,
}

impl RouteRegistry {
    fn new() -> Self {
        Self {
            router: Router::new(),
            routes: Vec::new(),
        }
    }

    fn route(
        mut self,
        path: &'static str,
        methods: &[&'static str],
        handler: MethodRouter<Arc<AppState>>,
    ) -> Self {
        let mut methods = methods.to_vec();
        methods.sort_unstable();
        self.routes.push(RouteInfo { path, methods });
        self.router = self.router.route(path, handler);
        self
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn debug_info(State(state): State<Arc<AppState>>) -> Json<Value> {
    let config = state.relay.config();
    Json(json!({
        "ok": true,
        "version": askai_core::version(),
        "hasKey": !config.api_key.is_empty(),
        "keyLen": config.api_key.len(),
        "model": config.model,
        "credentialMode": config.credential_mode.to_string(),
        "maxAttempts": config.backoff.max_attempts,
    }))
}

async fn list_routes(Extension(routes): Extension<Arc<Vec<RouteInfo>>>) -> Json<Vec<RouteInfo>> {
    Json(routes.as_ref().clone())
}

/// Relay a chat prompt. The body is parsed here rather than by `Json<_>` so
/// that malformed input gets the same 400 as a missing prompt.
async fn ask_ai(State(state): State<Arc<AppState>>, body: Bytes) -> ApiResult<Json<RelayAnswer>> {
    let value: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let request = PromptRequest::from_json(&value)?;

    let outcome = tokio::time::timeout(state.request_timeout, state.relay.relay(&request.prompt))
        .await
        .map_err(|_| {
            tracing::warn!(
                "ask-ai abandoned after {}ms",
                state.request_timeout.as_millis()
            );
            ApiError::Timeout {
                after: state.request_timeout,
            }
        })?;
    tracing::debug!(
        "ask-ai finished in {} attempt(s), {}ms waiting [request_id: {}]",
        outcome.attempts,
        outcome.waited.as_millis(),
        outcome.request_id
    );
    Ok(Json(outcome.result?))
}

async fn not_found(method: Method, uri: Uri) -> ApiError {
    ApiError::NotFound {
        method,
        path: uri.path().to_string(),
    }
}

fn cors_layer(config: &Config) -> CorsLayer {
    let cors = if config.cors_allow.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins = config
            .cors_allow
            .iter()
            .filter_map(|o| match o.parse::<HeaderValue>() {
                Ok(origin) => Some(origin),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin {}", o);
                    None
                }
            })
            .collect::<Vec<_>>();
        CorsLayer::new().allow_origin(origins)
    };
    cors.allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

pub fn app_router(state: Arc<AppState>, config: &Config) -> Router {
    let registry = RouteRegistry::new()
        .route("/", &["GET"], get(health))
        .route("/debug", &["GET"], get(debug_info))
        .route("/routes", &["GET"], get(list_routes))
        .route("/ask-ai", &["POST"], post(ask_ai));

    let routes = Arc::new(registry.routes);

    registry
        .router
        .fallback(not_found)
        .with_state(state)
        .layer(Extension(routes))
        .layer(DefaultBodyLimit::max(config.body_limit))
        .layer(cors_layer(config))
        .layer(TraceLayer::new_for_http())
}
