use std::{path::Path as FsPath, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{debug, info, warn};

use crate::{
    characters::{CharacterLibrary, PublicCharacter},
    config::{AppConfig, AppInfo},
    model::{GenerationRequest, ProviderRegistry},
    models_catalog::{ModelOption, recommended_models},
    prompt::load_system_prompt,
    types::{ChatRequest, ChatResponse},
};

static FALLBACK_INDEX_HTML: &str =
    "<html><body><h1>Ideas Guy</h1><p>Static UI not found.</p></body></html>";

type ApiError = (StatusCode, String);

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub characters: CharacterLibrary,
    pub providers: ProviderRegistry,
}

#[derive(Serialize)]
struct ConfigResponse {
    app: AppInfo,
    model_provider: String,
    hf_model_name: String,
    max_new_tokens: u32,
    temperature: f32,
}

pub fn router(state: AppState) -> Router {
    let static_dir = state.config.static_dir.clone();
    let enable_cors = state.config.enable_cors;

    let router = Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/config", get(config))
        .route("/api/chat", post(chat))
        .route("/api/characters", get(list_characters))
        .route("/api/characters/{id}", get(get_character))
        .route("/api/models", get(list_models))
        .route("/assets/{name}", get(asset))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http());

    let router = if enable_cors {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    };

    router.with_state(state)
}

async fn index(State(state): State<AppState>) -> Html<String> {
    let index_file = state.config.static_dir.join("index.html");
    match tokio::fs::read_to_string(&index_file).await {
        Ok(content) => Html(content),
        Err(_) => {
            debug!(path = %index_file.display(), "index.html not found; serving fallback page");
            Html(FALLBACK_INDEX_HTML.to_owned())
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn config(State(state): State<AppState>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        app: AppInfo::default(),
        model_provider: state.providers.default_name().to_owned(),
        hf_model_name: state.config.hf_model_name.clone(),
        max_new_tokens: state.config.max_new_tokens,
        temperature: state.config.temperature,
    })
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let system_prompt = match request.character_id.as_deref() {
        Some(id) => {
            state
                .characters
                .get(id)
                .await
                .map_err(internal_error)?
                .ok_or_else(|| not_found(format!("unknown character: {id}")))?
                .system_prompt
        }
        None => load_system_prompt(&state.config.system_prompt_path).await,
    };

    let provider = state
        .providers
        .resolve(request.model_provider.as_deref())
        .map_err(|error| (StatusCode::BAD_REQUEST, error.to_string()))?;

    info!(
        character = request.character_id.as_deref().unwrap_or("default"),
        provider = request
            .model_provider
            .as_deref()
            .unwrap_or(state.providers.default_name()),
        messages = request.messages.len(),
        "chat request"
    );

    let reply = provider
        .generate(GenerationRequest {
            system_prompt,
            messages: request.messages,
            model: request.model_name,
            // Zero means "use the server default".
            max_new_tokens: request
                .max_new_tokens
                .filter(|tokens| *tokens > 0)
                .unwrap_or(state.config.max_new_tokens),
            temperature: request
                .temperature
                .filter(|temperature| *temperature > 0.0)
                .unwrap_or(state.config.temperature),
        })
        .await
        .map_err(|error| {
            warn!(?error, "model provider failed");
            internal_error(error)
        })?;

    Ok(Json(ChatResponse { reply }))
}

async fn list_characters(
    State(state): State<AppState>,
) -> Result<Json<Vec<PublicCharacter>>, ApiError> {
    let cards = state.characters.list().await.map_err(internal_error)?;
    Ok(Json(cards.iter().map(|card| card.to_public()).collect()))
}

async fn get_character(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PublicCharacter>, ApiError> {
    let card = state
        .characters
        .get(&id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| not_found(format!("unknown character: {id}")))?;
    Ok(Json(card.to_public()))
}

async fn list_models() -> Json<Vec<ModelOption>> {
    Json(recommended_models())
}

async fn asset(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    if name.contains("..") || name.contains('/') || name.contains('\\') {
        return (StatusCode::BAD_REQUEST, "invalid asset name").into_response();
    }

    let path = state.config.assets_dir.join(&name);
    match tokio::fs::read(&path).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, content_type_for(&path))], bytes).into_response(),
        Err(_) => {
            debug!(asset = %name, "asset missing; serving generated badge");
            (
                [(header::CONTENT_TYPE, "image/svg+xml")],
                badge_svg(&name),
            )
                .into_response()
        }
    }
}

fn content_type_for(path: &FsPath) -> &'static str {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// Placeholder avatar labelled with the asset's stem, e.g. `ideas_guy.png`
/// becomes "IDEAS GUY".
fn badge_svg(name: &str) -> String {
    let stem = FsPath::new(name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let label = stem
        .replace(['_', '-'], " ")
        .to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
        .collect::<String>();
    format!(
        "<svg xmlns='http://www.w3.org/2000/svg' width='240' height='240'>\
         <rect width='100%' height='100%' fill='#ffef5e'/>\
         <text x='50%' y='50%' dominant-baseline='middle' text-anchor='middle' \
         font-family='sans-serif' font-size='24' fill='#222'>{label}</text>\
         </svg>"
    )
}

fn not_found(message: String) -> ApiError {
    (StatusCode::NOT_FOUND, message)
}

fn internal_error(error: anyhow::Error) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("internal error: {error}"),
    )
}
