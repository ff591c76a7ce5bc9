//! Axum web server: application state, router, and route handlers.
//!
//! Pages are rendered with Askama templates. Authorization is role-gated
//! per route: admins get the filter view, full dump, and detail pages;
//! standard users get the single enter-number -> personal score flow.
//! Unauthorized requests are redirected, never shown data.

use crate::auth::{self, AccountType, AuthError, UserRepository};
use crate::data::{Dataset, DatasetState, ScoreRecord, SCORING_COLS};
use crate::query::{self, FilterForm, ScoreFilters, ValidationError};
use crate::session::{self, Session, SessionCodec};
use askama::Template;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::get,
    Form, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

// ============================================================================
// Application State
// ============================================================================

/// Shared application state: the read-only dataset, the user directory, and
/// the session codec. Cheap to clone per request.
#[derive(Clone)]
pub struct AppState {
    pub dataset: Arc<DatasetState>,
    pub users: Arc<dyn UserRepository>,
    pub sessions: SessionCodec,
}

impl AppState {
    pub fn new(dataset: DatasetState, users: Arc<dyn UserRepository>, secret_key: &str) -> Self {
        AppState {
            dataset: Arc::new(dataset),
            users,
            sessions: SessionCodec::new(secret_key),
        }
    }
}

// ============================================================================
// Router
// ============================================================================

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/register", get(register_page).post(register_submit))
        .route("/login", get(login_page).post(login_submit))
        .route("/logout", get(logout))
        .route("/enter_number", get(enter_number_page).post(enter_number_submit))
        .route("/user_credit_score", get(user_credit_score))
        .route("/credit_score", get(credit_score_page).post(credit_score_filtered))
        .route("/data", get(data_dump))
        .route("/detail/:number", get(detail))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Form / Query Payloads
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct Flash {
    error: Option<String>,
    msg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct RegisterForm {
    username: String,
    password: String,
    account_type: String,
}

#[derive(Debug, Deserialize)]
struct NumberForm {
    number: String,
}

// ============================================================================
// Templates
// ============================================================================

/// Row shaped for display: optional filter fields become empty strings.
struct RecordRow {
    identifier: String,
    model_name: String,
    fdy_scoring: i64,
    tabvpm_scoring: i64,
    dvb_final: i64,
    tabvpm: String,
    fdy_in_month: String,
    final_score: i64,
}

impl From<&ScoreRecord> for RecordRow {
    fn from(record: &ScoreRecord) -> Self {
        RecordRow {
            identifier: record.identifier.clone(),
            model_name: record.model_name.clone(),
            fdy_scoring: record.fdy_scoring,
            tabvpm_scoring: record.tabvpm_scoring,
            dvb_final: record.dvb_final,
            tabvpm: fmt_optional(record.tabvpm),
            fdy_in_month: fmt_optional(record.fdy_in_month),
            final_score: record.final_score,
        }
    }
}

fn fmt_optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[derive(Template)]
#[template(path = "pages/home.html")]
struct HomeTemplate {
    username: String,
    is_admin: bool,
}

#[derive(Template)]
#[template(path = "pages/login.html")]
struct LoginTemplate {
    error: Option<String>,
    msg: Option<String>,
}

#[derive(Template)]
#[template(path = "pages/register.html")]
struct RegisterTemplate {
    error: Option<String>,
}

#[derive(Template)]
#[template(path = "pages/enter_number.html")]
struct EnterNumberTemplate {
    username: String,
}

#[derive(Template)]
#[template(path = "pages/user_score.html")]
struct UserScoreTemplate {
    row: RecordRow,
}

#[derive(Template)]
#[template(path = "pages/credit_score.html")]
struct CreditScoreTemplate {
    rows: Vec<RecordRow>,
    total: usize,
}

#[derive(Template)]
#[template(path = "pages/data.html")]
struct DataTemplate {
    columns: Vec<String>,
    rows: Vec<RecordRow>,
}

#[derive(Template)]
#[template(path = "pages/detail.html")]
struct DetailTemplate {
    row: RecordRow,
}

#[derive(Template)]
#[template(path = "pages/unavailable.html")]
struct UnavailableTemplate {
    reason: String,
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub enum AppError {
    Validation(String),
    NotFound(String),
    DatasetUnavailable(String),
    Template(String),
    Internal(String),
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        AppError::Validation(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg).into_response(),
            AppError::DatasetUnavailable(reason) => {
                let body = UnavailableTemplate { reason }
                    .render()
                    .unwrap_or_else(|_| "Dataset unavailable".to_string());
                (StatusCode::SERVICE_UNAVAILABLE, Html(body)).into_response()
            }
            AppError::Template(msg) | AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}

// ============================================================================
// Handler Helpers
// ============================================================================

fn render<T: Template>(template: T) -> Result<Html<String>, AppError> {
    template
        .render()
        .map(Html)
        .map_err(|e| AppError::Template(format!("Template error: {e}")))
}

/// Current verified session, or `None` for anonymous requests.
fn current_session(state: &AppState, headers: &HeaderMap) -> Option<Session> {
    session::session_from_headers(&state.sessions, headers)
}

/// The loaded dataset, or the explicit unavailable error for the 503 page.
fn dataset(state: &AppState) -> Result<&Dataset, AppError> {
    match state.dataset.as_ref() {
        DatasetState::Loaded(dataset) => Ok(dataset),
        DatasetState::Unavailable { reason } => {
            Err(AppError::DatasetUnavailable(reason.clone()))
        }
    }
}

fn flash_redirect(path: &str, key: &str, message: &str) -> Redirect {
    Redirect::to(&format!("{path}?{key}={}", urlencoding::encode(message)))
}

fn redirect_with_cookie(target: &str, cookie: &str) -> Result<Response, AppError> {
    let value = HeaderValue::from_str(cookie)
        .map_err(|e| AppError::Internal(format!("invalid cookie header: {e}")))?;
    let mut response = Redirect::to(target).into_response();
    response.headers_mut().insert(header::SET_COOKIE, value);
    Ok(response)
}

// ============================================================================
// Handlers: Authentication
// ============================================================================

async fn home(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AppError> {
    let Some(session) = current_session(&state, &headers) else {
        tracing::debug!("User not in session, redirecting to login");
        return Ok(Redirect::to("/login").into_response());
    };
    let page = HomeTemplate {
        username: session.username,
        is_admin: session.account_type.is_admin(),
    };
    Ok(render(page)?.into_response())
}

async fn login_page(Query(flash): Query<Flash>) -> Result<Html<String>, AppError> {
    render(LoginTemplate {
        error: flash.error,
        msg: flash.msg,
    })
}

async fn login_submit(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    match auth::login(state.users.as_ref(), &form.username, &form.password) {
        Ok(user) => {
            let session = Session::new(&user.username, user.account_type);
            let cookie = session::set_cookie(&state.sessions.encode(&session));
            let target = if user.account_type.is_admin() {
                "/"
            } else {
                "/enter_number"
            };
            redirect_with_cookie(target, &cookie)
        }
        Err(AuthError::InvalidCredentials) | Err(AuthError::UsernameTaken) => {
            Ok(flash_redirect("/login", "error", "Invalid credentials").into_response())
        }
    }
}

async fn register_page(Query(flash): Query<Flash>) -> Result<Html<String>, AppError> {
    render(RegisterTemplate { error: flash.error })
}

async fn register_submit(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Response {
    let account_type = AccountType::parse(&form.account_type);
    match auth::register(
        state.users.as_ref(),
        &form.username,
        &form.password,
        account_type,
    ) {
        Ok(()) => flash_redirect("/login", "msg", "Registration successful").into_response(),
        Err(_) => flash_redirect("/register", "error", "Username already exists").into_response(),
    }
}

async fn logout(State(_state): State<AppState>) -> Result<Response, AppError> {
    tracing::debug!("Logging out user");
    redirect_with_cookie("/login", &session::clear_cookie())
}

// ============================================================================
// Handlers: Standard User Flow
// ============================================================================

async fn enter_number_page(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    match current_session(&state, &headers) {
        Some(session) if !session.account_type.is_admin() => {
            let page = EnterNumberTemplate {
                username: session.username,
            };
            Ok(render(page)?.into_response())
        }
        _ => {
            tracing::debug!("User not in session or is an admin, redirecting to login");
            Ok(Redirect::to("/login").into_response())
        }
    }
}

async fn enter_number_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<NumberForm>,
) -> Result<Response, AppError> {
    let Some(mut session) = current_session(&state, &headers) else {
        return Ok(Redirect::to("/login").into_response());
    };
    if session.account_type.is_admin() {
        return Ok(Redirect::to("/login").into_response());
    }
    session.selected_identifier = Some(form.number);
    let cookie = session::set_cookie(&state.sessions.encode(&session));
    redirect_with_cookie("/user_credit_score", &cookie)
}

async fn user_credit_score(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let Some(session) = current_session(&state, &headers) else {
        tracing::debug!("User not in session, redirecting to login");
        return Ok(Redirect::to("/login").into_response());
    };
    let Some(number) = session.selected_identifier else {
        tracing::debug!("No number selected, redirecting to login");
        return Ok(Redirect::to("/login").into_response());
    };

    let dataset = dataset(&state)?;
    match query::lookup(dataset, &number) {
        Some(record) => {
            let page = UserScoreTemplate { row: record.into() };
            Ok(render(page)?.into_response())
        }
        None => {
            tracing::warn!("No data found for the given number: {}", number);
            Err(AppError::NotFound(
                "No data found for the given number".to_string(),
            ))
        }
    }
}

// ============================================================================
// Handlers: Admin Views
// ============================================================================

async fn credit_score_page(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    credit_score_view(&state, &headers, ScoreFilters::default())
}

async fn credit_score_filtered(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<FilterForm>,
) -> Result<Response, AppError> {
    let filters = ScoreFilters::parse(&form)?;
    credit_score_view(&state, &headers, filters)
}

fn credit_score_view(
    state: &AppState,
    headers: &HeaderMap,
    filters: ScoreFilters,
) -> Result<Response, AppError> {
    let Some(session) = current_session(state, headers) else {
        tracing::debug!("User not in session, redirecting to login");
        return Ok(Redirect::to("/login").into_response());
    };
    if !session.account_type.is_admin() {
        return Ok(Redirect::to("/enter_number").into_response());
    }

    let dataset = dataset(state)?;
    let rows: Vec<RecordRow> = query::filter_records(dataset, &filters)
        .into_iter()
        .map(RecordRow::from)
        .collect();
    let page = CreditScoreTemplate {
        total: rows.len(),
        rows,
    };
    Ok(render(page)?.into_response())
}

async fn data_dump(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let Some(session) = current_session(&state, &headers) else {
        tracing::debug!("User not in session or not admin, redirecting to login");
        return Ok(Redirect::to("/login").into_response());
    };
    if !session.account_type.is_admin() {
        return Ok(Redirect::to("/login").into_response());
    }

    let dataset = dataset(&state)?;
    let page = DataTemplate {
        columns: data_columns(),
        rows: dataset.records().iter().map(RecordRow::from).collect(),
    };
    Ok(render(page)?.into_response())
}

fn data_columns() -> Vec<String> {
    let mut columns = vec!["NUMBER".to_string(), "MODEL_NAME".to_string()];
    columns.extend(SCORING_COLS.iter().map(|c| c.to_string()));
    columns.extend([
        "TABVPM".to_string(),
        "FDY IN MONTH".to_string(),
        "Final Score".to_string(),
    ]);
    columns
}

async fn detail(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(number): Path<String>,
) -> Result<Response, AppError> {
    let Some(session) = current_session(&state, &headers) else {
        tracing::debug!("User not in session or not admin, redirecting to login");
        return Ok(Redirect::to("/login").into_response());
    };
    if !session.account_type.is_admin() {
        return Ok(Redirect::to("/login").into_response());
    }

    let dataset = dataset(&state)?;
    match query::lookup(dataset, &number) {
        Some(record) => {
            let page = DetailTemplate { row: record.into() };
            Ok(render(page)?.into_response())
        }
        None => Err(AppError::NotFound(format!(
            "No record found for number {number}"
        ))),
    }
}

// ============================================================================
// Handlers: Health
// ============================================================================

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let records = state.dataset.as_loaded().map(Dataset::len);
    Json(serde_json::json!({
        "status": "healthy",
        "dataset_records": records,
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}
