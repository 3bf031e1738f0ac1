//! Mock Campus API for integration tests.
//!
//! Serves a courses CRUD resource with `{ "data": ... }` envelopes and numeric
//! identifiers (so identifier normalization is exercised over the wire), plus
//! endpoints for flaky upstreams, slow responses, call counting, health, and
//! multipart uploads. Bound to a random port per test.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::RwLock;

use campus_client::Entity;

/// Client-side course entity. Identifiers are strings because the client
/// normalizes the server's numeric ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
  pub id: String,
  pub name: String,
  pub featured: bool,
}

impl Entity for Course {
  fn id(&self) -> &str {
    &self.id
  }
}

#[derive(Debug, Clone)]
pub struct ServerCourse {
  pub id: u64,
  pub name: String,
  pub featured: bool,
}

impl ServerCourse {
  fn to_json(&self) -> Value {
    // Numeric id on purpose; the client must normalize it.
    json!({"id": self.id, "name": self.name, "featured": self.featured})
  }
}

#[derive(Default)]
pub struct ApiState {
  pub courses: RwLock<Vec<ServerCourse>>,
  pub next_id: AtomicU64,
  /// Calls observed by GET /api/counted.
  pub counted_calls: AtomicU32,
  /// Calls observed by GET /api/bad-request.
  pub bad_request_calls: AtomicU32,
  /// Remaining 503s GET /api/flaky will serve before succeeding.
  pub flaky_remaining: AtomicU32,
  /// Force GET /api/courses to fail with 500.
  pub fail_list: AtomicBool,
  /// Force POST /api/courses/{id}/feature to fail with 500.
  pub fail_feature: AtomicBool,
}

pub struct TestApi {
  pub base_url: String,
  pub state: Arc<ApiState>,
}

impl TestApi {
  pub async fn seed_courses(&self, count: usize) {
    let mut courses = self.state.courses.write().await;
    for _ in 0..count {
      let id = self.state.next_id.fetch_add(1, Ordering::SeqCst) + 1;
      courses.push(ServerCourse {
        id,
        name: format!("Course {id}"),
        featured: false,
      });
    }
  }

  pub async fn course_count(&self) -> usize {
    self.state.courses.read().await.len()
  }

  pub fn set_flaky(&self, failures: u32) {
    self.state.flaky_remaining.store(failures, Ordering::SeqCst);
  }

  pub fn counted_calls(&self) -> u32 {
    self.state.counted_calls.load(Ordering::SeqCst)
  }

  pub fn bad_request_calls(&self) -> u32 {
    self.state.bad_request_calls.load(Ordering::SeqCst)
  }
}

/// Start the mock API on a random port.
pub async fn spawn() -> TestApi {
  let _ = tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .try_init();

  let state = Arc::new(ApiState::default());
  let app = router(state.clone());

  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move {
    axum::serve(listener, app).await.unwrap();
  });

  TestApi {
    base_url: format!("http://{addr}"),
    state,
  }
}

fn router(state: Arc<ApiState>) -> Router {
  Router::new()
    .route("/api/courses", get(list_courses).post(create_course))
    .route(
      "/api/courses/{id}",
      get(get_course).put(update_course).delete(delete_course),
    )
    .route("/api/courses/{id}/feature", post(feature_course))
    .route("/api/counted", get(counted))
    .route("/api/flaky", get(flaky))
    .route("/api/slow", get(slow))
    .route("/api/terms", get(terms))
    .route("/api/bad-request", get(bad_request))
    .route("/api/uploads", post(upload))
    .route("/api/actuator/health", get(health))
    .with_state(state)
}

fn envelope(value: Value) -> Json<Value> {
  Json(json!({ "data": value }))
}

fn error_body(message: &str, code: &str) -> Value {
  json!({"message": message, "code": code})
}

#[derive(Deserialize)]
struct PageParams {
  page: Option<u32>,
  size: Option<u32>,
}

async fn list_courses(
  State(state): State<Arc<ApiState>>,
  Query(params): Query<PageParams>,
) -> impl IntoResponse {
  if state.fail_list.load(Ordering::SeqCst) {
    return (
      StatusCode::INTERNAL_SERVER_ERROR,
      Json(error_body("listing unavailable", "LIST_DOWN")),
    )
      .into_response();
  }

  let page = params.page.unwrap_or(0);
  let size = params.size.unwrap_or(20).max(1);
  let courses = state.courses.read().await;
  let total = courses.len() as u64;
  let total_pages = total.div_ceil(size as u64) as u32;
  let items: Vec<Value> = courses
    .iter()
    .skip((page * size) as usize)
    .take(size as usize)
    .map(ServerCourse::to_json)
    .collect();

  envelope(json!({
    "items": items,
    "page": page,
    "pageSize": size,
    "totalItems": total,
    "totalPages": total_pages,
  }))
  .into_response()
}

async fn create_course(
  State(state): State<Arc<ApiState>>,
  Json(body): Json<Value>,
) -> impl IntoResponse {
  let id = state.next_id.fetch_add(1, Ordering::SeqCst) + 1;
  let course = ServerCourse {
    id,
    name: body["name"].as_str().unwrap_or("").to_string(),
    featured: false,
  };
  state.courses.write().await.push(course.clone());
  (StatusCode::CREATED, envelope(course.to_json()))
}

async fn get_course(
  State(state): State<Arc<ApiState>>,
  Path(id): Path<u64>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
  let courses = state.courses.read().await;
  courses
    .iter()
    .find(|c| c.id == id)
    .map(|c| envelope(c.to_json()))
    .ok_or((
      StatusCode::NOT_FOUND,
      Json(error_body("course not found", "COURSE_NOT_FOUND")),
    ))
}

async fn update_course(
  State(state): State<Arc<ApiState>>,
  Path(id): Path<u64>,
  Json(body): Json<Value>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
  let mut courses = state.courses.write().await;
  let course = courses.iter_mut().find(|c| c.id == id).ok_or((
    StatusCode::NOT_FOUND,
    Json(error_body("course not found", "COURSE_NOT_FOUND")),
  ))?;
  if let Some(name) = body["name"].as_str() {
    course.name = name.to_string();
  }
  if let Some(featured) = body["featured"].as_bool() {
    course.featured = featured;
  }
  Ok(envelope(course.to_json()))
}

async fn delete_course(
  State(state): State<Arc<ApiState>>,
  Path(id): Path<u64>,
) -> Result<StatusCode, (StatusCode, Json<Value>)> {
  let mut courses = state.courses.write().await;
  let before = courses.len();
  courses.retain(|c| c.id != id);
  if courses.len() < before {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err((
      StatusCode::NOT_FOUND,
      Json(error_body("course not found", "COURSE_NOT_FOUND")),
    ))
  }
}

async fn feature_course(
  State(state): State<Arc<ApiState>>,
  Path(id): Path<u64>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
  if state.fail_feature.load(Ordering::SeqCst) {
    return Err((
      StatusCode::INTERNAL_SERVER_ERROR,
      Json(error_body("feature toggle unavailable", "FEATURE_DOWN")),
    ));
  }
  let mut courses = state.courses.write().await;
  let course = courses.iter_mut().find(|c| c.id == id).ok_or((
    StatusCode::NOT_FOUND,
    Json(error_body("course not found", "COURSE_NOT_FOUND")),
  ))?;
  course.featured = true;
  Ok(envelope(course.to_json()))
}

async fn counted(State(state): State<Arc<ApiState>>) -> Json<Value> {
  state.counted_calls.fetch_add(1, Ordering::SeqCst);
  envelope(json!({"value": 42}))
}

async fn flaky(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
  let remaining = state.flaky_remaining.load(Ordering::SeqCst);
  if remaining > 0 {
    state.flaky_remaining.store(remaining - 1, Ordering::SeqCst);
    (
      StatusCode::SERVICE_UNAVAILABLE,
      Json(error_body("upstream unavailable", "UPSTREAM_DOWN")),
    )
      .into_response()
  } else {
    envelope(json!({"ok": true})).into_response()
  }
}

async fn slow() -> Json<Value> {
  tokio::time::sleep(Duration::from_secs(2)).await;
  envelope(json!({"ok": true}))
}

async fn terms() -> &'static str {
  "Terms of service"
}

async fn bad_request(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
  state.bad_request_calls.fetch_add(1, Ordering::SeqCst);
  (
    StatusCode::BAD_REQUEST,
    Json(json!({"message": "name must not be blank", "code": "VALIDATION", "field": "name"})),
  )
}

async fn upload(mut multipart: Multipart) -> Json<Value> {
  let mut parts = Vec::new();
  while let Some(field) = multipart.next_field().await.unwrap() {
    parts.push(field.name().unwrap_or("").to_string());
    let _ = field.bytes().await.unwrap();
  }
  envelope(json!({"parts": parts}))
}

async fn health() -> Json<Value> {
  Json(json!({"status": "UP"}))
}
