// --------------------------------------------------
// Handles API endpoints related to task CRUD operations
// and global settings management.
//
// Responsibilities:
// - Create / read / update / delete tasks
// - Filter, sort, and paginate the task list
// - Toggle the reminder flag
// - Complete / uncomplete a task (points award & deduction)
// - Get / update the settings singleton
// -------------------------------------------------

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;
use crate::game::{self, CompletionOutcome, UncompletionOutcome};
use crate::models::{AppMode, Badge, Settings, Task};
use crate::store::SharedStore;

pub(crate) fn now_fixed_offset() -> DateTime<FixedOffset> {
    let local = chrono::Local::now();
    let offset_seconds = local.offset().local_minus_utc();
    let fixed = FixedOffset::east_opt(offset_seconds).unwrap();
    local.with_timezone(&fixed)
}

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::Validation("invalid id".to_string()))
}

fn parse_due_date(raw: Option<&str>) -> Result<Option<DateTime<FixedOffset>>, ApiError> {
    match raw {
        None => Ok(None),
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(Some)
            .map_err(|_| ApiError::Validation("invalid due_date".to_string())),
    }
}

// Empty or whitespace-only labels collapse to None.
fn normalize_day(raw: Option<String>) -> Option<String> {
    raw.map(|d| d.trim().to_string()).filter(|d| !d.is_empty())
}

#[derive(Debug, Clone, Copy)]
enum SortKey {
    CreatedAt,
    UpdatedAt,
    DueDate,
    Text,
    Points,
}

#[derive(Debug, Deserialize)]
pub struct TasksQuery {
    pub completed: Option<bool>,
    pub reminder: Option<bool>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

// -----------------------------
// GET /api/tasks
// Lists tasks with optional filters, sorting, and pagination
// -----------------------------
pub async fn get_tasks(
    State(store): State<SharedStore>,
    Query(q): Query<TasksQuery>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let sort_key = match q.sort_by.as_deref() {
        None => None,
        Some("created_at") => Some(SortKey::CreatedAt),
        Some("updated_at") => Some(SortKey::UpdatedAt),
        Some("due_date") => Some(SortKey::DueDate),
        Some("text") => Some(SortKey::Text),
        Some("points") => Some(SortKey::Points),
        Some(other) => {
            return Err(ApiError::Validation(format!("unknown sort key: {other}")));
        }
    };
    let descending = match q.order.as_deref() {
        None | Some("asc") => false,
        Some("desc") => true,
        Some(other) => {
            return Err(ApiError::Validation(format!("unknown order: {other}")));
        }
    };

    let db = store.read().await;
    let mut tasks: Vec<Task> = db
        .tasks
        .iter()
        .filter(|t| q.completed.map_or(true, |c| t.completed == c))
        .filter(|t| q.reminder.map_or(true, |r| t.reminder == r))
        .cloned()
        .collect();
    drop(db);

    if let Some(key) = sort_key {
        tasks.sort_by(|a, b| {
            let ord = match key {
                SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
                SortKey::UpdatedAt => a.updated_at.cmp(&b.updated_at),
                SortKey::DueDate => a.due_date.cmp(&b.due_date),
                SortKey::Text => a.text.to_lowercase().cmp(&b.text.to_lowercase()),
                SortKey::Points => a.points.cmp(&b.points),
            };
            if descending { ord.reverse() } else { ord }
        });
    }

    let tasks: Vec<Task> = tasks
        .into_iter()
        .skip(q.offset.unwrap_or(0))
        .take(q.limit.unwrap_or(usize::MAX))
        .collect();

    Ok(Json(tasks))
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskInput {
    pub text: String,
    pub day: Option<String>,
    pub reminder: Option<bool>,
    pub completed: Option<bool>,
    pub points: Option<u32>,
    pub due_date: Option<String>, // RFC3339
}

// -----------------------------
// POST /api/tasks
// Creates a new task and saves it to db.json
// -----------------------------
pub async fn create_task(
    State(store): State<SharedStore>,
    Json(input): Json<CreateTaskInput>,
) -> Result<impl IntoResponse, ApiError> {
    let text = input.text.trim().to_string();
    if text.is_empty() {
        return Err(ApiError::Validation("text required".to_string()));
    }
    let due_date = parse_due_date(input.due_date.as_deref())?;

    let now = now_fixed_offset();
    let completed = input.completed.unwrap_or(false);

    let task = Task {
        id: Uuid::new_v4(),
        text,
        day: normalize_day(input.day),
        due_date,
        reminder: input.reminder.unwrap_or(false),
        completed,
        completed_at: completed.then_some(now),
        points: input.points.unwrap_or(0),
        created_at: now,
        updated_at: now,
    };

    let created = task.clone();
    store.mutate(move |db| db.tasks.push(task)).await?;

    Ok((StatusCode::CREATED, Json(created)))
}

// -----------------------------
// GET /api/tasks/:id
// Returns a single task by ID
// -----------------------------
pub async fn get_task(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    let id = parse_id(&id)?;

    let db = store.read().await;
    let task = db
        .tasks
        .iter()
        .find(|t| t.id == id)
        .cloned()
        .ok_or(ApiError::NotFound("task"))?;

    Ok(Json(task))
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskInput {
    pub text: Option<String>,
    pub day: Option<String>,
    pub reminder: Option<bool>,
    pub completed: Option<bool>,
    pub points: Option<u32>,
    // absent = leave unchanged, null = clear, string = set
    #[serde(default)]
    pub due_date: Option<Option<String>>,
}

// -----------------------------
// PUT /api/tasks/:id
// Updates an existing task by ID; only fields present in the
// body change
// -----------------------------
pub async fn update_task(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
    Json(input): Json<UpdateTaskInput>,
) -> Result<Json<Task>, ApiError> {
    let id = parse_id(&id)?;

    let text = match input.text {
        None => None,
        Some(t) => {
            let t = t.trim().to_string();
            if t.is_empty() {
                return Err(ApiError::Validation("text required".to_string()));
            }
            Some(t)
        }
    };
    let due_date = match input.due_date {
        None => None,
        Some(raw) => Some(parse_due_date(raw.as_deref())?),
    };

    let now = now_fixed_offset();

    let updated = store
        .mutate(move |db| {
            let t = db.tasks.iter_mut().find(|t| t.id == id)?;

            if let Some(text) = text {
                t.text = text;
            }
            if let Some(day) = input.day {
                t.day = normalize_day(Some(day));
            }
            if let Some(reminder) = input.reminder {
                t.reminder = reminder;
            }
            if let Some(completed) = input.completed {
                // direct edits flip the flag without awarding points
                if completed != t.completed {
                    t.completed_at = completed.then_some(now);
                }
                t.completed = completed;
            }
            if let Some(points) = input.points {
                t.points = points;
            }
            if let Some(due) = due_date {
                t.due_date = due;
            }
            t.updated_at = now;

            Some(t.clone())
        })
        .await?
        .ok_or(ApiError::NotFound("task"))?;

    Ok(Json(updated))
}

// -----------------------------
// DELETE /api/tasks/:id
// Removes a task permanently
// -----------------------------
pub async fn delete_task(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = parse_id(&id)?;

    let removed = store
        .mutate(move |db| {
            let before = db.tasks.len();
            db.tasks.retain(|t| t.id != id);
            db.tasks.len() < before
        })
        .await?;

    if !removed {
        return Err(ApiError::NotFound("task"));
    }

    Ok(Json(serde_json::json!({ "ok": true })))
}

#[derive(Debug, Deserialize)]
pub struct ReminderInput {
    pub reminder: bool,
}

// -----------------------------
// PATCH /api/tasks/:id/reminder
// Sets the reminder flag
// -----------------------------
pub async fn set_reminder(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
    Json(input): Json<ReminderInput>,
) -> Result<Json<Task>, ApiError> {
    let id = parse_id(&id)?;
    let now = now_fixed_offset();

    let updated = store
        .mutate(move |db| {
            let t = db.tasks.iter_mut().find(|t| t.id == id)?;
            t.reminder = input.reminder;
            t.updated_at = now;
            Some(t.clone())
        })
        .await?
        .ok_or(ApiError::NotFound("task"))?;

    Ok(Json(updated))
}

#[derive(Debug, Deserialize)]
pub struct CompleteTaskInput {
    pub award_points: Option<u32>,
    pub uncomplete: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct CompleteTaskResponse {
    pub task: Task,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub awarded: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deducted: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unlocked: Vec<Badge>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// -----------------------------
// PATCH /api/tasks/:id/complete
// Completes a task (awarding points and re-evaluating badges),
// or reverses a completion when the body asks to uncomplete.
// Repeat completions are a no-op: no points, no `awarded` field.
// -----------------------------
pub async fn complete_task(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
    Json(input): Json<CompleteTaskInput>,
) -> Result<Json<CompleteTaskResponse>, ApiError> {
    let id = parse_id(&id)?;
    let points = input.award_points.unwrap_or(game::DEFAULT_AWARD_POINTS);
    let now = now_fixed_offset();

    if input.uncomplete.unwrap_or(false) {
        let outcome = store
            .mutate(move |db| game::uncomplete_task(db, id, points, now))
            .await?
            .ok_or(ApiError::NotFound("task"))?;

        let resp = match outcome {
            UncompletionOutcome::Deducted { task, deducted } => {
                info!("deducted {deducted} points from task {}", task.id);
                CompleteTaskResponse {
                    task,
                    awarded: None,
                    deducted: Some(deducted),
                    unlocked: Vec::new(),
                    message: None,
                }
            }
            UncompletionOutcome::NotCompleted { task } => CompleteTaskResponse {
                task,
                awarded: None,
                deducted: None,
                unlocked: Vec::new(),
                message: Some("task is not completed".to_string()),
            },
        };
        return Ok(Json(resp));
    }

    let outcome = store
        .mutate(move |db| game::complete_task(db, id, points, now))
        .await?
        .ok_or(ApiError::NotFound("task"))?;

    let resp = match outcome {
        CompletionOutcome::Awarded {
            task,
            awarded,
            unlocked,
        } => {
            info!("awarded {awarded} points to task {}", task.id);
            for badge in &unlocked {
                info!("badge unlocked: {}", badge.name);
            }
            CompleteTaskResponse {
                task,
                awarded: Some(awarded),
                deducted: None,
                unlocked,
                message: None,
            }
        }
        CompletionOutcome::AlreadyCompleted { task } => CompleteTaskResponse {
            task,
            awarded: None,
            deducted: None,
            unlocked: Vec::new(),
            message: Some("task was already completed".to_string()),
        },
    };

    Ok(Json(resp))
}

#[derive(Debug, Deserialize)]
pub struct UpdateSettingsInput {
    pub app_mode: Option<String>,
    pub gamification_enabled: Option<bool>,
}

// -----------------------------
// GET /api/settings
// Returns the settings singleton
// -----------------------------
pub async fn get_settings(State(store): State<SharedStore>) -> Json<Settings> {
    Json(store.read().await.settings.clone())
}

// -----------------------------
// PUT /api/settings
// Updates the settings singleton; only fields present in the
// body change
// -----------------------------
pub async fn put_settings(
    State(store): State<SharedStore>,
    Json(input): Json<UpdateSettingsInput>,
) -> Result<Json<Settings>, ApiError> {
    let app_mode = match input.app_mode.as_deref() {
        None => None,
        Some("minimal") => Some(AppMode::Minimal),
        Some("engaging") => Some(AppMode::Engaging),
        Some(other) => {
            return Err(ApiError::Validation(format!("unknown app mode: {other}")));
        }
    };

    let settings = store
        .mutate(move |db| {
            if let Some(mode) = app_mode {
                db.settings.app_mode = mode;
            }
            if let Some(enabled) = input.gamification_enabled {
                db.settings.gamification_enabled = enabled;
            }
            db.settings.clone()
        })
        .await?;

    Ok(Json(settings))
}
