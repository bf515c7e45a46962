use axum::{Json, extract::State};
use serde::Serialize;

use crate::game;
use crate::models::Badge;
use crate::routes_tasks::now_fixed_offset;
use crate::store::SharedStore;

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total: usize,
    pub completed: usize,
    pub total_points: u64,
    pub level: u32,
    pub xp_in_level: u64,
    pub xp_for_next_level: u64,
    pub progress_percent: f64,
    pub streak_days: u32,
}

// -----------------------------
// GET /api/stats
// Aggregate counters plus the progression derived from them
// -----------------------------
pub async fn get_stats(State(store): State<SharedStore>) -> Json<StatsResponse> {
    let db = store.read().await;

    let stats = game::compute_stats(&db.tasks);
    let progression = game::level_for(stats.total_points);
    let streak = game::streak_days(&db.tasks, now_fixed_offset().date_naive());

    Json(StatsResponse {
        total: stats.total,
        completed: stats.completed,
        total_points: stats.total_points,
        level: progression.level,
        xp_in_level: progression.xp_in_level,
        xp_for_next_level: progression.xp_for_next_level,
        progress_percent: progression.progress_percent(),
        streak_days: streak,
    })
}

// -----------------------------
// GET /api/badges
// The fixed badge set with its unlock state
// -----------------------------
pub async fn get_badges(State(store): State<SharedStore>) -> Json<Vec<Badge>> {
    Json(store.read().await.badges.clone())
}
