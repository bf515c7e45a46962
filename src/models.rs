use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub text: String,
    pub day: Option<String>,
    pub due_date: Option<DateTime<FixedOffset>>,
    pub reminder: bool,
    pub completed: bool,
    pub completed_at: Option<DateTime<FixedOffset>>,
    pub points: u32, // points awarded for this task's own completion(s)
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppMode {
    Minimal,
    Engaging,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub app_mode: AppMode,
    pub gamification_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            app_mode: AppMode::Minimal,
            gamification_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BadgeId {
    Rookie,
    Master,
    Legend,
    Productive,
    Centurion,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Badge {
    pub id: BadgeId,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub unlocked: bool,
    pub unlocked_at: Option<DateTime<FixedOffset>>,
}

impl Badge {
    // The fixed badge set; only unlocked/unlocked_at ever change afterwards.
    pub fn catalog() -> Vec<Badge> {
        [
            (BadgeId::Rookie, "Task Rookie", "Complete your first task", "🌱"),
            (BadgeId::Master, "Task Master", "Complete 10 tasks", "⚔️"),
            (BadgeId::Legend, "Streak Legend", "Maintain a 7-day streak", "🔥"),
            (BadgeId::Productive, "Productivity Pro", "Complete 5 tasks in one day", "🚀"),
            (BadgeId::Centurion, "Centurion", "Earn 100 points", "💯"),
        ]
        .into_iter()
        .map(|(id, name, description, icon)| Badge {
            id,
            name: name.to_string(),
            description: description.to_string(),
            icon: icon.to_string(),
            unlocked: false,
            unlocked_at: None,
        })
        .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Db {
    pub settings: Settings,
    pub tasks: Vec<Task>,
    pub badges: Vec<Badge>,
}

impl Default for Db {
    fn default() -> Self {
        Db {
            settings: Settings::default(),
            tasks: Vec::new(),
            badges: Badge::catalog(),
        }
    }
}
