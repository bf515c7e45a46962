/*
Progression and badge-award logic.
Module was independently written from HTTP / Axum for testing
*/

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::{Badge, BadgeId, Db, Task};

pub const DEFAULT_AWARD_POINTS: u32 = 10;

// Points required to advance from level L to L+1.
const LEVEL_STEP: u64 = 50;

// Level and XP position derived from a cumulative points total.
//     not stored anywhere; recomputed at read time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Progression {
    pub level: u32,
    pub xp_in_level: u64,
    pub xp_for_next_level: u64,
}

impl Progression {
    // Fraction of the current level completed, as a percentage in [0, 100).
    pub fn progress_percent(&self) -> f64 {
        (self.xp_in_level as f64 / self.xp_for_next_level as f64) * 100.0
    }
}

// Convert a points total into (level, xp-within-level).
//
// Starting at level 1, repeatedly consume the current level's
// threshold (level * 50) while the remainder covers it. The loop
// terminates because each step strictly decreases the remainder,
// and it leaves xp_in_level < xp_for_next_level.
pub fn level_for(total_points: u64) -> Progression {
    let mut level: u32 = 1;
    let mut remainder = total_points;

    loop {
        let threshold = level as u64 * LEVEL_STEP;
        if remainder < threshold {
            break;
        }
        remainder -= threshold;
        level += 1;
    }

    Progression {
        level,
        xp_in_level: remainder,
        xp_for_next_level: level as u64 * LEVEL_STEP,
    }
}

// Derived counters over the task collection. Never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
    pub total_points: u64,
}

pub fn compute_stats(tasks: &[Task]) -> Stats {
    Stats {
        total: tasks.len(),
        completed: tasks.iter().filter(|t| t.completed).count(),
        total_points: tasks.iter().map(|t| t.points as u64).sum(),
    }
}

// Distinct calendar dates (local offset of each timestamp) on which
// at least one currently-completed task was completed, ascending.
fn completion_dates(tasks: &[Task]) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = tasks
        .iter()
        .filter(|t| t.completed)
        .filter_map(|t| t.completed_at)
        .map(|at| at.date_naive())
        .collect();
    dates.sort();
    dates.dedup();
    dates
}

// Length of the run of consecutive completion days ending at the most
// recent one. A streak is only current if its last day is `today` or
// yesterday; anything older reports 0.
pub fn streak_days(tasks: &[Task], today: NaiveDate) -> u32 {
    let dates = completion_dates(tasks);
    let Some(&last) = dates.last() else {
        return 0;
    };
    if (today - last).num_days() > 1 {
        return 0;
    }

    let mut streak = 1;
    for pair in dates.windows(2).rev() {
        if (pair[1] - pair[0]).num_days() == 1 {
            streak += 1;
        } else {
            break;
        }
    }
    streak
}

// Largest number of completions that share one calendar day.
pub fn max_completions_in_a_day(tasks: &[Task]) -> usize {
    let mut per_day: HashMap<NaiveDate, usize> = HashMap::new();
    for t in tasks.iter().filter(|t| t.completed) {
        if let Some(at) = t.completed_at {
            *per_day.entry(at.date_naive()).or_insert(0) += 1;
        }
    }
    per_day.values().copied().max().unwrap_or(0)
}

// Re-check every locked badge against the live aggregates and unlock
// the ones whose condition now holds. Unlocks are monotonic, so
// re-running this when nothing changed unlocks nothing further.
pub fn evaluate_badges(db: &mut Db, now: DateTime<FixedOffset>) -> Vec<Badge> {
    let stats = compute_stats(&db.tasks);
    let streak = streak_days(&db.tasks, now.date_naive());
    let busiest_day = max_completions_in_a_day(&db.tasks);

    let mut newly_unlocked = Vec::new();
    for badge in db.badges.iter_mut().filter(|b| !b.unlocked) {
        let satisfied = match badge.id {
            BadgeId::Rookie => stats.completed >= 1,
            BadgeId::Master => stats.completed >= 10,
            BadgeId::Legend => streak >= 7,
            BadgeId::Productive => busiest_day >= 5,
            BadgeId::Centurion => stats.total_points >= 100,
        };
        if satisfied {
            badge.unlocked = true;
            badge.unlocked_at = Some(now);
            newly_unlocked.push(badge.clone());
        }
    }
    newly_unlocked
}

#[derive(Debug)]
pub enum CompletionOutcome {
    Awarded {
        task: Task,
        awarded: u32,
        unlocked: Vec<Badge>,
    },
    // Repeat request: no points change, no badge evaluation.
    AlreadyCompleted { task: Task },
}

#[derive(Debug)]
pub enum UncompletionOutcome {
    Deducted { task: Task, deducted: u32 },
    // The task was never completed; nothing to deduct.
    NotCompleted { task: Task },
}

// The pending -> completed transition: award points to the task and
// re-evaluate badges against the post-award aggregates. Returns None
// when no task has the given id.
//
// Callers must hold the transition atomic with the already-completed
// check (the store's write lock does this); two racing completions
// must not both observe completed = false.
pub fn complete_task(
    db: &mut Db,
    id: Uuid,
    award_points: u32,
    now: DateTime<FixedOffset>,
) -> Option<CompletionOutcome> {
    let task = db.tasks.iter_mut().find(|t| t.id == id)?;

    if task.completed {
        return Some(CompletionOutcome::AlreadyCompleted { task: task.clone() });
    }

    task.completed = true;
    task.completed_at = Some(now);
    task.points += award_points;
    task.updated_at = now;
    let task = task.clone();

    let unlocked = evaluate_badges(db, now);

    Some(CompletionOutcome::Awarded {
        task,
        awarded: award_points,
        unlocked,
    })
}

// The completed -> pending transition: deduct points, floored at zero.
// Badges already unlocked stay unlocked.
pub fn uncomplete_task(
    db: &mut Db,
    id: Uuid,
    deduct_points: u32,
    now: DateTime<FixedOffset>,
) -> Option<UncompletionOutcome> {
    let task = db.tasks.iter_mut().find(|t| t.id == id)?;

    if !task.completed {
        return Some(UncompletionOutcome::NotCompleted { task: task.clone() });
    }

    task.completed = false;
    task.completed_at = None;
    task.points = task.points.saturating_sub(deduct_points);
    task.updated_at = now;

    Some(UncompletionOutcome::Deducted {
        task: task.clone(),
        deducted: deduct_points,
    })
}
