use std::{
    fs, io,
    path::PathBuf,
    sync::Arc,
};

use tokio::sync::{RwLock, RwLockReadGuard};

use crate::models::Db;

pub const DEFAULT_DB_PATH: &str = "data/db.json";

pub type SharedStore = Arc<Store>;

// Owns the database document in memory and mirrors every mutation to
// disk. The write lock is held across check-mutate-persist, so a
// sequence like "if not completed, award" is a single atomic update
// with respect to concurrent requests.
pub struct Store {
    path: PathBuf,
    db: RwLock<Db>,
}

impl Store {
    // Load the document, or start from the default one (settings
    // defaults, no tasks, the five locked badges) if the file does
    // not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Store> {
        let path = path.into();
        let db = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Db::default(),
            Err(e) => return Err(e),
        };
        Ok(Store {
            path,
            db: RwLock::new(db),
        })
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, Db> {
        self.db.read().await
    }

    // Run `f` under the write lock and persist the document before
    // releasing it.
    pub async fn mutate<T>(&self, f: impl FnOnce(&mut Db) -> T) -> io::Result<T> {
        let mut db = self.db.write().await;
        let out = f(&mut db);
        self.persist(&db)?;
        Ok(out)
    }

    fn persist(&self, db: &Db) -> io::Result<()> {
        let text = serde_json::to_string_pretty(db)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        // write-then-rename keeps the document intact if we crash mid-write
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp_path = PathBuf::from(tmp);

        fs::write(&tmp_path, text)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{self, CompletionOutcome};
    use crate::models::Task;
    use chrono::DateTime;
    use uuid::Uuid;

    fn pending_task(text: &str) -> Task {
        let now = DateTime::parse_from_rfc3339("2026-08-08T09:00:00+00:00").unwrap();
        Task {
            id: Uuid::new_v4(),
            text: text.to_string(),
            day: None,
            due_date: None,
            reminder: false,
            completed: false,
            completed_at: None,
            points: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn open_missing_file_starts_from_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("db.json")).unwrap();

        let db = store.read().await;
        assert!(db.tasks.is_empty());
        assert_eq!(db.badges.len(), 5);
        assert!(db.badges.iter().all(|b| !b.unlocked));
        assert!(db.settings.gamification_enabled);
    }

    #[tokio::test]
    async fn mutations_survive_a_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");

        let store = Store::open(&path).unwrap();
        let task = pending_task("persist me");
        let id = task.id;
        store.mutate(|db| db.tasks.push(task)).await.unwrap();
        drop(store);

        let reopened = Store::open(&path).unwrap();
        let db = reopened.read().await;
        assert_eq!(db.tasks.len(), 1);
        assert_eq!(db.tasks[0].id, id);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_completions_award_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path().join("db.json")).unwrap());

        let task = pending_task("contested");
        let id = task.id;
        store.mutate(|db| db.tasks.push(task)).await.unwrap();

        let now = DateTime::parse_from_rfc3339("2026-08-08T10:00:00+00:00").unwrap();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .mutate(move |db| game::complete_task(db, id, 10, now))
                    .await
                    .unwrap()
            }));
        }

        let mut awards = 0;
        let mut repeats = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Some(CompletionOutcome::Awarded { .. }) => awards += 1,
                Some(CompletionOutcome::AlreadyCompleted { .. }) => repeats += 1,
                None => panic!("task vanished"),
            }
        }
        assert_eq!(awards, 1);
        assert_eq!(repeats, 7);

        let db = store.read().await;
        assert_eq!(db.tasks[0].points, 10);
    }
}
