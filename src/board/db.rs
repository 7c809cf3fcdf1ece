use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use super::models::*;
use super::reorder;
use crate::errors::BoardError;

/// Async-safe handle to the board database.
///
/// Wraps `BoardDb` behind `Arc<Mutex>` and runs all access on tokio's
/// blocking thread pool via `spawn_blocking`, so synchronous SQLite I/O never
/// ties up async worker threads.
#[derive(Clone)]
pub struct DbHandle {
    inner: Arc<std::sync::Mutex<BoardDb>>,
}

impl DbHandle {
    pub fn new(db: BoardDb) -> Self {
        Self {
            inner: Arc::new(std::sync::Mutex::new(db)),
        }
    }

    /// Run a closure with access to the database on a blocking thread.
    /// All data passed into `f` must be owned (`'static`).
    pub async fn call<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&BoardDb) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let db = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = db.lock().map_err(|_| BoardError::LockPoisoned)?;
            f(&guard)
        })
        .await
        .context("DB task panicked")?
    }
}

pub struct BoardDb {
    conn: Connection,
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl BoardDb {
    /// Open (or create) a SQLite database at the given path and run migrations.
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite database at {}", path.display()))?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Create an in-memory SQLite database (for testing).
    pub fn new_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        self.conn
            .execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        self.run_migrations().context("Failed to run migrations")?;
        Ok(())
    }

    fn run_migrations(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS projects (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    title TEXT NOT NULL,
                    description TEXT NOT NULL DEFAULT '',
                    next_task_index INTEGER NOT NULL DEFAULT 1,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS tasks (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                    title TEXT NOT NULL,
                    description TEXT NOT NULL DEFAULT '',
                    column_name TEXT NOT NULL DEFAULT 'requested',
                    position INTEGER NOT NULL DEFAULT 0,
                    task_index INTEGER NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_tasks_project ON tasks(project_id);
                CREATE INDEX IF NOT EXISTS idx_tasks_column ON tasks(project_id, column_name);
                ",
            )
            .context("Failed to create tables")?;
        Ok(())
    }

    // ── Project CRUD ──────────────────────────────────────────────────

    pub fn create_project(&self, title: &str, description: &str) -> Result<Project> {
        let ts = now();
        self.conn
            .execute(
                "INSERT INTO projects (title, description, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
                params![title, description, ts],
            )
            .context("Failed to insert project")?;
        let id = self.conn.last_insert_rowid();
        self.get_project(id)?
            .context("Project not found after insert")
    }

    pub fn list_projects(&self) -> Result<Vec<Project>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, title, description, created_at, updated_at FROM projects ORDER BY id")
            .context("Failed to prepare list_projects")?;
        let rows = stmt
            .query_map([], project_from_row)
            .context("Failed to query projects")?;
        let mut projects = Vec::new();
        for row in rows {
            projects.push(row.context("Failed to read project row")?);
        }
        Ok(projects)
    }

    pub fn get_project(&self, id: i64) -> Result<Option<Project>> {
        self.conn
            .query_row(
                "SELECT id, title, description, created_at, updated_at FROM projects WHERE id = ?1",
                params![id],
                project_from_row,
            )
            .optional()
            .context("Failed to query project")
    }

    /// Update the given fields; `None` leaves a field unchanged.
    /// Returns `None` when the project does not exist.
    pub fn update_project(
        &self,
        id: i64,
        title: Option<&str>,
        description: Option<&str>,
    ) -> Result<Option<Project>> {
        let count = self
            .conn
            .execute(
                "UPDATE projects
                 SET title = COALESCE(?1, title),
                     description = COALESCE(?2, description),
                     updated_at = ?3
                 WHERE id = ?4",
                params![title, description, now(), id],
            )
            .context("Failed to update project")?;
        if count == 0 {
            return Ok(None);
        }
        self.get_project(id)
    }

    /// Delete a project and, through the foreign key cascade, its tasks.
    pub fn delete_project(&self, id: i64) -> Result<bool> {
        let count = self
            .conn
            .execute("DELETE FROM projects WHERE id = ?1", params![id])
            .context("Failed to delete project")?;
        Ok(count > 0)
    }

    // ── Task CRUD ─────────────────────────────────────────────────────

    /// All tasks, or only those of `project_id`, in board order.
    pub fn list_tasks(&self, project_id: Option<i64>) -> Result<Vec<Task>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, project_id, title, description, column_name, position, task_index, created_at, updated_at
                 FROM tasks WHERE ?1 IS NULL OR project_id = ?1",
            )
            .context("Failed to prepare list_tasks")?;
        let rows = stmt
            .query_map(params![project_id], task_row_from_row)
            .context("Failed to query tasks")?;
        let mut tasks = Vec::new();
        for row in rows {
            let r = row.context("Failed to read task row")?;
            tasks.push(r.into_task()?);
        }
        tasks.sort_by_key(|t| (t.project_id, t.column, t.position));
        Ok(tasks)
    }

    /// Fetch a task scoped to its project. A task belonging to another
    /// project is reported as missing.
    pub fn get_task(&self, project_id: i64, task_id: i64) -> Result<Option<Task>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, project_id, title, description, column_name, position, task_index, created_at, updated_at
                 FROM tasks WHERE id = ?1 AND project_id = ?2",
                params![task_id, project_id],
                task_row_from_row,
            )
            .optional()
            .context("Failed to query task")?;
        row.map(TaskRow::into_task).transpose()
    }

    /// Append a task to the end of `column` and give it the project's next
    /// display index.
    pub fn create_task(
        &self,
        project_id: i64,
        title: &str,
        description: &str,
        column: &TaskColumn,
    ) -> Result<Task> {
        // Safety: DbHandle's Mutex already guarantees single-threaded access.
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;

        let task_index: i64 = tx
            .query_row(
                "SELECT next_task_index FROM projects WHERE id = ?1",
                params![project_id],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to read task counter")?
            .ok_or(BoardError::ProjectNotFound { id: project_id })?;

        let position: i64 = tx
            .query_row(
                "SELECT COALESCE(MAX(position), -1) + 1 FROM tasks WHERE project_id = ?1 AND column_name = ?2",
                params![project_id, column.as_str()],
                |row| row.get(0),
            )
            .context("Failed to get next position")?;

        let ts = now();
        tx.execute(
            "INSERT INTO tasks (project_id, title, description, column_name, position, task_index, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![project_id, title, description, column.as_str(), position, task_index, ts],
        )
        .context("Failed to insert task")?;
        let id = tx.last_insert_rowid();

        tx.execute(
            "UPDATE projects SET next_task_index = next_task_index + 1 WHERE id = ?1",
            params![project_id],
        )
        .context("Failed to bump task counter")?;

        tx.commit().context("Failed to commit task insert")?;
        self.get_task(project_id, id)?
            .context("Task not found after insert")
    }

    /// Update title and/or description. Returns `None` when the task does not
    /// exist within `project_id`.
    pub fn update_task(
        &self,
        project_id: i64,
        task_id: i64,
        title: Option<&str>,
        description: Option<&str>,
    ) -> Result<Option<Task>> {
        let count = self
            .conn
            .execute(
                "UPDATE tasks
                 SET title = COALESCE(?1, title),
                     description = COALESCE(?2, description),
                     updated_at = ?3
                 WHERE id = ?4 AND project_id = ?5",
                params![title, description, now(), task_id, project_id],
            )
            .context("Failed to update task")?;
        if count == 0 {
            return Ok(None);
        }
        self.get_task(project_id, task_id)
    }

    /// Delete a task and close the gap it leaves in its column.
    pub fn delete_task(&self, project_id: i64, task_id: i64) -> Result<bool> {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;
        let count = tx
            .execute(
                "DELETE FROM tasks WHERE id = ?1 AND project_id = ?2",
                params![task_id, project_id],
            )
            .context("Failed to delete task")?;
        if count == 0 {
            return Ok(false);
        }
        let layout = self.load_layout(project_id)?;
        self.write_layout(project_id, &layout)?;
        tx.commit().context("Failed to commit task delete")?;
        Ok(true)
    }

    // ── Board ─────────────────────────────────────────────────────────

    pub fn get_board(&self, project_id: i64) -> Result<Option<BoardView>> {
        let Some(project) = self.get_project(project_id)? else {
            return Ok(None);
        };
        let tasks = self.list_tasks(Some(project_id))?;

        let columns = TaskColumn::ALL
            .iter()
            .map(|col| ColumnView {
                id: *col,
                name: col.label().to_string(),
                // list_tasks already sorts by (column, position)
                items: tasks.iter().filter(|t| t.column == *col).cloned().collect(),
            })
            .collect();

        Ok(Some(BoardView { project, columns }))
    }

    /// Persist one drag-and-drop gesture. Returns `None` when the project
    /// does not exist. `moved` is only set when the layout changed.
    pub fn move_task(&self, project_id: i64, drag: &DragResult) -> Result<Option<MoveOutcome>> {
        if self.get_project(project_id)?.is_none() {
            return Ok(None);
        }
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;
        let mut layout = self.load_layout(project_id)?;
        let changed = reorder::apply_drag(&mut layout, drag)?;
        if changed {
            self.write_layout(project_id, &layout)?;
        }
        tx.commit().context("Failed to commit task move")?;

        let moved = if changed {
            self.get_task(project_id, drag.draggable_id)?
        } else {
            None
        };
        Ok(self
            .get_board(project_id)?
            .map(|board| MoveOutcome { board, moved }))
    }

    /// Replace the whole column layout of a project. The layout must place
    /// every task of the project exactly once.
    pub fn apply_layout(&self, project_id: i64, proposed: &BoardLayout) -> Result<Option<BoardView>> {
        if self.get_project(project_id)?.is_none() {
            return Ok(None);
        }
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;
        let current = self.load_layout(project_id)?;
        reorder::validate_layout(&current, proposed)?;
        self.write_layout(project_id, proposed)?;
        tx.commit().context("Failed to commit board layout")?;
        self.get_board(project_id)
    }

    fn load_layout(&self, project_id: i64) -> Result<BoardLayout> {
        let tasks = self.list_tasks(Some(project_id))?;
        Ok(BoardLayout::from_tasks(&tasks))
    }

    /// Write column and position for every placement. `updated_at` only
    /// moves for tasks whose placement actually changed.
    fn write_layout(&self, project_id: i64, layout: &BoardLayout) -> Result<()> {
        let ts = now();
        let mut stmt = self
            .conn
            .prepare(
                "UPDATE tasks
                 SET updated_at = CASE WHEN column_name = ?1 AND position = ?2 THEN updated_at ELSE ?3 END,
                     column_name = ?1,
                     position = ?2
                 WHERE id = ?4 AND project_id = ?5",
            )
            .context("Failed to prepare layout update")?;
        for (task_id, column, position) in layout.placements() {
            stmt.execute(params![column.as_str(), position, ts, task_id, project_id])
                .with_context(|| format!("Failed to place task {}", task_id))?;
        }
        Ok(())
    }
}

#[cfg(test)]
impl BoardDb {
    /// Run raw SQL, for tests that need to corrupt the schema.
    pub(crate) fn execute_raw(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql).context("Failed to run raw SQL")
    }
}

fn project_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

fn task_row_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TaskRow> {
    Ok(TaskRow {
        id: row.get(0)?,
        project_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        column_name: row.get(4)?,
        position: row.get(5)?,
        task_index: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

/// Intermediate row struct for reading tasks from SQLite before converting
/// the column_name string into a typed value.
struct TaskRow {
    id: i64,
    project_id: i64,
    title: String,
    description: String,
    column_name: String,
    position: i64,
    task_index: i64,
    created_at: String,
    updated_at: String,
}

impl TaskRow {
    fn into_task(self) -> Result<Task> {
        let column = TaskColumn::from_str(&self.column_name)
            .map_err(|e| anyhow::anyhow!(e))
            .context("Failed to parse task column")?;

        Ok(Task {
            id: self.id,
            project_id: self.project_id,
            title: self.title,
            description: self.description,
            column,
            position: self.position,
            index: self.task_index,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::models::DragLocation;

    fn titles(view: &BoardView, column: TaskColumn) -> Vec<String> {
        view.columns
            .iter()
            .find(|c| c.id == column)
            .map(|c| c.items.iter().map(|t| t.title.clone()).collect())
            .unwrap_or_default()
    }

    fn positions(db: &BoardDb, project_id: i64, column: TaskColumn) -> Result<Vec<i64>> {
        Ok(db
            .list_tasks(Some(project_id))?
            .into_iter()
            .filter(|t| t.column == column)
            .map(|t| t.position)
            .collect())
    }

    #[test]
    fn test_create_database_and_run_migrations() -> Result<()> {
        let db = BoardDb::new_in_memory()?;

        let table_count: i32 = db.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('projects', 'tasks')",
            [],
            |row| row.get(0),
        )?;
        assert_eq!(table_count, 2, "Expected 2 tables to exist");

        let index_count: i32 = db.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='index' AND name IN ('idx_tasks_project', 'idx_tasks_column')",
            [],
            |row| row.get(0),
        )?;
        assert_eq!(index_count, 2, "Expected 2 indexes to exist");

        Ok(())
    }

    #[test]
    fn test_reopening_file_database_keeps_data() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("board.db");
        {
            let db = BoardDb::new(&path)?;
            db.create_project("Persisted", "")?;
        }
        let db = BoardDb::new(&path)?;
        let projects = db.list_projects()?;
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].title, "Persisted");
        Ok(())
    }

    #[test]
    fn test_create_and_list_projects() -> Result<()> {
        let db = BoardDb::new_in_memory()?;

        let alpha = db.create_project("alpha", "first")?;
        db.create_project("beta", "")?;
        assert!(alpha.id > 0);
        assert_eq!(alpha.description, "first");
        assert!(!alpha.created_at.is_empty());

        let projects = db.list_projects()?;
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].title, "alpha");
        assert_eq!(projects[1].title, "beta");

        Ok(())
    }

    #[test]
    fn test_get_missing_project_is_none() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        assert!(db.get_project(999)?.is_none());
        Ok(())
    }

    #[test]
    fn test_update_project_partial() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let project = db.create_project("Old", "keep me")?;

        let updated = db
            .update_project(project.id, Some("New"), None)?
            .expect("project should exist");
        assert_eq!(updated.title, "New");
        assert_eq!(updated.description, "keep me");

        assert!(db.update_project(999, Some("x"), None)?.is_none());
        Ok(())
    }

    #[test]
    fn test_delete_project_cascades_tasks() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let project = db.create_project("doomed", "")?;
        db.create_task(project.id, "t1", "", &TaskColumn::Todo)?;
        db.create_task(project.id, "t2", "", &TaskColumn::Done)?;

        assert!(db.delete_project(project.id)?);
        assert!(db.list_tasks(None)?.is_empty());
        assert!(!db.delete_project(project.id)?);
        Ok(())
    }

    #[test]
    fn test_create_task_appends_and_numbers() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let project = db.create_project("p", "")?;

        let a = db.create_task(project.id, "a", "desc", &TaskColumn::Todo)?;
        let b = db.create_task(project.id, "b", "", &TaskColumn::Todo)?;
        let c = db.create_task(project.id, "c", "", &TaskColumn::Done)?;

        assert_eq!(a.project_id, project.id);
        assert_eq!(a.description, "desc");
        assert_eq!((a.position, b.position, c.position), (0, 1, 0));
        assert_eq!((a.index, b.index, c.index), (1, 2, 3));
        Ok(())
    }

    #[test]
    fn test_task_index_is_not_reused_after_delete() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let project = db.create_project("p", "")?;
        let first = db.create_task(project.id, "first", "", &TaskColumn::Todo)?;
        db.delete_task(project.id, first.id)?;

        let second = db.create_task(project.id, "second", "", &TaskColumn::Todo)?;
        assert_eq!(second.index, 2);
        assert_eq!(second.position, 0);
        Ok(())
    }

    #[test]
    fn test_task_index_is_per_project() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let a = db.create_project("a", "")?;
        let b = db.create_project("b", "")?;
        db.create_task(a.id, "a1", "", &TaskColumn::Todo)?;
        let b1 = db.create_task(b.id, "b1", "", &TaskColumn::Todo)?;
        assert_eq!(b1.index, 1);
        Ok(())
    }

    #[test]
    fn test_create_task_for_missing_project_fails_typed() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let err = db
            .create_task(42, "orphan", "", &TaskColumn::Todo)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BoardError>(),
            Some(BoardError::ProjectNotFound { id: 42 })
        ));
        Ok(())
    }

    #[test]
    fn test_list_tasks_filters_by_project() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let a = db.create_project("a", "")?;
        let b = db.create_project("b", "")?;
        db.create_task(a.id, "A1", "", &TaskColumn::Todo)?;
        db.create_task(b.id, "B1", "", &TaskColumn::Todo)?;
        db.create_task(a.id, "A2", "", &TaskColumn::Requested)?;

        assert_eq!(db.list_tasks(None)?.len(), 3);
        let only_a = db.list_tasks(Some(a.id))?;
        assert_eq!(only_a.len(), 2);
        // Requested sorts before Todo
        assert_eq!(only_a[0].title, "A2");
        assert_eq!(only_a[1].title, "A1");
        Ok(())
    }

    #[test]
    fn test_get_task_is_scoped_to_project() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let a = db.create_project("a", "")?;
        let b = db.create_project("b", "")?;
        let task = db.create_task(a.id, "mine", "", &TaskColumn::Todo)?;

        assert!(db.get_task(a.id, task.id)?.is_some());
        assert!(db.get_task(b.id, task.id)?.is_none());
        Ok(())
    }

    #[test]
    fn test_update_task_fields() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let project = db.create_project("p", "")?;
        let task = db.create_task(project.id, "Old title", "Old desc", &TaskColumn::Todo)?;

        let updated = db
            .update_task(project.id, task.id, Some("New title"), None)?
            .expect("task should exist");
        assert_eq!(updated.title, "New title");
        assert_eq!(updated.description, "Old desc");
        assert_eq!(updated.column, TaskColumn::Todo);

        let updated = db
            .update_task(project.id, task.id, None, Some("New desc"))?
            .expect("task should exist");
        assert_eq!(updated.description, "New desc");
        Ok(())
    }

    #[test]
    fn test_update_task_in_wrong_project_is_none() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let a = db.create_project("a", "")?;
        let b = db.create_project("b", "")?;
        let task = db.create_task(a.id, "t", "", &TaskColumn::Todo)?;

        assert!(db.update_task(b.id, task.id, Some("hijack"), None)?.is_none());
        let unchanged = db.get_task(a.id, task.id)?.expect("task should exist");
        assert_eq!(unchanged.title, "t");
        Ok(())
    }

    #[test]
    fn test_delete_task_closes_gap() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let project = db.create_project("p", "")?;
        db.create_task(project.id, "a", "", &TaskColumn::Todo)?;
        let b = db.create_task(project.id, "b", "", &TaskColumn::Todo)?;
        db.create_task(project.id, "c", "", &TaskColumn::Todo)?;

        assert!(db.delete_task(project.id, b.id)?);
        assert_eq!(positions(&db, project.id, TaskColumn::Todo)?, vec![0, 1]);
        assert!(!db.delete_task(project.id, b.id)?);
        Ok(())
    }

    #[test]
    fn test_get_board_view() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let project = db.create_project("board", "")?;
        db.create_task(project.id, "Req", "", &TaskColumn::Requested)?;
        db.create_task(project.id, "Todo 1", "", &TaskColumn::Todo)?;
        db.create_task(project.id, "Todo 2", "", &TaskColumn::Todo)?;

        let board = db.get_board(project.id)?.expect("board should exist");
        assert_eq!(board.project.title, "board");
        assert_eq!(board.columns.len(), 4);
        assert_eq!(board.columns[0].id, TaskColumn::Requested);
        assert_eq!(board.columns[2].name, "In Progress");
        assert_eq!(titles(&board, TaskColumn::Todo), vec!["Todo 1", "Todo 2"]);
        assert!(titles(&board, TaskColumn::Done).is_empty());

        assert!(db.get_board(999)?.is_none());
        Ok(())
    }

    #[test]
    fn test_move_task_across_columns_persists() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let project = db.create_project("p", "")?;
        let a = db.create_task(project.id, "a", "", &TaskColumn::Todo)?;
        let b = db.create_task(project.id, "b", "", &TaskColumn::Todo)?;
        db.create_task(project.id, "c", "", &TaskColumn::Done)?;

        let drag = DragResult {
            draggable_id: a.id,
            source: DragLocation {
                droppable_id: TaskColumn::Todo,
                index: 0,
            },
            destination: Some(DragLocation {
                droppable_id: TaskColumn::Done,
                index: 1,
            }),
        };
        let outcome = db.move_task(project.id, &drag)?.expect("board should exist");
        assert_eq!(titles(&outcome.board, TaskColumn::Todo), vec!["b"]);
        assert_eq!(titles(&outcome.board, TaskColumn::Done), vec!["c", "a"]);
        let reported = outcome.moved.expect("move should report the task");
        assert_eq!(reported.id, a.id);
        assert_eq!((reported.column, reported.position), (TaskColumn::Done, 1));

        let moved_b = db.get_task(project.id, b.id)?.expect("task should exist");
        assert_eq!(moved_b.position, 0);
        let moved_a = db.get_task(project.id, a.id)?.expect("task should exist");
        assert_eq!(moved_a.column, TaskColumn::Done);
        assert_eq!(moved_a.position, 1);
        Ok(())
    }

    #[test]
    fn test_move_task_without_destination_changes_nothing() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let project = db.create_project("p", "")?;
        let a = db.create_task(project.id, "a", "", &TaskColumn::Todo)?;

        let drag = DragResult {
            draggable_id: a.id,
            source: DragLocation {
                droppable_id: TaskColumn::Todo,
                index: 0,
            },
            destination: None,
        };
        let outcome = db.move_task(project.id, &drag)?.expect("board should exist");
        assert_eq!(titles(&outcome.board, TaskColumn::Todo), vec!["a"]);
        assert!(outcome.moved.is_none());
        let unchanged = db.get_task(project.id, a.id)?.expect("task should exist");
        assert_eq!(unchanged.updated_at, a.updated_at);
        Ok(())
    }

    #[test]
    fn test_stale_move_rolls_back() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let project = db.create_project("p", "")?;
        let a = db.create_task(project.id, "a", "", &TaskColumn::Todo)?;
        db.create_task(project.id, "b", "", &TaskColumn::Todo)?;

        let drag = DragResult {
            draggable_id: a.id,
            source: DragLocation {
                droppable_id: TaskColumn::Todo,
                index: 1,
            },
            destination: Some(DragLocation {
                droppable_id: TaskColumn::Done,
                index: 0,
            }),
        };
        let err = db.move_task(project.id, &drag).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BoardError>(),
            Some(BoardError::StaleDrag { .. })
        ));
        assert_eq!(positions(&db, project.id, TaskColumn::Todo)?, vec![0, 1]);
        Ok(())
    }

    #[test]
    fn test_move_task_missing_project_is_none() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let drag = DragResult {
            draggable_id: 1,
            source: DragLocation {
                droppable_id: TaskColumn::Todo,
                index: 0,
            },
            destination: None,
        };
        assert!(db.move_task(5, &drag)?.is_none());
        Ok(())
    }

    #[test]
    fn test_apply_layout_rewrites_columns() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let project = db.create_project("p", "")?;
        let a = db.create_task(project.id, "a", "", &TaskColumn::Todo)?;
        let b = db.create_task(project.id, "b", "", &TaskColumn::Todo)?;
        let c = db.create_task(project.id, "c", "", &TaskColumn::Requested)?;

        let mut layout = BoardLayout::default();
        layout.columns.insert(TaskColumn::Done, vec![b.id, c.id]);
        layout.columns.insert(TaskColumn::InProgress, vec![a.id]);

        let board = db
            .apply_layout(project.id, &layout)?
            .expect("board should exist");
        assert_eq!(titles(&board, TaskColumn::Done), vec!["b", "c"]);
        assert_eq!(titles(&board, TaskColumn::InProgress), vec!["a"]);
        assert!(titles(&board, TaskColumn::Todo).is_empty());
        Ok(())
    }

    #[test]
    fn test_apply_layout_rejects_incomplete_layout() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let project = db.create_project("p", "")?;
        let a = db.create_task(project.id, "a", "", &TaskColumn::Todo)?;
        db.create_task(project.id, "b", "", &TaskColumn::Todo)?;

        let mut layout = BoardLayout::default();
        layout.columns.insert(TaskColumn::Done, vec![a.id]);

        let err = db.apply_layout(project.id, &layout).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BoardError>(),
            Some(BoardError::LayoutMismatch(_))
        ));
        let still_todo = db.get_task(project.id, a.id)?.expect("task should exist");
        assert_eq!(still_todo.column, TaskColumn::Todo);
        Ok(())
    }

    #[test]
    fn test_move_to_own_slot_reports_no_change() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let project = db.create_project("p", "")?;
        let a = db.create_task(project.id, "a", "", &TaskColumn::Todo)?;

        let slot = DragLocation {
            droppable_id: TaskColumn::Todo,
            index: 0,
        };
        let drag = DragResult {
            draggable_id: a.id,
            source: slot,
            destination: Some(slot),
        };
        let outcome = db.move_task(project.id, &drag)?.expect("board should exist");
        assert!(outcome.moved.is_none());
        let unchanged = db.get_task(project.id, a.id)?.expect("task should exist");
        assert_eq!(unchanged.updated_at, a.updated_at);
        Ok(())
    }

    #[test]
    fn test_move_past_end_reports_stored_position() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let project = db.create_project("p", "")?;
        let a = db.create_task(project.id, "a", "", &TaskColumn::Todo)?;

        let drag = DragResult {
            draggable_id: a.id,
            source: DragLocation {
                droppable_id: TaskColumn::Todo,
                index: 0,
            },
            destination: Some(DragLocation {
                droppable_id: TaskColumn::Done,
                index: 99,
            }),
        };
        let outcome = db.move_task(project.id, &drag)?.expect("board should exist");
        let moved = outcome.moved.expect("move should report the task");
        assert_eq!(moved.column, TaskColumn::Done);
        assert_eq!(moved.position, 0);
        Ok(())
    }
}
