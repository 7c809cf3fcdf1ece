use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(rename = "_id")]
    pub id: i64,
    pub title: String,
    pub description: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Board columns, declared in the order they are rendered left to right.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum TaskColumn {
    #[default]
    Requested,
    Todo,
    InProgress,
    Done,
}

impl TaskColumn {
    pub const ALL: [TaskColumn; 4] = [
        TaskColumn::Requested,
        TaskColumn::Todo,
        TaskColumn::InProgress,
        TaskColumn::Done,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }

    /// Heading shown above the column in the UI.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Requested => "Requested",
            Self::Todo => "To do",
            Self::InProgress => "In Progress",
            Self::Done => "Done",
        }
    }
}

impl std::fmt::Display for TaskColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "requested" => Ok(Self::Requested),
            "todo" => Ok(Self::Todo),
            "in_progress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            _ => Err(format!("Invalid column: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(rename = "_id")]
    pub id: i64,
    pub project_id: i64,
    pub title: String,
    pub description: String,
    pub column: TaskColumn,
    /// Zero-based order inside `(project_id, column)`.
    pub position: i64,
    /// Per-project sequence number rendered as `Task-N`.
    pub index: i64,
    pub created_at: String,
    pub updated_at: String,
}

// API view types
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardView {
    pub project: Project,
    pub columns: Vec<ColumnView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnView {
    pub id: TaskColumn,
    pub name: String,
    pub items: Vec<Task>,
}

/// One end of a drag gesture: a column and a slot within it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DragLocation {
    pub droppable_id: TaskColumn,
    pub index: usize,
}

/// Outcome of a drag-and-drop gesture as reported by the board UI.
///
/// `destination` is `None` when the card was dropped outside any column.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragResult {
    pub draggable_id: i64,
    pub source: DragLocation,
    pub destination: Option<DragLocation>,
}

/// Result of persisting a drag: the board afterwards and, when the drag
/// changed anything, the moved task as stored.
#[derive(Debug, Clone)]
pub struct MoveOutcome {
    pub board: BoardView,
    pub moved: Option<Task>,
}

/// Task ids of one project grouped by column, each list in board order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoardLayout {
    pub columns: BTreeMap<TaskColumn, Vec<i64>>,
}

impl BoardLayout {
    /// Build a layout from tasks of a single project. Every column is
    /// present, even when empty.
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let mut columns: BTreeMap<TaskColumn, Vec<(i64, i64)>> =
            TaskColumn::ALL.iter().map(|c| (*c, Vec::new())).collect();
        for task in tasks {
            columns
                .entry(task.column)
                .or_default()
                .push((task.position, task.id));
        }
        let columns = columns
            .into_iter()
            .map(|(column, mut items)| {
                items.sort();
                (column, items.into_iter().map(|(_, id)| id).collect())
            })
            .collect();
        Self { columns }
    }

    /// Iterate `(task_id, column, position)` for every placed task.
    pub fn placements(&self) -> impl Iterator<Item = (i64, TaskColumn, i64)> + '_ {
        self.columns.iter().flat_map(|(column, ids)| {
            ids.iter()
                .enumerate()
                .map(move |(pos, id)| (*id, *column, pos as i64))
        })
    }
}
