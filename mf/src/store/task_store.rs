//! TaskStore - canonical in-memory task collection
//!
//! Storage order is insertion order. Every operation addressed at an absent
//! id is a silent no-op; validation rejections are silent no-ops as well.
//! Return values only say whether something changed.

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use crate::domain::{self, NewResource, NewTask, ResourceItem, Status, Subtask, Task, TaskPatch, generate_id};

/// Tasks sharing a category, in store order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryGroup {
    pub category: String,
    pub tasks: Vec<Task>,
}

/// A kanban column: tasks of one status sorted by priority rank
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusColumn {
    pub status: Status,
    pub tasks: Vec<Task>,
}

/// In-memory task collection for one session
#[derive(Debug, Default, Clone)]
pub struct TaskStore {
    tasks: Vec<Task>,
    /// Every id the store has ever held, so none is handed out twice
    issued: HashSet<String>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// All tasks in store order
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Look up a task by id
    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Append tasks at the end; returns how many were appended
    ///
    /// A task whose id was already issued by this store gets a fresh one.
    pub fn append(&mut self, tasks: impl IntoIterator<Item = Task>) -> usize {
        let mut count = 0;
        for mut task in tasks {
            if self.issued.contains(&task.id) {
                debug!(id = %task.id, "append: id already issued, minting a new one");
                task.id = generate_id(domain::id::TASK);
            }
            self.issued.insert(task.id.clone());
            self.tasks.push(task);
            count += 1;
        }
        debug!(count, total = self.tasks.len(), "append: done");
        count
    }

    /// Build a task from partial fields and append it
    pub fn create(&mut self, new: NewTask) -> Option<&Task> {
        let task = Task::from_new(new)?;
        debug!(id = %task.id, "create: appending");
        self.append(std::iter::once(task));
        self.tasks.last()
    }

    /// Merge fields into an existing task
    pub fn update(&mut self, id: &str, patch: TaskPatch) -> bool {
        debug!(%id, "update: called");
        match self.get_mut(id) {
            Some(task) => {
                task.apply(patch);
                true
            }
            None => false,
        }
    }

    /// Remove a task together with its subtasks and resources
    pub fn delete(&mut self, id: &str) -> bool {
        debug!(%id, "delete: called");
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        self.tasks.len() != before
    }

    /// Advance status along the fixed cycle
    pub fn cycle_status(&mut self, id: &str) -> bool {
        match self.get_mut(id) {
            Some(task) => {
                task.cycle_status();
                debug!(%id, status = %task.status, "cycle_status: advanced");
                true
            }
            None => false,
        }
    }

    /// Set status directly (kanban drop)
    pub fn move_to_status(&mut self, id: &str, status: Status) -> bool {
        match self.get_mut(id) {
            Some(task) => {
                task.status = status;
                true
            }
            None => false,
        }
    }

    pub fn add_subtask(&mut self, task_id: &str, text: &str) -> Option<&Subtask> {
        self.get_mut(task_id)?.add_subtask(text)
    }

    pub fn toggle_subtask(&mut self, task_id: &str, subtask_id: &str) -> bool {
        self.get_mut(task_id).is_some_and(|t| t.toggle_subtask(subtask_id))
    }

    pub fn delete_subtask(&mut self, task_id: &str, subtask_id: &str) -> bool {
        self.get_mut(task_id).is_some_and(|t| t.delete_subtask(subtask_id))
    }

    pub fn add_resource(&mut self, task_id: &str, resource: NewResource) -> Option<&ResourceItem> {
        self.get_mut(task_id)?.add_resource(resource)
    }

    pub fn delete_resource(&mut self, task_id: &str, resource_id: &str) -> bool {
        self.get_mut(task_id).is_some_and(|t| t.delete_resource(resource_id))
    }

    /// Categories in order of first appearance, each with its tasks in store order
    pub fn group_by_category(&self) -> Vec<CategoryGroup> {
        let mut groups: Vec<CategoryGroup> = Vec::new();
        for task in &self.tasks {
            match groups.iter_mut().find(|g| g.category == task.category) {
                Some(group) => group.tasks.push(task.clone()),
                None => groups.push(CategoryGroup {
                    category: task.category.clone(),
                    tasks: vec![task.clone()],
                }),
            }
        }
        groups
    }

    /// Exactly three columns (todo, in-progress, done), priority-sorted, ties in store order
    pub fn group_by_status(&self) -> Vec<StatusColumn> {
        Status::ALL
            .iter()
            .map(|&status| {
                let mut tasks: Vec<Task> = self.tasks.iter().filter(|t| t.status == status).cloned().collect();
                // sort_by_key is stable
                tasks.sort_by_key(|t| t.priority.rank());
                StatusColumn { status, tasks }
            })
            .collect()
    }
}
