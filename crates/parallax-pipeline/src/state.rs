//! Typestate pattern for the task state machine.
//!
//! Task states are encoded in the type system, making invalid transitions a
//! compile-time error rather than a runtime check. The only legal paths are
//!
//! ```text
//! Pending ──▶ Building ──▶ Pushing ──▶ Done
//!                │            │
//!                ▼            ▼
//!              Failed       Failed
//! ```
//!
//! There is no `fail` on [`Pending`] or on terminal states: a task can only
//! fail out of a running stage, and a terminal task never transitions again.

use std::marker::PhantomData;

use crate::error::{PipelineError, PipelineResult};
use crate::types::{TaskData, TaskError, TaskId, TaskRecord, TaskResult, TaskStatus};

/// Marker trait for task states.
pub trait TaskState: private::Sealed + Send + Sync {
    /// Get the persisted status representation.
    fn persisted() -> TaskStatus;

    /// Get the state name for error messages.
    fn name() -> &'static str;
}

mod private {
    pub trait Sealed {}
}

/// Task created, waiting for a worker to pick it up.
#[derive(Debug, Clone, Copy)]
pub struct Pending;

/// Build stage in progress.
#[derive(Debug, Clone, Copy)]
pub struct Building;

/// Push stage in progress.
#[derive(Debug, Clone, Copy)]
pub struct Pushing;

/// Pipeline completed successfully.
#[derive(Debug, Clone, Copy)]
pub struct Done;

/// Pipeline failed during build or push.
#[derive(Debug, Clone, Copy)]
pub struct Failed;

impl private::Sealed for Pending {}
impl private::Sealed for Building {}
impl private::Sealed for Pushing {}
impl private::Sealed for Done {}
impl private::Sealed for Failed {}

impl TaskState for Pending {
    fn persisted() -> TaskStatus {
        TaskStatus::Pending
    }
    fn name() -> &'static str {
        "pending"
    }
}

impl TaskState for Building {
    fn persisted() -> TaskStatus {
        TaskStatus::Building
    }
    fn name() -> &'static str {
        "building"
    }
}

impl TaskState for Pushing {
    fn persisted() -> TaskStatus {
        TaskStatus::Pushing
    }
    fn name() -> &'static str {
        "pushing"
    }
}

impl TaskState for Done {
    fn persisted() -> TaskStatus {
        TaskStatus::Done
    }
    fn name() -> &'static str {
        "done"
    }
}

impl TaskState for Failed {
    fn persisted() -> TaskStatus {
        TaskStatus::Failed
    }
    fn name() -> &'static str {
        "failed"
    }
}

/// A task in a specific state.
///
/// The state parameter `S` determines which transitions are available.
#[derive(Debug)]
pub struct Task<S: TaskState> {
    data: TaskData,
    _state: PhantomData<S>,
}

impl<S: TaskState> Task<S> {
    /// Get a reference to the task data.
    #[must_use]
    pub const fn data(&self) -> &TaskData {
        &self.data
    }

    /// Get the task ID.
    #[must_use]
    pub const fn id(&self) -> &TaskId {
        &self.data.id
    }

    /// Get the current state as a persisted value.
    #[must_use]
    pub fn status(&self) -> TaskStatus {
        S::persisted()
    }

    /// Snapshot the task as a storable record.
    #[must_use]
    pub fn record(&self) -> TaskRecord {
        TaskRecord {
            data: self.data.clone(),
            status: S::persisted(),
        }
    }

    /// Convert into the underlying data (consuming the task).
    #[must_use]
    pub fn into_data(self) -> TaskData {
        self.data
    }

    /// Internal helper to transition to a new state.
    fn transition<T: TaskState>(mut self) -> Task<T> {
        self.data.updated_at = chrono::Utc::now();
        Task {
            data: self.data,
            _state: PhantomData,
        }
    }

    /// Internal helper to transition with data modification.
    fn transition_with<T: TaskState>(mut self, f: impl FnOnce(&mut TaskData)) -> Task<T> {
        f(&mut self.data);
        self.data.updated_at = chrono::Utc::now();
        Task {
            data: self.data,
            _state: PhantomData,
        }
    }
}

impl Task<Pending> {
    /// Create a new task in the pending state.
    #[must_use]
    pub const fn create(data: TaskData) -> Self {
        Self {
            data,
            _state: PhantomData,
        }
    }

    /// Transition to the building state when a worker picks the task up.
    #[must_use]
    pub fn start_build(self) -> Task<Building> {
        self.transition()
    }
}

impl Task<Building> {
    /// Transition to the pushing state after a successful build.
    #[must_use]
    pub fn start_push(self) -> Task<Pushing> {
        self.transition()
    }

    /// Transition to the failed state, capturing the build error.
    #[must_use]
    pub fn fail(self, error: TaskError) -> Task<Failed> {
        self.transition_with(|data| {
            data.error = Some(error);
        })
    }
}

impl Task<Pushing> {
    /// Transition to the done state, recording the pipeline result.
    #[must_use]
    pub fn complete(self, result: TaskResult) -> Task<Done> {
        self.transition_with(|data| {
            data.result = Some(result);
        })
    }

    /// Transition to the failed state, capturing the push error.
    #[must_use]
    pub fn fail(self, error: TaskError) -> Task<Failed> {
        self.transition_with(|data| {
            data.error = Some(error);
        })
    }
}

/// A type-erased task that can be in any state.
///
/// Used when loading from the record store where the status is not known at
/// compile time.
#[derive(Debug)]
pub enum AnyTask {
    /// Task in pending state.
    Pending(Task<Pending>),
    /// Task in building state.
    Building(Task<Building>),
    /// Task in pushing state.
    Pushing(Task<Pushing>),
    /// Task in done state.
    Done(Task<Done>),
    /// Task in failed state.
    Failed(Task<Failed>),
}

impl AnyTask {
    /// Create an `AnyTask` from data and a persisted status.
    #[must_use]
    pub const fn from_persisted(data: TaskData, status: TaskStatus) -> Self {
        match status {
            TaskStatus::Pending => Self::Pending(Task {
                data,
                _state: PhantomData,
            }),
            TaskStatus::Building => Self::Building(Task {
                data,
                _state: PhantomData,
            }),
            TaskStatus::Pushing => Self::Pushing(Task {
                data,
                _state: PhantomData,
            }),
            TaskStatus::Done => Self::Done(Task {
                data,
                _state: PhantomData,
            }),
            TaskStatus::Failed => Self::Failed(Task {
                data,
                _state: PhantomData,
            }),
        }
    }

    /// Get a reference to the task data.
    #[must_use]
    pub const fn data(&self) -> &TaskData {
        match self {
            Self::Pending(t) => t.data(),
            Self::Building(t) => t.data(),
            Self::Pushing(t) => t.data(),
            Self::Done(t) => t.data(),
            Self::Failed(t) => t.data(),
        }
    }

    /// Get the current status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        match self {
            Self::Pending(_) => TaskStatus::Pending,
            Self::Building(_) => TaskStatus::Building,
            Self::Pushing(_) => TaskStatus::Pushing,
            Self::Done(_) => TaskStatus::Done,
            Self::Failed(_) => TaskStatus::Failed,
        }
    }

    /// Try to extract a pending task.
    ///
    /// Returns an error if the task has already progressed past pending.
    pub fn try_into_pending(self) -> PipelineResult<Task<Pending>> {
        match self {
            Self::Pending(t) => Ok(t),
            other => Err(PipelineError::internal(format!(
                "task is {}, expected pending",
                other.status()
            ))),
        }
    }

    /// Check if the task is in a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done(_) | Self::Failed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WorkspaceId;

    fn test_data() -> TaskData {
        TaskData::new(WorkspaceId::new("ws1"), "blob://sources/app.zip")
    }

    #[test]
    fn happy_path_transitions() {
        let pending = Task::<Pending>::create(test_data());
        assert_eq!(pending.status(), TaskStatus::Pending);

        let building = pending.start_build();
        assert_eq!(building.status(), TaskStatus::Building);

        let pushing = building.start_push();
        assert_eq!(pushing.status(), TaskStatus::Pushing);

        let done = pushing.complete(TaskResult {
            artifact_ref: "blob://artifacts/app.bin".to_owned(),
            image_ref: "registry.local/apps:abc123".to_owned(),
        });
        assert_eq!(done.status(), TaskStatus::Done);
        assert!(done.data().result.is_some());
        assert!(done.data().error.is_none());
    }

    #[test]
    fn fail_from_building() {
        let building = Task::<Pending>::create(test_data()).start_build();
        let failed = building.fail(TaskError::build("compiler exited with status 1"));
        assert_eq!(failed.status(), TaskStatus::Failed);
        assert!(failed.data().result.is_none());
        assert_eq!(
            failed.data().error.as_ref().map(|e| e.message.as_str()),
            Some("compiler exited with status 1")
        );
    }

    #[test]
    fn fail_from_pushing() {
        let pushing = Task::<Pending>::create(test_data()).start_build().start_push();
        let failed = pushing.fail(TaskError::push("registry unreachable"));
        assert_eq!(failed.status(), TaskStatus::Failed);
    }

    #[test]
    fn transitions_advance_updated_at() {
        let pending = Task::<Pending>::create(test_data());
        let created = pending.data().created_at;
        let building = pending.start_build();
        assert!(building.data().updated_at >= created);
    }

    #[test]
    fn any_task_roundtrip() {
        let data = test_data();
        let id = data.id.clone();

        let any = AnyTask::from_persisted(data, TaskStatus::Pending);
        assert_eq!(any.status(), TaskStatus::Pending);
        assert!(!any.is_terminal());

        let pending = any.try_into_pending().expect("should be pending");
        assert_eq!(pending.id(), &id);
    }

    #[test]
    fn any_task_wrong_state() {
        let any = AnyTask::from_persisted(test_data(), TaskStatus::Done);
        assert!(any.is_terminal());
        assert!(any.try_into_pending().is_err());
    }
}
