//! Task model for scheduled publishing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;

/// Errors surfaced by the task store.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}

/// Lifecycle state of a task.
///
/// Transitions are one-directional: `pending → running → succeeded | failed`,
/// plus `pending → canceled` for user-initiated cancellation. There is no
/// automatic retry out of `failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    Running,
    Succeeded,
    Failed,
    Canceled,
}

/// Terminal outcome of one execution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Succeeded { url: String },
    Failed { error: String },
}

/// A persisted scheduled publish task.
#[derive(FromRow, Debug, Clone, Serialize)]
pub struct Task {
    pub id: i64,
    /// Blog identifier on the publishing platform. Immutable after creation.
    pub destination: String,
    /// Optional human-readable locator (e.g. the blog URL). Advisory only.
    pub destination_hint: Option<String>,
    pub title: String,
    /// Opaque markup; the queue never parses it.
    pub content: String,
    /// UTC instant after which the task becomes eligible for execution.
    pub scheduled_at: DateTime<Utc>,
    pub status: TaskStatus,
    /// Set only when the task succeeded.
    pub result_url: Option<String>,
    /// Set only when the task failed.
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Defensive re-check of the admission-time invariants. Returns the name
    /// of the first blank required field, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.destination.trim().is_empty() {
            return Some("destination");
        }
        if self.title.trim().is_empty() {
            return Some("title");
        }
        if self.content.trim().is_empty() {
            return Some("content");
        }
        None
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == TaskStatus::Pending && self.scheduled_at <= now
    }
}

/// A validated task ready for insertion.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub destination: String,
    pub destination_hint: Option<String>,
    pub title: String,
    pub content: String,
    pub scheduled_at: DateTime<Utc>,
}

impl NewTask {
    /// Validate raw admission input. `scheduled_at` must be an ISO-8601 (RFC
    /// 3339) timestamp; anything unparseable is rejected here so it can never
    /// become a runtime failure.
    pub fn parse(
        destination: &str,
        destination_hint: Option<String>,
        title: &str,
        content: &str,
        scheduled_at: &str,
    ) -> Result<Self, TaskError> {
        let scheduled_at = DateTime::parse_from_rfc3339(scheduled_at.trim())
            .map_err(|e| {
                TaskError::Validation(format!(
                    "scheduled_at is not a valid ISO-8601 timestamp: {}",
                    e
                ))
            })?
            .with_timezone(&Utc);

        let task = Self {
            destination: destination.trim().to_string(),
            destination_hint: destination_hint
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty()),
            title: title.trim().to_string(),
            content: content.to_string(),
            scheduled_at,
        };
        task.validate()?;
        Ok(task)
    }

    /// Check the required-field invariants. Also enforced by the store on
    /// insert, so no caller can create an unpublishable task.
    pub fn validate(&self) -> Result<(), TaskError> {
        if self.destination.trim().is_empty() {
            return Err(TaskError::Validation("destination is required".to_string()));
        }
        if self.title.trim().is_empty() {
            return Err(TaskError::Validation("title is required".to_string()));
        }
        if self.content.trim().is_empty() {
            return Err(TaskError::Validation("content is required".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(scheduled_at: &str) -> Result<NewTask, TaskError> {
        NewTask::parse("B1", None, "Hello", "<p>x</p>", scheduled_at)
    }

    #[test]
    fn parse_accepts_utc_timestamp() {
        let task = parse_ok("2030-01-01T00:00:00Z").unwrap();
        assert_eq!(task.scheduled_at.to_rfc3339(), "2030-01-01T00:00:00+00:00");
    }

    #[test]
    fn parse_normalizes_offset_to_utc() {
        let task = parse_ok("2030-01-01T09:00:00+09:00").unwrap();
        assert_eq!(task.scheduled_at.to_rfc3339(), "2030-01-01T00:00:00+00:00");
    }

    #[test]
    fn parse_rejects_garbage_timestamp() {
        let err = parse_ok("not-a-date").unwrap_err();
        assert!(matches!(err, TaskError::Validation(_)));
        assert!(err.to_string().contains("scheduled_at"));
    }

    #[test]
    fn parse_rejects_blank_destination() {
        let err =
            NewTask::parse("  ", None, "Hello", "<p>x</p>", "2030-01-01T00:00:00Z").unwrap_err();
        assert!(err.to_string().contains("destination"));
    }

    #[test]
    fn parse_rejects_blank_content() {
        let err = NewTask::parse("B1", None, "Hello", "", "2030-01-01T00:00:00Z").unwrap_err();
        assert!(err.to_string().contains("content"));
    }

    #[test]
    fn parse_drops_empty_hint() {
        let task = NewTask::parse(
            "B1",
            Some("  ".to_string()),
            "Hello",
            "<p>x</p>",
            "2030-01-01T00:00:00Z",
        )
        .unwrap();
        assert!(task.destination_hint.is_none());
    }

    #[test]
    fn missing_field_reports_first_blank() {
        let task = Task {
            id: 1,
            destination: "B1".to_string(),
            destination_hint: None,
            title: "   ".to_string(),
            content: "<p>x</p>".to_string(),
            scheduled_at: Utc::now(),
            status: TaskStatus::Running,
            result_url: None,
            error: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(task.missing_field(), Some("title"));
    }

    #[test]
    fn is_due_requires_pending_and_elapsed() {
        let now = Utc::now();
        let mut task = Task {
            id: 1,
            destination: "B1".to_string(),
            destination_hint: None,
            title: "Hello".to_string(),
            content: "<p>x</p>".to_string(),
            scheduled_at: now - chrono::Duration::minutes(1),
            status: TaskStatus::Pending,
            result_url: None,
            error: None,
            created_at: now,
            updated_at: now,
        };
        assert!(task.is_due(now));

        task.status = TaskStatus::Canceled;
        assert!(!task.is_due(now));

        task.status = TaskStatus::Pending;
        task.scheduled_at = now + chrono::Duration::minutes(1);
        assert!(!task.is_due(now));
    }
}
