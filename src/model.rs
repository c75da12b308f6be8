//! Data types: projects, stories, search parameters and query projections.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default lifecycle state for a freshly created story.
pub const DEFAULT_STATE: &str = "unstarted";

/// Primary key of a project row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub i64);

/// Primary key of a story row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoryId(pub i64);

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for StoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
}

/// A story always belongs to exactly one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Story {
    pub id: StoryId,
    pub project_id: ProjectId,
    pub title: String,
    pub requester: String,
    pub points: i32,
    /// Free-text lifecycle state ("unstarted", "started", "DONE", ...).
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_date: Option<NaiveDate>,
}

/// Insert payload for a story; the id is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStory {
    pub project_id: ProjectId,
    pub title: String,
    pub requester: String,
    pub points: i32,
    pub state: String,
    #[serde(default)]
    pub rejected_date: Option<NaiveDate>,
}

impl NewStory {
    #[must_use]
    pub fn new(project_id: ProjectId, title: &str, requester: &str, points: i32) -> Self {
        Self {
            project_id,
            title: title.to_string(),
            requester: requester.to_string(),
            points,
            state: DEFAULT_STATE.to_string(),
            rejected_date: None,
        }
    }

    #[must_use]
    pub fn with_state(mut self, state: &str) -> Self {
        self.state = state.to_string();
        self
    }

    #[must_use]
    pub const fn with_rejected_date(mut self, date: NaiveDate) -> Self {
        self.rejected_date = Some(date);
        self
    }
}

/// Sparse search criteria. Every field is independently optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    /// Substring of the story title.
    pub title: Option<String>,
    /// Substring of the requester name.
    pub requester: Option<String>,
    /// Exact point value.
    pub points: Option<i32>,
}

impl SearchParams {
    /// True when no criterion is set; such a search yields nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none() && self.requester.is_none() && self.points.is_none()
    }
}

/// Project name paired with the sum of its stories' points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectPoints {
    pub name: String,
    pub points: i64,
}

/// Number of stories sharing one rejection date.
///
/// `date` is `None` for the group of stories that were never rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionDate {
    pub date: Option<NaiveDate>,
    pub count: i64,
}
