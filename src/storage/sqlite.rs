//! `SQLite` storage implementation.

use crate::error::{Result, TrackerError};
use crate::model::{
    NewStory, Project, ProjectId, ProjectPoints, RejectionDate, SearchParams, Story, StoryId,
};
use crate::storage::predicate::{Condition, Predicate, StoryColumn, compose};
use crate::storage::schema::apply_schema;
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params_from_iter};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, trace};

const STORY_COLUMNS: &str =
    "s.id, s.project_id, s.title, s.requester, s.points, s.state, s.rejected_date";

/// SQLite-based storage backend.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Open a new connection to the database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema application fails.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open a connection that waits up to `busy_timeout` on a locked database.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema application fails.
    pub fn open_with_timeout(path: &Path, busy_timeout: Duration) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Insert a project; the store assigns its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn create_project(&mut self, name: &str) -> Result<Project> {
        self.conn
            .execute("INSERT INTO projects (name) VALUES (?)", [name])?;
        let id = ProjectId(self.conn.last_insert_rowid());
        debug!(project_id = %id, name, "Created project");
        Ok(Project {
            id,
            name: name.to_string(),
        })
    }

    /// Get a project by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_project(&self, id: ProjectId) -> Result<Option<Project>> {
        let project = self
            .conn
            .query_row(
                "SELECT id, name FROM projects WHERE id = ?",
                [id.0],
                |row| {
                    Ok(Project {
                        id: ProjectId(row.get(0)?),
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(project)
    }

    /// Insert a story under an existing project.
    ///
    /// # Errors
    ///
    /// Returns `ProjectNotFound` if the owning project does not exist, or a
    /// database error if the insert fails.
    pub fn create_story(&mut self, story: &NewStory) -> Result<Story> {
        if self.get_project(story.project_id)?.is_none() {
            return Err(TrackerError::ProjectNotFound {
                id: story.project_id.0,
            });
        }

        self.conn.execute(
            "INSERT INTO stories (project_id, title, requester, points, state, rejected_date)
             VALUES (?, ?, ?, ?, ?, ?)",
            rusqlite::params![
                story.project_id.0,
                story.title,
                story.requester,
                story.points,
                story.state,
                story.rejected_date,
            ],
        )?;
        let id = StoryId(self.conn.last_insert_rowid());
        debug!(story_id = %id, project_id = %story.project_id, "Created story");

        Ok(Story {
            id,
            project_id: story.project_id,
            title: story.title.clone(),
            requester: story.requester.clone(),
            points: story.points,
            state: story.state.clone(),
            rejected_date: story.rejected_date,
        })
    }

    /// Get a story by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_story(&self, id: StoryId) -> Result<Option<Story>> {
        let sql = format!("SELECT {STORY_COLUMNS} FROM stories s WHERE s.id = ?");
        let story = self
            .conn
            .query_row(&sql, [id.0], story_from_row)
            .optional()?;
        Ok(story)
    }

    /// All stories of a project, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn list_stories(&self, project: ProjectId) -> Result<Vec<Story>> {
        self.query_stories(&belongs_to(project))
    }

    /// Count the stories of a project.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn count_stories(&self, project: ProjectId) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT count(*) FROM stories WHERE project_id = ?",
            [project.0],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Delete a story. Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn delete_story(&mut self, id: StoryId) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM stories WHERE id = ?", [id.0])?;
        debug!(story_id = %id, rows, "Deleted story");
        Ok(rows > 0)
    }

    /// Search a project's stories.
    ///
    /// Every present criterion must hold (substring match for title and
    /// requester, exact match for points). With no criterion set the result
    /// is empty and no statement is prepared.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn search(&self, project: ProjectId, params: &SearchParams) -> Result<Vec<Story>> {
        if params.is_empty() {
            trace!(project_id = %project, "Search without criteria; returning no stories");
            return Ok(Vec::new());
        }

        let predicate = belongs_to(project).and_predicate(compose(params));
        let stories = self.query_stories(&predicate)?;
        debug!(
            project_id = %project,
            conditions = predicate.conditions().len(),
            rows = stories.len(),
            "Searched stories"
        );
        Ok(stories)
    }

    /// Sum of story points for a project, paired with the project name.
    ///
    /// A project without stories sums to zero. Returns `None` only when the
    /// project does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn project_points(&self, project: ProjectId) -> Result<Option<ProjectPoints>> {
        let points = self
            .conn
            .query_row(
                r"SELECT p.name, COALESCE(SUM(s.points), 0)
                  FROM projects p
                  LEFT JOIN stories s ON s.project_id = p.id
                  WHERE p.id = ?
                  GROUP BY p.id, p.name",
                [project.0],
                |row| {
                    Ok(ProjectPoints {
                        name: row.get(0)?,
                        points: row.get(1)?,
                    })
                },
            )
            .optional()?;
        debug!(project_id = %project, found = points.is_some(), "Summed project points");
        Ok(points)
    }

    /// Count a project's stories per rejection date.
    ///
    /// Ascending by date. Stories that were never rejected are grouped under
    /// `date: None`, which sorts last.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn rejection_histogram(&self, project: ProjectId) -> Result<Vec<RejectionDate>> {
        let mut stmt = self.conn.prepare(
            r"SELECT s.rejected_date, COUNT(*) AS story_count
              FROM stories s
              INNER JOIN projects p ON p.id = s.project_id
              WHERE s.project_id = ?
              GROUP BY s.rejected_date
              ORDER BY s.rejected_date IS NULL, s.rejected_date ASC",
        )?;
        let histogram = stmt
            .query_map([project.0], |row| {
                Ok(RejectionDate {
                    date: row.get::<_, Option<NaiveDate>>(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        debug!(project_id = %project, groups = histogram.len(), "Built rejection histogram");
        Ok(histogram)
    }

    /// Set a story's state.
    ///
    /// A single-row update with no version check; the last write wins. An
    /// unknown id updates nothing and is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn update_state(&mut self, story: StoryId, new_state: &str) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE stories SET state = ? WHERE id = ?",
            rusqlite::params![new_state, story.0],
        )?;
        if rows == 0 {
            debug!(story_id = %story, "State update matched no story");
        } else {
            debug!(story_id = %story, state = new_state, "Updated story state");
        }
        Ok(())
    }

    fn query_stories(&self, predicate: &Predicate) -> Result<Vec<Story>> {
        let (filter, values) = predicate.to_sql();
        let sql = format!(
            "SELECT {STORY_COLUMNS}
             FROM stories s
             INNER JOIN projects p ON p.id = s.project_id
             WHERE {filter}
             ORDER BY s.id ASC"
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let stories = stmt
            .query_map(params_from_iter(values), story_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(stories)
    }
}

fn belongs_to(project: ProjectId) -> Predicate {
    Predicate::always().and(Condition::equals(StoryColumn::ProjectId, project.0))
}

fn story_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Story> {
    Ok(Story {
        id: StoryId(row.get(0)?),
        project_id: ProjectId(row.get(1)?),
        title: row.get(2)?,
        requester: row.get(3)?,
        points: row.get(4)?,
        state: row.get(5)?,
        rejected_date: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_memory() {
        let storage = SqliteStorage::open_memory();
        assert!(storage.is_ok());
    }

    #[test]
    fn test_create_and_get_story() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let project = storage.create_project("Apollo").unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();

        let created = storage
            .create_story(
                &NewStory::new(project.id, "Launch checklist", "alice", 5)
                    .with_state("rejected")
                    .with_rejected_date(date),
            )
            .unwrap();

        let loaded = storage.get_story(created.id).unwrap().unwrap();
        assert_eq!(loaded, created);
        assert_eq!(loaded.rejected_date, Some(date));
        assert_eq!(
            storage.get_project(project.id).unwrap().unwrap().name,
            "Apollo"
        );
    }

    #[test]
    fn test_create_story_unknown_project() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let err = storage
            .create_story(&NewStory::new(ProjectId(404), "Orphan", "bob", 1))
            .unwrap_err();
        assert!(matches!(err, TrackerError::ProjectNotFound { id: 404 }));
    }

    #[test]
    fn test_missing_rows_are_none() {
        let storage = SqliteStorage::open_memory().unwrap();
        assert!(storage.get_project(ProjectId(1)).unwrap().is_none());
        assert!(storage.get_story(StoryId(1)).unwrap().is_none());
    }

    #[test]
    fn test_list_count_delete() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let project = storage.create_project("Apollo").unwrap();
        let other = storage.create_project("Gemini").unwrap();
        let a = storage
            .create_story(&NewStory::new(project.id, "A", "alice", 1))
            .unwrap();
        let b = storage
            .create_story(&NewStory::new(project.id, "B", "bob", 2))
            .unwrap();
        storage
            .create_story(&NewStory::new(other.id, "C", "carol", 3))
            .unwrap();

        let ids: Vec<StoryId> = storage
            .list_stories(project.id)
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec![a.id, b.id]);
        assert_eq!(storage.count_stories(project.id).unwrap(), 2);

        assert!(storage.delete_story(a.id).unwrap());
        assert!(!storage.delete_story(a.id).unwrap());
        assert_eq!(storage.count_stories(project.id).unwrap(), 1);
    }

    #[test]
    fn test_update_state_unknown_story_is_silent() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        assert!(storage.update_state(StoryId(999), "DONE").is_ok());
    }
}
