#![allow(dead_code)]

use chrono::NaiveDate;
use tracker::model::{NewStory, Project, ProjectId, Story};
use tracker::storage::SqliteStorage;

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub fn story(project: ProjectId, title: &str, requester: &str, points: i32) -> NewStory {
    NewStory::new(project, title, requester, points)
}

/// Create a project and its stories; stories are returned in insert order.
pub fn seed_project(
    storage: &mut SqliteStorage,
    name: &str,
    stories: &[(&str, &str, i32)],
) -> (Project, Vec<Story>) {
    let project = storage.create_project(name).expect("create project");
    let created = stories
        .iter()
        .map(|(title, requester, points)| {
            storage
                .create_story(&story(project.id, title, requester, *points))
                .expect("create story")
        })
        .collect();
    (project, created)
}
