//! Typed filter predicates over the `stories` table.
//!
//! A [`Predicate`] is an AND of [`Condition`]s that renders to a parameterized
//! SQL fragment. [`compose`] builds one from a sparse [`SearchParams`] by
//! walking the fixed [`SearchField::ALL`] table and skipping absent fields.
//!
//! The same predicate can be evaluated in memory with [`Predicate::matches`];
//! both renderings agree on every well-formed story.

use crate::model::{SearchParams, Story};
use rusqlite::types::Value;

/// Filterable columns of the `stories` table (aliased as `s`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoryColumn {
    ProjectId,
    Title,
    Requester,
    Points,
    State,
}

impl StoryColumn {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::ProjectId => "s.project_id",
            Self::Title => "s.title",
            Self::Requester => "s.requester",
            Self::Points => "s.points",
            Self::State => "s.state",
        }
    }

    fn value_of(self, story: &Story) -> Value {
        match self {
            Self::ProjectId => Value::Integer(story.project_id.0),
            Self::Title => Value::Text(story.title.clone()),
            Self::Requester => Value::Text(story.requester.clone()),
            Self::Points => Value::Integer(i64::from(story.points)),
            Self::State => Value::Text(story.state.clone()),
        }
    }
}

/// A single filter expression on one column.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Case-sensitive substring test. Wildcard characters are literal.
    Contains { column: StoryColumn, needle: String },
    /// Exact equality.
    Equals { column: StoryColumn, value: Value },
}

impl Condition {
    #[must_use]
    pub fn contains(column: StoryColumn, needle: &str) -> Self {
        Self::Contains {
            column,
            needle: needle.to_string(),
        }
    }

    #[must_use]
    pub fn equals(column: StoryColumn, value: impl Into<Value>) -> Self {
        Self::Equals {
            column,
            value: value.into(),
        }
    }

    #[must_use]
    pub const fn column(&self) -> StoryColumn {
        match self {
            Self::Contains { column, .. } | Self::Equals { column, .. } => *column,
        }
    }

    fn push_sql(&self, sql: &mut String, params: &mut Vec<Value>) {
        match self {
            // instr() instead of LIKE: no escaping, no ASCII case folding
            Self::Contains { column, needle } => {
                sql.push_str("instr(");
                sql.push_str(column.as_sql());
                sql.push_str(", ?) > 0");
                params.push(Value::Text(needle.clone()));
            }
            Self::Equals { column, value } => {
                sql.push_str(column.as_sql());
                sql.push_str(" = ?");
                params.push(value.clone());
            }
        }
    }

    /// Evaluate the condition against an in-memory story.
    #[must_use]
    pub fn matches(&self, story: &Story) -> bool {
        match self {
            Self::Contains { column, needle } => match column.value_of(story) {
                Value::Text(text) => text.contains(needle.as_str()),
                _ => false,
            },
            Self::Equals { column, value } => column.value_of(story) == *value,
        }
    }
}

/// Conjunction of conditions. The empty predicate is always true.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    conditions: Vec<Condition>,
}

impl Predicate {
    /// The identity predicate.
    #[must_use]
    pub const fn always() -> Self {
        Self {
            conditions: Vec::new(),
        }
    }

    #[must_use]
    pub fn and(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    #[must_use]
    pub fn and_predicate(mut self, other: Self) -> Self {
        self.conditions.extend(other.conditions);
        self
    }

    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    #[must_use]
    pub fn is_always(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Render as a SQL boolean expression plus its bound values, in order.
    #[must_use]
    pub fn to_sql(&self) -> (String, Vec<Value>) {
        if self.conditions.is_empty() {
            return ("1 = 1".to_string(), Vec::new());
        }

        let mut sql = String::new();
        let mut params = Vec::with_capacity(self.conditions.len());
        for (i, condition) in self.conditions.iter().enumerate() {
            if i > 0 {
                sql.push_str(" AND ");
            }
            condition.push_sql(&mut sql, &mut params);
        }
        (sql, params)
    }

    #[must_use]
    pub fn matches(&self, story: &Story) -> bool {
        self.conditions.iter().all(|c| c.matches(story))
    }
}

/// Searchable story fields, each paired with the condition it contributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchField {
    Title,
    Requester,
    Points,
}

impl SearchField {
    /// Every searchable field, in the order conditions are emitted.
    pub const ALL: [Self; 3] = [Self::Title, Self::Requester, Self::Points];

    /// Extract this field from `params` and build its condition.
    ///
    /// Returns `None` when the field is absent.
    #[must_use]
    pub fn condition(self, params: &SearchParams) -> Option<Condition> {
        match self {
            Self::Title => params
                .title
                .as_deref()
                .map(|title| Condition::contains(StoryColumn::Title, title)),
            Self::Requester => params
                .requester
                .as_deref()
                .map(|requester| Condition::contains(StoryColumn::Requester, requester)),
            Self::Points => params
                .points
                .map(|points| Condition::equals(StoryColumn::Points, points)),
        }
    }
}

/// AND together the conditions of every present search field.
#[must_use]
pub fn compose(params: &SearchParams) -> Predicate {
    SearchField::ALL
        .iter()
        .filter_map(|field| field.condition(params))
        .fold(Predicate::always(), Predicate::and)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ProjectId, StoryId};

    fn story(title: &str, requester: &str, points: i32) -> Story {
        Story {
            id: StoryId(1),
            project_id: ProjectId(1),
            title: title.to_string(),
            requester: requester.to_string(),
            points,
            state: "unstarted".to_string(),
            rejected_date: None,
        }
    }

    #[test]
    fn empty_params_compose_to_identity() {
        let predicate = compose(&SearchParams::default());
        assert!(predicate.is_always());
        assert_eq!(predicate.to_sql(), ("1 = 1".to_string(), Vec::new()));
        assert!(predicate.matches(&story("anything", "anyone", 0)));
    }

    #[test]
    fn absent_fields_are_skipped() {
        let params = SearchParams {
            requester: Some("ali".to_string()),
            ..Default::default()
        };
        let predicate = compose(&params);
        assert_eq!(
            predicate.conditions(),
            &[Condition::contains(StoryColumn::Requester, "ali")]
        );
    }

    #[test]
    fn conditions_follow_field_table_order() {
        let params = SearchParams {
            title: Some("login".to_string()),
            requester: Some("bob".to_string()),
            points: Some(5),
        };
        let columns: Vec<StoryColumn> = compose(&params)
            .conditions()
            .iter()
            .map(Condition::column)
            .collect();
        assert_eq!(
            columns,
            vec![StoryColumn::Title, StoryColumn::Requester, StoryColumn::Points]
        );
    }

    #[test]
    fn to_sql_joins_with_and_and_binds_in_order() {
        let params = SearchParams {
            title: Some("login".to_string()),
            requester: None,
            points: Some(5),
        };
        let (sql, values) = compose(&params).to_sql();
        assert_eq!(sql, "instr(s.title, ?) > 0 AND s.points = ?");
        assert_eq!(
            values,
            vec![Value::Text("login".to_string()), Value::Integer(5)]
        );
    }

    #[test]
    fn and_predicate_prepends_fixed_conditions() {
        let scoped = Predicate::always()
            .and(Condition::equals(StoryColumn::ProjectId, 42_i64))
            .and_predicate(compose(&SearchParams {
                points: Some(3),
                ..Default::default()
            }));
        let (sql, values) = scoped.to_sql();
        assert_eq!(sql, "s.project_id = ? AND s.points = ?");
        assert_eq!(values, vec![Value::Integer(42), Value::Integer(3)]);
    }

    #[test]
    fn contains_is_case_sensitive_and_literal() {
        let pct = Condition::contains(StoryColumn::Title, "50%");
        assert!(pct.matches(&story("Ship 50% of it", "a", 1)));
        assert!(!pct.matches(&story("Ship 500 of it", "a", 1)));

        let upper = Condition::contains(StoryColumn::Title, "Login");
        assert!(upper.matches(&story("Login page", "a", 1)));
        assert!(!upper.matches(&story("login page", "a", 1)));
    }

    #[test]
    fn multiple_conditions_require_all() {
        let params = SearchParams {
            title: Some("page".to_string()),
            requester: None,
            points: Some(3),
        };
        let predicate = compose(&params);
        assert!(predicate.matches(&story("Login page", "a", 3)));
        assert!(!predicate.matches(&story("Login page", "a", 5)));
        assert!(!predicate.matches(&story("Logout", "a", 3)));
    }

    #[test]
    fn equals_on_text_column() {
        let done = Condition::equals(StoryColumn::State, "unstarted".to_string());
        assert!(done.matches(&story("t", "r", 1)));
        assert_eq!(Predicate::always().and(done).to_sql().0, "s.state = ?");
    }
}
