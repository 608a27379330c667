//! Domain types for the todo API.
//!
//! # Design
//! These types mirror the mock-server's schema but are defined independently.
//! Integration tests catch any schema drift between the two crates. Field
//! names follow the backend's camelCase JSON; timestamps stay as the
//! ISO-8601 strings the backend stores, with `""` meaning "unset".

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single todo item returned by the API.
///
/// `completed_at` is non-empty exactly when `completed` is true. Records
/// written by older clients may lack either timestamp; those deserialize as
/// empty strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: Uuid,
    pub title: String,
    pub completed: bool,
    #[serde(default)]
    pub completed_at: String,
    #[serde(default)]
    pub created_at: String,
}

impl Todo {
    /// Whether `completed_at` agrees with `completed`.
    pub fn timestamps_consistent(&self) -> bool {
        self.completed == !self.completed_at.is_empty()
    }
}

/// Request payload for creating a new todo.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTodo {
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub completed_at: String,
}

impl CreateTodo {
    /// A fresh, not-yet-completed todo.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            completed: false,
            completed_at: String::new(),
        }
    }
}

/// Request payload for patching an existing todo. Only the fields present in
/// the JSON are applied; omitted fields remain unchanged on the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTodo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

impl UpdateTodo {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn completion(completed: bool, completed_at: impl Into<String>) -> Self {
        Self {
            completed: Some(completed),
            completed_at: Some(completed_at.into()),
            ..Self::default()
        }
    }
}

/// View predicate over the collection. Never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    #[default]
    All,
    Active,
    Completed,
}

impl FilterType {
    /// Every filter, in the order the filter bar shows them.
    pub const ALL: [FilterType; 3] = [FilterType::All, FilterType::Active, FilterType::Completed];

    pub fn matches(self, todo: &Todo) -> bool {
        match self {
            FilterType::All => true,
            FilterType::Active => !todo.completed,
            FilterType::Completed => todo.completed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FilterType::All => "all",
            FilterType::Active => "active",
            FilterType::Completed => "completed",
        }
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a filter name is not one of `all`, `active`, `completed`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown filter `{0}` (expected all, active or completed)")]
pub struct ParseFilterError(pub String);

impl FromStr for FilterType {
    type Err = ParseFilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(FilterType::All),
            "active" => Ok(FilterType::Active),
            "completed" => Ok(FilterType::Completed),
            _ => Err(ParseFilterError(s.to_string())),
        }
    }
}
