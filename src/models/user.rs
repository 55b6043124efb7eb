use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Directory view of a user: identity plus the role flag the lesson
/// core cares about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_mentor: bool,
}
