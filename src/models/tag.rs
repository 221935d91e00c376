//! Shared tag vocabulary.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A tag shared across books. Names are stored lowercase and unique.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq, Eq)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}
