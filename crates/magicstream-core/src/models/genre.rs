//! Genre domain model.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Genre {
    pub genre_id: i32,
    pub genre_name: String,
}
