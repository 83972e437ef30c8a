//! Downstream domain objects.
//!
//! Each struct holds only the fields the gateway uses. Providers may send
//! more; unknown fields are ignored on deserialization.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A resource served by a provider.
pub trait Resource: DeserializeOwned + Serialize + Send + Sync + 'static {
    /// Resource name used in logs and errors
    const NAME: &'static str;
}

/// A task as seen by the consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Task id
    pub id: String,
    /// Title
    pub title: String,
    /// Content
    pub content: String,
}

impl Resource for Task {
    const NAME: &'static str = "task";
}

/// A user as seen by the consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User id
    pub id: String,
    /// Display name
    pub name: String,
}

impl Resource for User {
    const NAME: &'static str = "user";
}
