//! Data models for the Taskboard backend.
//!
//! Wire shapes are camelCase to match the board frontend.

mod comment;
mod project;
mod role;
mod task;
mod task_list;
mod user;

pub use comment::*;
pub use project::*;
pub use role::*;
pub use task::*;
pub use task_list::*;
pub use user::*;

use serde::{Deserialize, Deserializer};

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
