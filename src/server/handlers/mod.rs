pub mod auth;
pub mod catalog;
pub mod documents;
pub mod generation;
pub mod health;
pub mod logs;
pub mod maps;
pub mod shares;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityRequest {
    pub is_public: bool,
}
