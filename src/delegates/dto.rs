use serde::Deserialize;

use crate::delegates::repo::MunExperience;

/// Request body for creating a delegate profile directly.
#[derive(Debug, Deserialize)]
pub struct NewDelegateRequest {
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub dateofbirth: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub pastmuns: Vec<MunExperience>,
}

/// Partial-update request. Empty strings and empty sequences mean "leave the
/// stored value unchanged"; `verified` can only be pushed to true.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateDelegateRequest {
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub dateofbirth: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub pastmuns: Vec<MunExperience>,
    #[serde(default)]
    pub verified: bool,
}
