use serde::{Deserialize, Serialize};

/// The signed-in user's profile as returned by `PUT /user`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

/// Profile edit; only set fields are sent. Names are trimmed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl UserUpdate {
    pub fn names(first_name: &str, last_name: &str) -> Self {
        Self {
            first_name: Some(first_name.trim().to_string()),
            last_name: Some(last_name.trim().to_string()),
        }
    }
}
