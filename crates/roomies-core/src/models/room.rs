use serde::{Deserialize, Serialize};

/// The room the signed-in user belongs to.
///
/// `room_id` is `None` when the user has not joined a room yet; the backend
/// signals that with a 404 on `GET /room`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Room {
    #[serde(default, alias = "id")]
    pub room_id: Option<i64>,
    #[serde(default, alias = "room_name")]
    pub name: Option<String>,
    #[serde(default)]
    pub invite_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Room {
    /// The "not in a room" result
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_member(&self) -> bool {
        self.room_id.is_some()
    }

    pub fn display_name(&self) -> String {
        match (&self.name, self.room_id) {
            (Some(name), _) if !name.is_empty() => name.clone(),
            (_, Some(id)) => format!("Room {}", id),
            _ => "No room".to_string(),
        }
    }
}

/// Generic acknowledgement returned by action endpoints such as
/// `POST /rooms/leave`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
}
