use serde::{Deserialize, Serialize};

use super::Roommate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chore {
    pub id: i64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub is_task: bool,
    #[serde(default)]
    pub recurrence: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub assigned_roommate_id: Option<i64>,
    /// Some responses embed the assignee instead of sending its id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_roommate: Option<Roommate>,
    /// Sent as `null` for chores that never rotate
    #[serde(default)]
    pub rotation_order: Option<Vec<i64>>,
    #[serde(default)]
    pub autorotate: Option<bool>,
}

impl Chore {
    pub fn is_completed(&self) -> bool {
        self.completed.unwrap_or(false)
    }

    pub fn assignee_id(&self) -> Option<i64> {
        self.assigned_roommate_id
            .or_else(|| self.assigned_roommate.as_ref().map(|r| r.id))
    }

    pub fn is_assigned_to(&self, roommate_id: i64) -> bool {
        self.assignee_id() == Some(roommate_id)
    }

    /// Roommate who takes the chore over after the current assignee,
    /// following `rotation_order` and wrapping around.
    pub fn next_in_rotation(&self) -> Option<i64> {
        let current = self.assignee_id()?;
        let order = self.rotation_order.as_deref()?;
        let pos = order.iter().position(|&id| id == current)?;
        order.get((pos + 1) % order.len()).copied()
    }
}

/// Body of `POST /chores`. Field order is the wire order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewChore {
    pub description: String,
    pub start_date: String,
    pub end_date: String,
    pub is_task: bool,
    pub recurrence: String,
    pub assigned_roommate_id: i64,
    pub rotation_order: Vec<i64>,
}

/// Partial update for `PUT /chores/{id}`; only set fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChoreUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autorotate: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_task: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_roommate_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation_order: Option<Vec<i64>>,
}

impl ChoreUpdate {
    pub fn completed() -> Self {
        Self {
            completed: Some(true),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
