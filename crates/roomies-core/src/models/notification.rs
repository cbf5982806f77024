use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// UTC, as sent by the backend (no offset)
    #[serde(default)]
    pub notification_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub notification_sender: Option<i64>,
    #[serde(default)]
    pub notification_recipient: Option<i64>,
    #[serde(default)]
    pub room_fkey: Option<i64>,
    #[serde(default)]
    pub is_read: bool,
}

impl Notification {
    pub fn is_for(&self, roommate_id: i64) -> bool {
        self.notification_recipient == Some(roommate_id)
    }

    /// Age relative to `now`, rounded the way a feed shows it.
    pub fn age_display(&self, now: NaiveDateTime) -> String {
        let Some(sent) = self.notification_time else {
            return "unknown".to_string();
        };
        let minutes = (now - sent).num_minutes();

        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }
}

pub fn unread_count(notifications: &[Notification]) -> usize {
    notifications.iter().filter(|n| !n.is_read).count()
}

/// Body of `POST /notifications`. Without a sender the backend uses the
/// signed-in roommate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewNotification {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub notification_recipient: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_sender: Option<i64>,
}

/// Body of `PUT /notifications`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NotificationUpdate {
    pub notification_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_sender: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_recipient: Option<i64>,
}
