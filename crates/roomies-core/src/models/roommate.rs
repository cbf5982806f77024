use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roommate {
    pub id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    /// Older backends send a single `name` instead of first/last.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "room_fkey")]
    pub room_id: Option<i64>,
}

impl Roommate {
    pub fn full_name(&self) -> String {
        let joined = format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or("")
        )
        .trim()
        .to_string();

        if !joined.is_empty() {
            joined
        } else if let Some(ref name) = self.name {
            name.clone()
        } else {
            self.username.clone().unwrap_or_else(|| format!("Roommate {}", self.id))
        }
    }
}

/// Outcome of fetching one roommate's profile picture.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfilePicture {
    /// Normalized `data:image/jpeg;base64,...` URI
    Present(String),
    /// The roommate never uploaded a picture
    Absent,
    /// The fetch failed; carries the error message
    Unavailable(String),
}

impl ProfilePicture {
    /// The data URI if there is one. Absent and failed pictures both read
    /// as `None` so the front end shows its default avatar.
    pub fn data_uri(&self) -> Option<&str> {
        match self {
            ProfilePicture::Present(uri) => Some(uri.as_str()),
            ProfilePicture::Absent | ProfilePicture::Unavailable(_) => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ProfilePicture::Unavailable(_))
    }
}

impl From<Option<String>> for ProfilePicture {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(uri) => ProfilePicture::Present(uri),
            None => ProfilePicture::Absent,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoommateWithPicture {
    pub roommate: Roommate,
    pub picture: ProfilePicture,
}
