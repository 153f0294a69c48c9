use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The named record collections owned by the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Notes,
    Movies,
    Favorites,
    BucketList,
    Moods,
    Photos,
    Birthdays,
}

impl Collection {
    pub const ALL: [Collection; 7] = [
        Collection::Notes,
        Collection::Movies,
        Collection::Favorites,
        Collection::BucketList,
        Collection::Moods,
        Collection::Photos,
        Collection::Birthdays,
    ];

    pub fn table(self) -> &'static str {
        match self {
            Collection::Notes => "notes",
            Collection::Movies => "movies",
            Collection::Favorites => "favorites",
            Collection::BucketList => "bucket_list_items",
            Collection::Moods => "user_moods",
            Collection::Photos => "daily_photos",
            Collection::Birthdays => "birthdays",
        }
    }

    /// List collections read newest-first; singleton-per-user collections
    /// come back unordered.
    pub fn newest_first(self) -> bool {
        matches!(
            self,
            Collection::Notes
                | Collection::Movies
                | Collection::Favorites
                | Collection::BucketList
        )
    }

    /// Conflict key for upsert-by-key collections. At most one row may
    /// exist per key value.
    pub fn conflict_key(self) -> Option<&'static str> {
        match self {
            Collection::Moods | Collection::Birthdays => Some("user_name"),
            Collection::Photos => Some("user_name,photo_date"),
            _ => None,
        }
    }

    pub fn stamps_created_at(self) -> bool {
        self.newest_first()
    }

    pub fn stamps_updated_at(self) -> bool {
        matches!(self, Collection::Notes | Collection::Moods)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Note {
    pub id: Uuid,
    pub from_user: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    pub id: Uuid,
    pub title: String,
    pub added_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Favorite {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub person: String,
    pub emoji: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BucketListItem {
    pub id: Uuid,
    pub item: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserMood {
    pub id: Uuid,
    pub user_name: String,
    pub mood_emoji: String,
    #[serde(default)]
    pub mood_text: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyPhoto {
    pub id: Uuid,
    pub user_name: String,
    pub photo_url: String,
    #[serde(default)]
    pub caption: String,
    pub photo_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Birthday {
    pub id: Uuid,
    pub user_name: String,
    pub birth_date: NaiveDate,
}
