mod comments;
mod sessions;
mod store;
mod users;

pub use store::Database;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// File names inside the data directory.
pub const USERS_FILE: &str = "users.json";
/// Comments file.
pub const COMMENTS_FILE: &str = "comments.json";
/// Sessions file.
pub const SESSIONS_FILE: &str = "sessions.json";

/// User account, as stored in `users.json`.
///
/// Never serialize this into a response: it carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user ID.
    pub id: String,
    /// Username for login, unique ignoring case.
    pub username: String,
    /// Argon2 password hash.
    pub password_hash: String,
    /// Account creation time.
    pub created_at: DateTime<Utc>,
    /// Favorite series ids, in the order they were added.
    #[serde(default)]
    pub favorites: Vec<String>,
    /// Recently viewed, newest first.
    #[serde(default)]
    pub recent_viewed: Vec<RecentItem>,
    /// Where the user stopped reading.
    #[serde(default)]
    pub left_off: Option<LeftOff>,
    /// Avatar URL, empty when unset.
    #[serde(default)]
    pub avatar_url: String,
    /// Short profile text.
    #[serde(default)]
    pub bio: String,
}

impl User {
    /// Fresh account with empty profile data.
    pub fn new(id: String, username: String, password_hash: String) -> Self {
        Self {
            id,
            username,
            password_hash,
            created_at: Utc::now(),
            favorites: Vec::new(),
            recent_viewed: Vec::new(),
            left_off: None,
            avatar_url: String::new(),
            bio: String::new(),
        }
    }

    /// Add a favorite unless already present.
    pub fn add_favorite(&mut self, series_id: &str) {
        if !self.favorites.iter().any(|f| f == series_id) {
            self.favorites.push(series_id.to_string());
        }
    }

    /// Remove a favorite.
    pub fn remove_favorite(&mut self, series_id: &str) {
        self.favorites.retain(|f| f != series_id);
    }

    /// Put an entry at the front, dropping older entries with the same key.
    pub fn push_recent(&mut self, item: RecentItem, max: usize) {
        self.recent_viewed.retain(|r| r.key != item.key);
        self.recent_viewed.insert(0, item);
        self.recent_viewed.truncate(max);
    }
}

/// Kind of recently viewed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecentKind {
    /// A series page.
    Series,
    /// A chapter in the reader.
    Chapter,
}

impl RecentKind {
    /// Parse the wire name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "series" => Some(RecentKind::Series),
            "chapter" => Some(RecentKind::Chapter),
            _ => None,
        }
    }

    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecentKind::Series => "series",
            RecentKind::Chapter => "chapter",
        }
    }
}

/// Recently viewed entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentItem {
    /// `type:seriesId:chapterId`, unique within a user's list.
    pub key: String,
    /// Entry kind.
    #[serde(rename = "type")]
    pub kind: RecentKind,
    /// Series id.
    pub series_id: String,
    /// Chapter id, empty for series entries.
    #[serde(default)]
    pub chapter_id: String,
    /// When it was viewed.
    pub at: DateTime<Utc>,
}

impl RecentItem {
    /// New entry viewed now.
    pub fn new(kind: RecentKind, series_id: &str, chapter_id: &str) -> Self {
        let chapter_id = match kind {
            RecentKind::Series => "",
            RecentKind::Chapter => chapter_id,
        };

        Self {
            key: format!("{}:{}:{}", kind.as_str(), series_id, chapter_id),
            kind,
            series_id: series_id.to_string(),
            chapter_id: chapter_id.to_string(),
            at: Utc::now(),
        }
    }
}

/// Reading position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeftOff {
    /// Series id.
    pub series_id: String,
    /// Chapter id.
    pub chapter_id: String,
    /// Zero-based page index, stored as sent.
    pub page_index: serde_json::Number,
    /// Pages in the chapter, stored as sent.
    pub page_count: serde_json::Number,
    /// When it was saved.
    pub at: DateTime<Utc>,
}

/// Chapter comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Comment ID.
    pub id: String,
    /// Series id.
    pub series_id: String,
    /// Chapter id.
    pub chapter_id: String,
    /// Author user ID.
    pub user_id: String,
    /// Author username at posting time.
    pub username: String,
    /// Comment text.
    pub text: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Authentication session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Session token.
    pub token: String,
    /// User ID.
    pub user_id: String,
    /// Expiration timestamp.
    pub expires_at: i64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct UsersFile {
    #[serde(default)]
    pub users: Vec<User>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct CommentsFile {
    #[serde(default)]
    pub comments: Vec<Comment>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct SessionsFile {
    #[serde(default)]
    pub sessions: Vec<Session>,
}

/// Timestamp helper.
pub fn now_timestamp() -> i64 {
    Utc::now().timestamp()
}
