use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Kind of shareable content
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Video,
    Photo,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Video => "video",
            ContentKind::Photo => "photo",
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "video" => Ok(ContentKind::Video),
            "photo" => Ok(ContentKind::Photo),
            other => Err(format!("unknown content kind: {}", other)),
        }
    }
}

/// Public profile of the user who uploaded a piece of content
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Owner {
    pub id: Uuid,
    pub username: String,
    #[serde(default)]
    pub profile_image: Option<String>,
}

/// A video or photo as seen by the recommendation engine
///
/// Items are owned by the content store; the engine only reads them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentItem {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: ContentKind,
    pub owner: Owner,
    pub title: String,
    pub media_url: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    /// Case-sensitive tags, compared as a set
    #[serde(default)]
    pub tags: Vec<String>,
    /// View count. Photos have none.
    #[serde(default)]
    pub views: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl ContentItem {
    /// Creates a video with a fresh id owned by `owner`
    pub fn video(owner: Owner, title: &str, tags: &[&str], views: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: ContentKind::Video,
            owner,
            title: title.to_string(),
            media_url: String::new(),
            thumbnail_url: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            views: Some(views),
            created_at: Utc::now(),
        }
    }

    /// Creates a photo with a fresh id owned by `owner`
    pub fn photo(owner: Owner, title: &str, tags: &[&str]) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: ContentKind::Photo,
            owner,
            title: title.to_string(),
            media_url: String::new(),
            thumbnail_url: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            views: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Popularity metric used for ordering; items without views rank last
    pub fn popularity(&self) -> i64 {
        self.views.unwrap_or(0)
    }

    /// True when at least one of this item's tags is in `tags`
    pub fn has_any_tag(&self, tags: &BTreeSet<String>) -> bool {
        self.tags.iter().any(|t| tags.contains(t))
    }
}
