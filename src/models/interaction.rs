use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ContentKind;

/// A recorded "like" of one piece of content by one viewer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LikeEvent {
    pub viewer_id: Uuid,
    pub content_id: Uuid,
    pub content_kind: ContentKind,
    pub created_at: DateTime<Utc>,
}

impl LikeEvent {
    pub fn new(viewer_id: Uuid, content_id: Uuid, content_kind: ContentKind) -> Self {
        Self {
            viewer_id,
            content_id,
            content_kind,
            created_at: Utc::now(),
        }
    }
}

/// The person asking for recommendations
///
/// Resolution never fails: a missing or invalid credential yields `Anonymous`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    Anonymous,
    Identified(Uuid),
}

impl Viewer {
    pub fn id(&self) -> Option<Uuid> {
        match self {
            Viewer::Anonymous => None,
            Viewer::Identified(id) => Some(*id),
        }
    }
}

impl std::fmt::Display for Viewer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Viewer::Anonymous => write!(f, "anonymous"),
            Viewer::Identified(id) => write!(f, "{}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewer_display() {
        let id = Uuid::new_v4();
        assert_eq!(Viewer::Anonymous.to_string(), "anonymous");
        assert_eq!(Viewer::Identified(id).to_string(), id.to_string());
    }

    #[test]
    fn test_viewer_id() {
        let id = Uuid::new_v4();
        assert_eq!(Viewer::Anonymous.id(), None);
        assert_eq!(Viewer::Identified(id).id(), Some(id));
    }
}
