pub mod content;
pub mod interaction;
pub mod recommendation;

pub use content::{ContentItem, ContentKind, Owner};
pub use interaction::{LikeEvent, Viewer};
pub use recommendation::{
    RecommendationRequest, RecommendationResult, RecommendationSource, RecommendedItem,
};
