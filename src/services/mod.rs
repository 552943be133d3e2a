pub mod affinity;
pub mod backfill;
pub mod blend;
pub mod candidates;
pub mod policy;
pub mod recommendations;
pub mod viewer;

pub use policy::RecommendationPolicy;
pub use recommendations::Recommender;
pub use viewer::ViewerResolver;
