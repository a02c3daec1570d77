//! Projection of a style profile into tabs, cards and outbound links.

pub mod cards;
pub mod links;
pub mod tabs;

pub use cards::{RecommendationCard, SectionView, TabView};
pub use links::{Coordinates, LinkSettings, LocationFix, ShareDispatch};
pub use tabs::Tab;
