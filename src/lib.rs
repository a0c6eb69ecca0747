//! Tunevault Library
//!
//! Relational persistence for a music catalog: artists, albums and songs,
//! user playlists and ratings, subscription gating and cross-entity search.

pub mod config;
pub mod search;
pub mod session;
pub mod sqlite_persistence;
pub mod store;
pub mod subscription;

// Re-export commonly used types for convenience
pub use search::{SearchAggregator, SearchBundle};
pub use session::{AuthenticatedUser, SessionContext};
pub use store::{
    AlbumStore, ArtistStore, PlaylistMembershipStore, PlaylistStore, RatedEntityType, RatingStore,
    SongStore, SqliteMusicStore, StoreError, UserStore,
};
