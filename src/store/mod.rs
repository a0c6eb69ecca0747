mod catalog;
mod error;
mod models;
mod playlists;
mod ratings;
mod schema;
mod sqlite_store;
mod trait_def;
mod users;

pub use error::{StoreError, StoreResult};
pub use models::{
    Album, Artist, NewAlbum, NewPlaylist, NewSong, NewUser, Playlist, RatedEntityType, Rating,
    Song, User,
};
pub use sqlite_store::{SqliteMusicStore, StoreCounts};
pub use trait_def::{
    AlbumStore, ArtistStore, PlaylistMembershipStore, PlaylistStore, RatingStore, SongStore,
    UserStore,
};
