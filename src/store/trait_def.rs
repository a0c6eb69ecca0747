use chrono::{DateTime, Utc};

use super::error::StoreResult;
use super::models::{
    Album, Artist, NewAlbum, NewPlaylist, NewSong, NewUser, Playlist, RatedEntityType, Rating,
    Song, User,
};

/// One trait per repository concern; `SqliteMusicStore` implements all of
/// them over a single database. Lookups that miss return `Ok(None)` or an
/// empty vec, deletions report whether a row was actually removed.

pub trait ArtistStore: Send + Sync {
    fn get_artist(&self, artist_id: i64) -> StoreResult<Option<Artist>>;
    fn artist_by_name(&self, name: &str) -> StoreResult<Option<Artist>>;
    fn all_artists(&self) -> StoreResult<Vec<Artist>>;
    /// Case-insensitive substring match on name; blank query yields nothing.
    fn search_artists(&self, query: &str) -> StoreResult<Vec<Artist>>;
    fn create_artist(&self, name: &str) -> StoreResult<i64>;
    fn delete_artist(&self, artist_id: i64) -> StoreResult<bool>;
}

pub trait AlbumStore: Send + Sync {
    fn get_album(&self, album_id: i64) -> StoreResult<Option<Album>>;
    /// Exact title match; the lowest id wins when titles collide.
    fn album_by_title(&self, title: &str) -> StoreResult<Option<Album>>;
    fn albums_by_artist(&self, artist_id: i64) -> StoreResult<Vec<Album>>;
    fn search_albums(&self, query: &str) -> StoreResult<Vec<Album>>;
    fn create_album(&self, album: &NewAlbum) -> StoreResult<i64>;
    fn delete_album(&self, album_id: i64) -> StoreResult<bool>;
}

pub trait SongStore: Send + Sync {
    fn get_song(&self, song_id: i64) -> StoreResult<Option<Song>>;
    /// Exact title match; the lowest id wins when titles collide.
    fn song_by_title(&self, title: &str) -> StoreResult<Option<Song>>;
    /// Full listing ordered by songID, optionally capped.
    fn all_songs(&self, limit: Option<usize>) -> StoreResult<Vec<Song>>;
    fn songs_by_album(&self, album_id: i64) -> StoreResult<Vec<Song>>;
    fn songs_by_artist(&self, artist_id: i64) -> StoreResult<Vec<Song>>;
    fn search_songs(&self, query: &str) -> StoreResult<Vec<Song>>;
    fn create_song(&self, song: &NewSong) -> StoreResult<i64>;
    fn delete_song(&self, song_id: i64) -> StoreResult<bool>;
    /// Songs with at least one rating, best average first.
    fn top_rated_songs(&self, limit: usize) -> StoreResult<Vec<Song>>;
}

pub trait PlaylistStore: Send + Sync {
    fn get_playlist(&self, playlist_id: i64) -> StoreResult<Option<Playlist>>;
    /// Exact name match across all users; the lowest id wins when names collide.
    fn playlist_by_name(&self, name: &str) -> StoreResult<Option<Playlist>>;
    fn playlists_by_user(&self, user_id: i64) -> StoreResult<Vec<Playlist>>;
    fn public_playlists(&self) -> StoreResult<Vec<Playlist>>;
    /// Search over public playlists only; private ones never leak.
    fn search_public_playlists(&self, query: &str) -> StoreResult<Vec<Playlist>>;
    fn create_playlist(&self, playlist: &NewPlaylist) -> StoreResult<i64>;
    fn rename_playlist(&self, playlist_id: i64, name: &str) -> StoreResult<bool>;
    fn delete_playlist(&self, playlist_id: i64) -> StoreResult<bool>;
}

pub trait PlaylistMembershipStore: Send + Sync {
    /// `Ok(false)` when the pair already exists or either side is missing.
    fn add_song_to_playlist(&self, playlist_id: i64, song_id: i64) -> StoreResult<bool>;
    fn remove_song_from_playlist(&self, playlist_id: i64, song_id: i64) -> StoreResult<bool>;
    fn songs_in_playlist(&self, playlist_id: i64) -> StoreResult<Vec<Song>>;
    fn song_in_playlist(&self, playlist_id: i64, song_id: i64) -> StoreResult<bool>;
    fn song_in_any_playlist_of_user(&self, user_id: i64, song_id: i64) -> StoreResult<bool>;
}

pub trait RatingStore: Send + Sync {
    /// Insert or overwrite this user's rating of the entity; song aggregates
    /// are recomputed in the same transaction.
    fn add_or_update_rating(
        &self,
        entity: RatedEntityType,
        entity_id: i64,
        user_id: i64,
        value: i64,
    ) -> StoreResult<bool>;
    fn delete_rating(&self, rating_id: i64) -> StoreResult<bool>;
    fn ratings_by_user(&self, user_id: i64) -> StoreResult<Vec<Rating>>;
    fn ratings_by_song(&self, song_id: i64) -> StoreResult<Vec<Rating>>;
    fn get_rating(&self, user_id: i64, song_id: i64) -> StoreResult<Option<Rating>>;
    fn user_rating_for(
        &self,
        entity: RatedEntityType,
        entity_id: i64,
        user_id: i64,
    ) -> StoreResult<Option<i64>>;
}

pub trait UserStore: Send + Sync {
    fn create_user(&self, user: &NewUser) -> StoreResult<i64>;
    fn get_user(&self, user_id: i64) -> StoreResult<Option<User>>;
    fn user_by_name(&self, user_name: &str) -> StoreResult<Option<User>>;
    fn delete_user(&self, user_id: i64) -> StoreResult<bool>;
    fn subscription_end_date(&self, user_id: i64) -> StoreResult<Option<DateTime<Utc>>>;
    fn set_subscription_end_date(
        &self,
        user_id: i64,
        end_date: DateTime<Utc>,
    ) -> StoreResult<bool>;
}
