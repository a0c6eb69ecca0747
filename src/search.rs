//! Cross-entity search: one query fanned out to songs, artists, albums and
//! public playlists, bundled into a single response shape.

use std::sync::Arc;

use serde::Serialize;

use crate::store::{
    Album, AlbumStore, Artist, ArtistStore, Playlist, PlaylistStore, Song, SongStore, StoreResult,
};

#[derive(Debug, Default, Serialize)]
pub struct SearchBundle {
    pub songs: Vec<Song>,
    pub artists: Vec<Artist>,
    pub albums: Vec<Album>,
    pub playlists: Vec<Playlist>,
}

impl SearchBundle {
    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
            && self.artists.is_empty()
            && self.albums.is_empty()
            && self.playlists.is_empty()
    }
}

pub struct SearchAggregator {
    songs: Arc<dyn SongStore>,
    artists: Arc<dyn ArtistStore>,
    albums: Arc<dyn AlbumStore>,
    playlists: Arc<dyn PlaylistStore>,
}

impl SearchAggregator {
    pub fn new(
        songs: Arc<dyn SongStore>,
        artists: Arc<dyn ArtistStore>,
        albums: Arc<dyn AlbumStore>,
        playlists: Arc<dyn PlaylistStore>,
    ) -> Self {
        Self {
            songs,
            artists,
            albums,
            playlists,
        }
    }

    /// A blank query short-circuits to an empty bundle without touching the
    /// stores. Only public playlists are searched.
    pub fn search(&self, query: &str) -> StoreResult<SearchBundle> {
        if query.trim().is_empty() {
            return Ok(SearchBundle::default());
        }
        Ok(SearchBundle {
            songs: self.songs.search_songs(query)?,
            artists: self.artists.search_artists(query)?,
            albums: self.albums.search_albums(query)?,
            playlists: self.playlists.search_public_playlists(query)?,
        })
    }
}
