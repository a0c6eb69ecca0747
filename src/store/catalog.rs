use rusqlite::{params, types::Type, Row};

use super::error::{StoreError, StoreResult};
use super::models::{Album, Artist, NewAlbum, NewSong, Song};
use super::sqlite_store::{io_err, SqliteMusicStore};
use super::trait_def::{AlbumStore, ArtistStore, SongStore};

const SONG_COLUMNS: &str =
    "songID, title, albumID, artistID, length, ratingCount, averageRating, ratingsSum";

impl SqliteMusicStore {
    fn parse_artist(row: &Row) -> rusqlite::Result<Artist> {
        Ok(Artist {
            artist_id: row.get(0)?,
            name: row.get(1)?,
        })
    }

    fn parse_album(row: &Row) -> rusqlite::Result<Album> {
        let raw_date: String = row.get(3)?;
        let release_date = raw_date
            .parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;
        Ok(Album {
            album_id: row.get(0)?,
            title: row.get(1)?,
            artist_id: row.get(2)?,
            release_date,
        })
    }

    pub(super) fn parse_song(row: &Row) -> rusqlite::Result<Song> {
        Ok(Song {
            song_id: row.get(0)?,
            title: row.get(1)?,
            album_id: row.get(2)?,
            artist_id: row.get(3)?,
            length: row.get(4)?,
            rating_count: row.get(5)?,
            average_rating: row.get(6)?,
            ratings_sum: row.get(7)?,
        })
    }
}

/// LIKE pattern for a case-insensitive substring match, or None when the
/// query is blank. Blank searches return nothing rather than everything.
pub(super) fn like_pattern(query: &str) -> Option<String> {
    let term = query.trim();
    if term.is_empty() {
        None
    } else {
        Some(format!("%{}%", term))
    }
}

impl ArtistStore for SqliteMusicStore {
    fn get_artist(&self, artist_id: i64) -> StoreResult<Option<Artist>> {
        let conn = self.read_conn();
        let conn = conn.lock().unwrap();
        let mut stmt = conn
            .prepare_cached("SELECT artistID, name FROM Artists WHERE artistID = ?1")
            .map_err(|e| io_err("get_artist", artist_id, e))?;
        match stmt.query_row(params![artist_id], Self::parse_artist) {
            Ok(artist) => Ok(Some(artist)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(io_err("get_artist", artist_id, e)),
        }
    }

    fn artist_by_name(&self, name: &str) -> StoreResult<Option<Artist>> {
        let conn = self.read_conn();
        let conn = conn.lock().unwrap();
        let mut stmt = conn
            .prepare_cached(
                "SELECT artistID, name FROM Artists WHERE name = ?1 ORDER BY artistID LIMIT 1",
            )
            .map_err(|e| io_err("artist_by_name", name, e))?;
        match stmt.query_row(params![name], Self::parse_artist) {
            Ok(artist) => Ok(Some(artist)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(io_err("artist_by_name", name, e)),
        }
    }

    fn all_artists(&self) -> StoreResult<Vec<Artist>> {
        let conn = self.read_conn();
        let conn = conn.lock().unwrap();
        let mut stmt = conn
            .prepare_cached("SELECT artistID, name FROM Artists ORDER BY artistID")
            .map_err(|e| io_err("all_artists", "", e))?;
        let artists = stmt
            .query_map([], Self::parse_artist)
            .and_then(Iterator::collect)
            .map_err(|e| io_err("all_artists", "", e))?;
        Ok(artists)
    }

    fn search_artists(&self, query: &str) -> StoreResult<Vec<Artist>> {
        let Some(pattern) = like_pattern(query) else {
            return Ok(Vec::new());
        };
        let conn = self.read_conn();
        let conn = conn.lock().unwrap();
        let mut stmt = conn
            .prepare_cached(
                "SELECT artistID, name FROM Artists WHERE name LIKE ?1 ORDER BY artistID",
            )
            .map_err(|e| io_err("search_artists", query, e))?;
        let artists = stmt
            .query_map(params![pattern], Self::parse_artist)
            .and_then(Iterator::collect)
            .map_err(|e| io_err("search_artists", query, e))?;
        Ok(artists)
    }

    fn create_artist(&self, name: &str) -> StoreResult<i64> {
        if name.trim().is_empty() {
            return Err(StoreError::InvalidArgument(
                "artist name must not be blank".to_string(),
            ));
        }
        let conn = self.write_conn.lock().unwrap();
        conn.execute("INSERT INTO Artists (name) VALUES (?1)", params![name])
            .map_err(|e| io_err("create_artist", name, e))?;
        Ok(conn.last_insert_rowid())
    }

    fn delete_artist(&self, artist_id: i64) -> StoreResult<bool> {
        let conn = self.write_conn.lock().unwrap();
        let deleted = conn
            .execute("DELETE FROM Artists WHERE artistID = ?1", params![artist_id])
            .map_err(|e| io_err("delete_artist", artist_id, e))?;
        Ok(deleted > 0)
    }
}

impl AlbumStore for SqliteMusicStore {
    fn get_album(&self, album_id: i64) -> StoreResult<Option<Album>> {
        let conn = self.read_conn();
        let conn = conn.lock().unwrap();
        let mut stmt = conn
            .prepare_cached(
                "SELECT albumID, title, artistID, releaseDate FROM Albums WHERE albumID = ?1",
            )
            .map_err(|e| io_err("get_album", album_id, e))?;
        match stmt.query_row(params![album_id], Self::parse_album) {
            Ok(album) => Ok(Some(album)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(io_err("get_album", album_id, e)),
        }
    }

    fn album_by_title(&self, title: &str) -> StoreResult<Option<Album>> {
        let conn = self.read_conn();
        let conn = conn.lock().unwrap();
        let mut stmt = conn
            .prepare_cached(
                "SELECT albumID, title, artistID, releaseDate FROM Albums
                 WHERE title = ?1 ORDER BY albumID LIMIT 1",
            )
            .map_err(|e| io_err("album_by_title", title, e))?;
        match stmt.query_row(params![title], Self::parse_album) {
            Ok(album) => Ok(Some(album)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(io_err("album_by_title", title, e)),
        }
    }

    fn albums_by_artist(&self, artist_id: i64) -> StoreResult<Vec<Album>> {
        let conn = self.read_conn();
        let conn = conn.lock().unwrap();
        let mut stmt = conn
            .prepare_cached(
                "SELECT albumID, title, artistID, releaseDate FROM Albums
                 WHERE artistID = ?1 ORDER BY albumID",
            )
            .map_err(|e| io_err("albums_by_artist", artist_id, e))?;
        let albums = stmt
            .query_map(params![artist_id], Self::parse_album)
            .and_then(Iterator::collect)
            .map_err(|e| io_err("albums_by_artist", artist_id, e))?;
        Ok(albums)
    }

    fn search_albums(&self, query: &str) -> StoreResult<Vec<Album>> {
        let Some(pattern) = like_pattern(query) else {
            return Ok(Vec::new());
        };
        let conn = self.read_conn();
        let conn = conn.lock().unwrap();
        let mut stmt = conn
            .prepare_cached(
                "SELECT albumID, title, artistID, releaseDate FROM Albums
                 WHERE title LIKE ?1 ORDER BY albumID",
            )
            .map_err(|e| io_err("search_albums", query, e))?;
        let albums = stmt
            .query_map(params![pattern], Self::parse_album)
            .and_then(Iterator::collect)
            .map_err(|e| io_err("search_albums", query, e))?;
        Ok(albums)
    }

    fn create_album(&self, album: &NewAlbum) -> StoreResult<i64> {
        if album.title.trim().is_empty() {
            return Err(StoreError::InvalidArgument(
                "album title must not be blank".to_string(),
            ));
        }
        let conn = self.write_conn.lock().unwrap();
        conn.execute(
            "INSERT INTO Albums (title, artistID, releaseDate) VALUES (?1, ?2, ?3)",
            params![album.title, album.artist_id, album.release_date.to_string()],
        )
        .map_err(|e| io_err("create_album", &album.title, e))?;
        Ok(conn.last_insert_rowid())
    }

    fn delete_album(&self, album_id: i64) -> StoreResult<bool> {
        let conn = self.write_conn.lock().unwrap();
        let deleted = conn
            .execute("DELETE FROM Albums WHERE albumID = ?1", params![album_id])
            .map_err(|e| io_err("delete_album", album_id, e))?;
        Ok(deleted > 0)
    }
}

impl SongStore for SqliteMusicStore {
    fn get_song(&self, song_id: i64) -> StoreResult<Option<Song>> {
        let conn = self.read_conn();
        let conn = conn.lock().unwrap();
        let mut stmt = conn
            .prepare_cached(&format!(
                "SELECT {SONG_COLUMNS} FROM Songs WHERE songID = ?1"
            ))
            .map_err(|e| io_err("get_song", song_id, e))?;
        match stmt.query_row(params![song_id], Self::parse_song) {
            Ok(song) => Ok(Some(song)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(io_err("get_song", song_id, e)),
        }
    }

    fn song_by_title(&self, title: &str) -> StoreResult<Option<Song>> {
        let conn = self.read_conn();
        let conn = conn.lock().unwrap();
        let mut stmt = conn
            .prepare_cached(&format!(
                "SELECT {SONG_COLUMNS} FROM Songs WHERE title = ?1 ORDER BY songID LIMIT 1"
            ))
            .map_err(|e| io_err("song_by_title", title, e))?;
        match stmt.query_row(params![title], Self::parse_song) {
            Ok(song) => Ok(Some(song)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(io_err("song_by_title", title, e)),
        }
    }

    fn all_songs(&self, limit: Option<usize>) -> StoreResult<Vec<Song>> {
        // LIMIT -1 means unbounded in sqlite
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let conn = self.read_conn();
        let conn = conn.lock().unwrap();
        let mut stmt = conn
            .prepare_cached(&format!(
                "SELECT {SONG_COLUMNS} FROM Songs ORDER BY songID LIMIT ?1"
            ))
            .map_err(|e| io_err("all_songs", limit, e))?;
        let songs = stmt
            .query_map(params![limit], Self::parse_song)
            .and_then(Iterator::collect)
            .map_err(|e| io_err("all_songs", limit, e))?;
        Ok(songs)
    }

    fn songs_by_album(&self, album_id: i64) -> StoreResult<Vec<Song>> {
        let conn = self.read_conn();
        let conn = conn.lock().unwrap();
        let mut stmt = conn
            .prepare_cached(&format!(
                "SELECT {SONG_COLUMNS} FROM Songs WHERE albumID = ?1 ORDER BY songID"
            ))
            .map_err(|e| io_err("songs_by_album", album_id, e))?;
        let songs = stmt
            .query_map(params![album_id], Self::parse_song)
            .and_then(Iterator::collect)
            .map_err(|e| io_err("songs_by_album", album_id, e))?;
        Ok(songs)
    }

    fn songs_by_artist(&self, artist_id: i64) -> StoreResult<Vec<Song>> {
        let conn = self.read_conn();
        let conn = conn.lock().unwrap();
        let mut stmt = conn
            .prepare_cached(&format!(
                "SELECT {SONG_COLUMNS} FROM Songs WHERE artistID = ?1 ORDER BY songID"
            ))
            .map_err(|e| io_err("songs_by_artist", artist_id, e))?;
        let songs = stmt
            .query_map(params![artist_id], Self::parse_song)
            .and_then(Iterator::collect)
            .map_err(|e| io_err("songs_by_artist", artist_id, e))?;
        Ok(songs)
    }

    fn search_songs(&self, query: &str) -> StoreResult<Vec<Song>> {
        let Some(pattern) = like_pattern(query) else {
            return Ok(Vec::new());
        };
        let conn = self.read_conn();
        let conn = conn.lock().unwrap();
        let mut stmt = conn
            .prepare_cached(&format!(
                "SELECT {SONG_COLUMNS} FROM Songs WHERE title LIKE ?1 ORDER BY songID"
            ))
            .map_err(|e| io_err("search_songs", query, e))?;
        let songs = stmt
            .query_map(params![pattern], Self::parse_song)
            .and_then(Iterator::collect)
            .map_err(|e| io_err("search_songs", query, e))?;
        Ok(songs)
    }

    fn create_song(&self, song: &NewSong) -> StoreResult<i64> {
        if song.title.trim().is_empty() {
            return Err(StoreError::InvalidArgument(
                "song title must not be blank".to_string(),
            ));
        }
        if song.length < 0 {
            return Err(StoreError::InvalidArgument(format!(
                "song length must not be negative, got {}",
                song.length
            )));
        }
        let conn = self.write_conn.lock().unwrap();
        conn.execute(
            "INSERT INTO Songs (title, albumID, artistID, length) VALUES (?1, ?2, ?3, ?4)",
            params![song.title, song.album_id, song.artist_id, song.length],
        )
        .map_err(|e| io_err("create_song", &song.title, e))?;
        Ok(conn.last_insert_rowid())
    }

    fn delete_song(&self, song_id: i64) -> StoreResult<bool> {
        let conn = self.write_conn.lock().unwrap();
        let deleted = conn
            .execute("DELETE FROM Songs WHERE songID = ?1", params![song_id])
            .map_err(|e| io_err("delete_song", song_id, e))?;
        Ok(deleted > 0)
    }

    fn top_rated_songs(&self, limit: usize) -> StoreResult<Vec<Song>> {
        let conn = self.read_conn();
        let conn = conn.lock().unwrap();
        let mut stmt = conn
            .prepare_cached(&format!(
                "SELECT {SONG_COLUMNS} FROM Songs WHERE ratingCount > 0
                 ORDER BY averageRating DESC, ratingCount DESC, songID LIMIT ?1"
            ))
            .map_err(|e| io_err("top_rated_songs", limit, e))?;
        let songs = stmt
            .query_map(params![limit as i64], Self::parse_song)
            .and_then(Iterator::collect)
            .map_err(|e| io_err("top_rated_songs", limit, e))?;
        Ok(songs)
    }
}

#[cfg(test)]
mod tests {
    use super::super::sqlite_store::test_support::create_tmp_store;
    use super::*;
    use chrono::NaiveDate;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn artist_create_get_delete() {
        let (_tmp, store) = create_tmp_store();
        let id = store.create_artist("Muse").unwrap();

        let artist = store.get_artist(id).unwrap().unwrap();
        assert_eq!(artist.name, "Muse");

        assert!(store.delete_artist(id).unwrap());
        assert!(store.get_artist(id).unwrap().is_none());
        assert!(!store.delete_artist(id).unwrap());
    }

    #[test]
    fn exact_name_lookups_do_not_substring_match() {
        let (_tmp, store) = create_tmp_store();
        let artist_id = store.create_artist("Muse").unwrap();
        store
            .create_album(&NewAlbum {
                title: "Absolution".into(),
                artist_id,
                release_date: date("2003-09-15"),
            })
            .unwrap();

        assert_eq!(
            store.artist_by_name("Muse").unwrap().unwrap().artist_id,
            artist_id
        );
        assert!(store.artist_by_name("Mus").unwrap().is_none());
        assert!(store.album_by_title("Absolution").unwrap().is_some());
        assert!(store.album_by_title("Absolut").unwrap().is_none());
        assert!(store.song_by_title("anything").unwrap().is_none());
    }

    #[test]
    fn blank_artist_name_is_rejected() {
        let (_tmp, store) = create_tmp_store();
        let err = store.create_artist("   ").unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument(_)));
    }

    #[test]
    fn all_artists_ordered_by_id() {
        let (_tmp, store) = create_tmp_store();
        store.create_artist("Zebra").unwrap();
        store.create_artist("Abba").unwrap();

        let names: Vec<String> = store
            .all_artists()
            .unwrap()
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, vec!["Zebra", "Abba"]);
    }

    #[test]
    fn artist_search_is_case_insensitive_substring() {
        let (_tmp, store) = create_tmp_store();
        store.create_artist("Radiohead").unwrap();
        store.create_artist("Portishead").unwrap();
        store.create_artist("Muse").unwrap();

        let hits = store.search_artists("HEAD").unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn blank_search_returns_nothing() {
        let (_tmp, store) = create_tmp_store();
        store.create_artist("Muse").unwrap();

        assert!(store.search_artists("").unwrap().is_empty());
        assert!(store.search_artists("   ").unwrap().is_empty());
    }

    #[test]
    fn album_round_trip_keeps_release_date() {
        let (_tmp, store) = create_tmp_store();
        let artist_id = store.create_artist("Muse").unwrap();
        let album_id = store
            .create_album(&NewAlbum {
                title: "Absolution".into(),
                artist_id,
                release_date: date("2003-09-15"),
            })
            .unwrap();

        let album = store.get_album(album_id).unwrap().unwrap();
        assert_eq!(album.title, "Absolution");
        assert_eq!(album.release_date, date("2003-09-15"));
    }

    #[test]
    fn albums_by_artist_only_lists_their_albums() {
        let (_tmp, store) = create_tmp_store();
        let muse = store.create_artist("Muse").unwrap();
        let abba = store.create_artist("Abba").unwrap();
        store
            .create_album(&NewAlbum {
                title: "Absolution".into(),
                artist_id: muse,
                release_date: date("2003-09-15"),
            })
            .unwrap();
        store
            .create_album(&NewAlbum {
                title: "Arrival".into(),
                artist_id: abba,
                release_date: date("1976-10-11"),
            })
            .unwrap();

        let albums = store.albums_by_artist(muse).unwrap();
        assert_eq!(albums.len(), 1);
        assert_eq!(albums[0].title, "Absolution");
    }

    #[test]
    fn deleting_artist_cascades_to_albums_and_songs() {
        let (_tmp, store) = create_tmp_store();
        let artist_id = store.create_artist("Muse").unwrap();
        let album_id = store
            .create_album(&NewAlbum {
                title: "Absolution".into(),
                artist_id,
                release_date: date("2003-09-15"),
            })
            .unwrap();
        let song_id = store
            .create_song(&NewSong {
                title: "Hysteria".into(),
                album_id,
                artist_id,
                length: 227,
            })
            .unwrap();

        assert!(store.delete_artist(artist_id).unwrap());
        assert!(store.get_album(album_id).unwrap().is_none());
        assert!(store.get_song(song_id).unwrap().is_none());
    }

    #[test]
    fn all_songs_lists_in_id_order_and_honors_the_cap() {
        let (_tmp, store) = create_tmp_store();
        let artist_id = store.create_artist("Muse").unwrap();
        let album_id = store
            .create_album(&NewAlbum {
                title: "Absolution".into(),
                artist_id,
                release_date: date("2003-09-15"),
            })
            .unwrap();
        for title in ["Apocalypse Please", "Time Is Running Out", "Hysteria"] {
            store
                .create_song(&NewSong {
                    title: title.into(),
                    album_id,
                    artist_id,
                    length: 240,
                })
                .unwrap();
        }

        let all = store.all_songs(None).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].title, "Apocalypse Please");

        let capped = store.all_songs(Some(2)).unwrap();
        assert_eq!(capped.len(), 2);
        assert_eq!(capped[1].title, "Time Is Running Out");
    }

    #[test]
    fn new_song_starts_with_zero_aggregates() {
        let (_tmp, store) = create_tmp_store();
        let artist_id = store.create_artist("Muse").unwrap();
        let album_id = store
            .create_album(&NewAlbum {
                title: "Absolution".into(),
                artist_id,
                release_date: date("2003-09-15"),
            })
            .unwrap();
        let song_id = store
            .create_song(&NewSong {
                title: "Hysteria".into(),
                album_id,
                artist_id,
                length: 227,
            })
            .unwrap();

        let song = store.get_song(song_id).unwrap().unwrap();
        assert_eq!(song.rating_count, 0);
        assert_eq!(song.average_rating, 0.0);
        assert_eq!(song.ratings_sum, 0);
    }

    #[test]
    fn negative_song_length_is_rejected() {
        let (_tmp, store) = create_tmp_store();
        let err = store
            .create_song(&NewSong {
                title: "Hysteria".into(),
                album_id: 1,
                artist_id: 1,
                length: -1,
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument(_)));
    }
}
