use rusqlite::{params, Row};

use super::catalog::like_pattern;
use super::error::{StoreError, StoreResult};
use super::models::{NewPlaylist, Playlist, Song};
use super::sqlite_store::{io_err, is_constraint_violation, SqliteMusicStore};
use super::trait_def::{PlaylistMembershipStore, PlaylistStore};

impl SqliteMusicStore {
    fn parse_playlist(row: &Row) -> rusqlite::Result<Playlist> {
        Ok(Playlist {
            playlist_id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            is_public: row.get::<_, i64>(3)? != 0,
        })
    }
}

impl PlaylistStore for SqliteMusicStore {
    fn get_playlist(&self, playlist_id: i64) -> StoreResult<Option<Playlist>> {
        let conn = self.read_conn();
        let conn = conn.lock().unwrap();
        let mut stmt = conn
            .prepare_cached(
                "SELECT playlistID, userID, name, isPublic FROM Playlists WHERE playlistID = ?1",
            )
            .map_err(|e| io_err("get_playlist", playlist_id, e))?;
        match stmt.query_row(params![playlist_id], Self::parse_playlist) {
            Ok(playlist) => Ok(Some(playlist)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(io_err("get_playlist", playlist_id, e)),
        }
    }

    fn playlist_by_name(&self, name: &str) -> StoreResult<Option<Playlist>> {
        let conn = self.read_conn();
        let conn = conn.lock().unwrap();
        let mut stmt = conn
            .prepare_cached(
                "SELECT playlistID, userID, name, isPublic FROM Playlists
                 WHERE name = ?1 ORDER BY playlistID LIMIT 1",
            )
            .map_err(|e| io_err("playlist_by_name", name, e))?;
        match stmt.query_row(params![name], Self::parse_playlist) {
            Ok(playlist) => Ok(Some(playlist)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(io_err("playlist_by_name", name, e)),
        }
    }

    fn playlists_by_user(&self, user_id: i64) -> StoreResult<Vec<Playlist>> {
        let conn = self.read_conn();
        let conn = conn.lock().unwrap();
        let mut stmt = conn
            .prepare_cached(
                "SELECT playlistID, userID, name, isPublic FROM Playlists
                 WHERE userID = ?1 ORDER BY playlistID",
            )
            .map_err(|e| io_err("playlists_by_user", user_id, e))?;
        let playlists = stmt
            .query_map(params![user_id], Self::parse_playlist)
            .and_then(Iterator::collect)
            .map_err(|e| io_err("playlists_by_user", user_id, e))?;
        Ok(playlists)
    }

    fn public_playlists(&self) -> StoreResult<Vec<Playlist>> {
        let conn = self.read_conn();
        let conn = conn.lock().unwrap();
        let mut stmt = conn
            .prepare_cached(
                "SELECT playlistID, userID, name, isPublic FROM Playlists
                 WHERE isPublic = 1 ORDER BY playlistID",
            )
            .map_err(|e| io_err("public_playlists", "", e))?;
        let playlists = stmt
            .query_map([], Self::parse_playlist)
            .and_then(Iterator::collect)
            .map_err(|e| io_err("public_playlists", "", e))?;
        Ok(playlists)
    }

    fn search_public_playlists(&self, query: &str) -> StoreResult<Vec<Playlist>> {
        let Some(pattern) = like_pattern(query) else {
            return Ok(Vec::new());
        };
        let conn = self.read_conn();
        let conn = conn.lock().unwrap();
        let mut stmt = conn
            .prepare_cached(
                "SELECT playlistID, userID, name, isPublic FROM Playlists
                 WHERE isPublic = 1 AND name LIKE ?1 ORDER BY playlistID",
            )
            .map_err(|e| io_err("search_public_playlists", query, e))?;
        let playlists = stmt
            .query_map(params![pattern], Self::parse_playlist)
            .and_then(Iterator::collect)
            .map_err(|e| io_err("search_public_playlists", query, e))?;
        Ok(playlists)
    }

    fn create_playlist(&self, playlist: &NewPlaylist) -> StoreResult<i64> {
        if playlist.name.trim().is_empty() {
            return Err(StoreError::InvalidArgument(
                "playlist name must not be blank".to_string(),
            ));
        }
        let conn = self.write_conn.lock().unwrap();
        conn.execute(
            "INSERT INTO Playlists (userID, name, isPublic) VALUES (?1, ?2, ?3)",
            params![playlist.user_id, playlist.name, playlist.is_public as i64],
        )
        .map_err(|e| io_err("create_playlist", &playlist.name, e))?;
        Ok(conn.last_insert_rowid())
    }

    fn rename_playlist(&self, playlist_id: i64, name: &str) -> StoreResult<bool> {
        if name.trim().is_empty() {
            return Err(StoreError::InvalidArgument(
                "playlist name must not be blank".to_string(),
            ));
        }
        let conn = self.write_conn.lock().unwrap();
        let updated = conn
            .execute(
                "UPDATE Playlists SET name = ?2 WHERE playlistID = ?1",
                params![playlist_id, name],
            )
            .map_err(|e| io_err("rename_playlist", playlist_id, e))?;
        Ok(updated > 0)
    }

    fn delete_playlist(&self, playlist_id: i64) -> StoreResult<bool> {
        let conn = self.write_conn.lock().unwrap();
        let deleted = conn
            .execute(
                "DELETE FROM Playlists WHERE playlistID = ?1",
                params![playlist_id],
            )
            .map_err(|e| io_err("delete_playlist", playlist_id, e))?;
        Ok(deleted > 0)
    }
}

impl PlaylistMembershipStore for SqliteMusicStore {
    fn add_song_to_playlist(&self, playlist_id: i64, song_id: i64) -> StoreResult<bool> {
        let conn = self.write_conn.lock().unwrap();
        let result = conn.execute(
            "INSERT INTO PlaylistSongs (playlistID, songID) VALUES (?1, ?2)",
            params![playlist_id, song_id],
        );
        match result {
            Ok(inserted) => Ok(inserted > 0),
            // duplicate pair or dangling playlist/song id
            Err(e) if is_constraint_violation(&e) => Ok(false),
            Err(e) => Err(io_err(
                "add_song_to_playlist",
                format!("playlistID={playlist_id} songID={song_id}"),
                e,
            )),
        }
    }

    fn remove_song_from_playlist(&self, playlist_id: i64, song_id: i64) -> StoreResult<bool> {
        let conn = self.write_conn.lock().unwrap();
        let deleted = conn
            .execute(
                "DELETE FROM PlaylistSongs WHERE playlistID = ?1 AND songID = ?2",
                params![playlist_id, song_id],
            )
            .map_err(|e| {
                io_err(
                    "remove_song_from_playlist",
                    format!("playlistID={playlist_id} songID={song_id}"),
                    e,
                )
            })?;
        Ok(deleted > 0)
    }

    fn songs_in_playlist(&self, playlist_id: i64) -> StoreResult<Vec<Song>> {
        let conn = self.read_conn();
        let conn = conn.lock().unwrap();
        let mut stmt = conn
            .prepare_cached(
                "SELECT s.songID, s.title, s.albumID, s.artistID, s.length,
                        s.ratingCount, s.averageRating, s.ratingsSum
                 FROM Songs s
                 JOIN PlaylistSongs ps ON ps.songID = s.songID
                 WHERE ps.playlistID = ?1
                 ORDER BY s.songID",
            )
            .map_err(|e| io_err("songs_in_playlist", playlist_id, e))?;
        let songs = stmt
            .query_map(params![playlist_id], Self::parse_song)
            .and_then(Iterator::collect)
            .map_err(|e| io_err("songs_in_playlist", playlist_id, e))?;
        Ok(songs)
    }

    fn song_in_playlist(&self, playlist_id: i64, song_id: i64) -> StoreResult<bool> {
        let conn = self.read_conn();
        let conn = conn.lock().unwrap();
        let mut stmt = conn
            .prepare_cached(
                "SELECT 1 FROM PlaylistSongs WHERE playlistID = ?1 AND songID = ?2",
            )
            .map_err(|e| io_err("song_in_playlist", playlist_id, e))?;
        match stmt.query_row(params![playlist_id, song_id], |_| Ok(())) {
            Ok(()) => Ok(true),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(false),
            Err(e) => Err(io_err("song_in_playlist", playlist_id, e)),
        }
    }

    fn song_in_any_playlist_of_user(&self, user_id: i64, song_id: i64) -> StoreResult<bool> {
        let conn = self.read_conn();
        let conn = conn.lock().unwrap();
        let mut stmt = conn
            .prepare_cached(
                "SELECT 1 FROM PlaylistSongs ps
                 JOIN Playlists p ON p.playlistID = ps.playlistID
                 WHERE p.userID = ?1 AND ps.songID = ?2
                 LIMIT 1",
            )
            .map_err(|e| io_err("song_in_any_playlist_of_user", user_id, e))?;
        match stmt.query_row(params![user_id, song_id], |_| Ok(())) {
            Ok(()) => Ok(true),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(false),
            Err(e) => Err(io_err("song_in_any_playlist_of_user", user_id, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::models::{NewAlbum, NewSong, NewUser};
    use super::super::sqlite_store::test_support::create_tmp_store;
    use super::super::trait_def::{AlbumStore, ArtistStore, SongStore, UserStore};
    use super::*;

    fn seed_user(store: &SqliteMusicStore, user_name: &str) -> i64 {
        store
            .create_user(&NewUser {
                first_name: "Test".into(),
                last_name: "User".into(),
                user_name: user_name.into(),
                password: "hash".into(),
                subscription_end_date: None,
            })
            .unwrap()
    }

    fn seed_song(store: &SqliteMusicStore, title: &str) -> i64 {
        let artist_id = store.create_artist(&format!("artist of {title}")).unwrap();
        let album_id = store
            .create_album(&NewAlbum {
                title: format!("album of {title}"),
                artist_id,
                release_date: "2020-01-01".parse().unwrap(),
            })
            .unwrap();
        store
            .create_song(&NewSong {
                title: title.into(),
                album_id,
                artist_id,
                length: 180,
            })
            .unwrap()
    }

    #[test]
    fn playlist_create_and_membership_flow() {
        let (_tmp, store) = create_tmp_store();
        let user_id = seed_user(&store, "alice");
        let song_a = seed_song(&store, "Highway Song");
        let song_b = seed_song(&store, "Backseat Ballad");

        let playlist_id = store
            .create_playlist(&NewPlaylist {
                user_id,
                name: "Road Trip".into(),
                is_public: true,
            })
            .unwrap();

        assert!(store.add_song_to_playlist(playlist_id, song_a).unwrap());
        assert!(store.add_song_to_playlist(playlist_id, song_b).unwrap());

        let titles: Vec<String> = store
            .songs_in_playlist(playlist_id)
            .unwrap()
            .into_iter()
            .map(|s| s.title)
            .collect();
        assert_eq!(titles, vec!["Highway Song", "Backseat Ballad"]);

        assert!(store.song_in_playlist(playlist_id, song_a).unwrap());
        assert!(store.remove_song_from_playlist(playlist_id, song_a).unwrap());
        assert!(!store.song_in_playlist(playlist_id, song_a).unwrap());
        assert!(!store.remove_song_from_playlist(playlist_id, song_a).unwrap());
    }

    #[test]
    fn duplicate_membership_reports_false() {
        let (_tmp, store) = create_tmp_store();
        let user_id = seed_user(&store, "alice");
        let song_id = seed_song(&store, "Highway Song");
        let playlist_id = store
            .create_playlist(&NewPlaylist {
                user_id,
                name: "Road Trip".into(),
                is_public: false,
            })
            .unwrap();

        assert!(store.add_song_to_playlist(playlist_id, song_id).unwrap());
        assert!(!store.add_song_to_playlist(playlist_id, song_id).unwrap());

        assert_eq!(store.songs_in_playlist(playlist_id).unwrap().len(), 1);
    }

    #[test]
    fn membership_with_missing_song_reports_false() {
        let (_tmp, store) = create_tmp_store();
        let user_id = seed_user(&store, "alice");
        let playlist_id = store
            .create_playlist(&NewPlaylist {
                user_id,
                name: "Road Trip".into(),
                is_public: false,
            })
            .unwrap();

        assert!(!store.add_song_to_playlist(playlist_id, 999).unwrap());
    }

    #[test]
    fn blank_playlist_name_is_rejected() {
        let (_tmp, store) = create_tmp_store();
        let user_id = seed_user(&store, "alice");
        let err = store
            .create_playlist(&NewPlaylist {
                user_id,
                name: "  ".into(),
                is_public: false,
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument(_)));
    }

    #[test]
    fn public_search_never_returns_private_playlists() {
        let (_tmp, store) = create_tmp_store();
        let user_id = seed_user(&store, "alice");
        store
            .create_playlist(&NewPlaylist {
                user_id,
                name: "Morning Mix".into(),
                is_public: true,
            })
            .unwrap();
        store
            .create_playlist(&NewPlaylist {
                user_id,
                name: "Secret Mix".into(),
                is_public: false,
            })
            .unwrap();

        let hits = store.search_public_playlists("mix").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Morning Mix");
    }

    #[test]
    fn song_in_any_playlist_of_user_spans_playlists() {
        let (_tmp, store) = create_tmp_store();
        let alice = seed_user(&store, "alice");
        let bob = seed_user(&store, "bob");
        let song_id = seed_song(&store, "Highway Song");

        let bob_list = store
            .create_playlist(&NewPlaylist {
                user_id: bob,
                name: "Bob's Mix".into(),
                is_public: false,
            })
            .unwrap();
        store.add_song_to_playlist(bob_list, song_id).unwrap();

        assert!(store.song_in_any_playlist_of_user(bob, song_id).unwrap());
        assert!(!store.song_in_any_playlist_of_user(alice, song_id).unwrap());
    }

    #[test]
    fn playlist_by_name_is_exact_and_first_match_wins() {
        let (_tmp, store) = create_tmp_store();
        let alice = seed_user(&store, "alice");
        let bob = seed_user(&store, "bob");
        let first = store
            .create_playlist(&NewPlaylist {
                user_id: alice,
                name: "Road Trip".into(),
                is_public: false,
            })
            .unwrap();
        store
            .create_playlist(&NewPlaylist {
                user_id: bob,
                name: "Road Trip".into(),
                is_public: true,
            })
            .unwrap();

        let hit = store.playlist_by_name("Road Trip").unwrap().unwrap();
        assert_eq!(hit.playlist_id, first);
        assert!(store.playlist_by_name("Road").unwrap().is_none());
    }

    #[test]
    fn rename_playlist_updates_name() {
        let (_tmp, store) = create_tmp_store();
        let user_id = seed_user(&store, "alice");
        let playlist_id = store
            .create_playlist(&NewPlaylist {
                user_id,
                name: "Road Trip".into(),
                is_public: false,
            })
            .unwrap();

        assert!(store.rename_playlist(playlist_id, "Road Trip 2").unwrap());
        assert_eq!(
            store.get_playlist(playlist_id).unwrap().unwrap().name,
            "Road Trip 2"
        );
        assert!(!store.rename_playlist(999, "nope").unwrap());
    }

    #[test]
    fn deleting_user_cascades_to_playlists() {
        let (_tmp, store) = create_tmp_store();
        let user_id = seed_user(&store, "alice");
        let playlist_id = store
            .create_playlist(&NewPlaylist {
                user_id,
                name: "Road Trip".into(),
                is_public: false,
            })
            .unwrap();

        assert!(store.delete_user(user_id).unwrap());
        assert!(store.get_playlist(playlist_id).unwrap().is_none());
    }
}
