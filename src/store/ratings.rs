use rusqlite::{params, Connection, Row};

use super::error::StoreResult;
use super::models::{RatedEntityType, Rating};
use super::sqlite_store::{io_err, is_constraint_violation, SqliteMusicStore};
use super::trait_def::RatingStore;

fn parse_rating(row: &Row) -> rusqlite::Result<Rating> {
    Ok(Rating {
        rating_id: row.get(0)?,
        user_id: row.get(1)?,
        song_id: row.get(2)?,
        rating_value: row.get(3)?,
    })
}

/// Rebuild the denormalized aggregates on a song row from its rating rows.
/// Must run inside the same transaction as the rating write so readers never
/// see the two out of sync.
fn recompute_song_aggregates(conn: &Connection, song_id: i64) -> rusqlite::Result<()> {
    let (count, sum): (i64, i64) = conn.query_row(
        "SELECT COUNT(ratingValue), COALESCE(SUM(ratingValue), 0)
         FROM Ratings WHERE songID = ?1",
        params![song_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    let average = if count > 0 {
        sum as f64 / count as f64
    } else {
        0.0
    };
    conn.execute(
        "UPDATE Songs SET ratingCount = ?2, ratingsSum = ?3, averageRating = ?4
         WHERE songID = ?1",
        params![song_id, count, sum, average],
    )?;
    Ok(())
}

impl RatingStore for SqliteMusicStore {
    fn add_or_update_rating(
        &self,
        entity: RatedEntityType,
        entity_id: i64,
        user_id: i64,
        value: i64,
    ) -> StoreResult<bool> {
        let column = entity.key_column();
        let detail = format!("entity={entity} entityID={entity_id} userID={user_id}");

        let mut conn = self.write_conn.lock().unwrap();
        let tx = conn
            .transaction()
            .map_err(|e| io_err("add_or_update_rating", &detail, e))?;

        let existing: Option<i64> = match tx.query_row(
            &format!("SELECT ratingID FROM Ratings WHERE userID = ?1 AND {column} = ?2"),
            params![user_id, entity_id],
            |row| row.get(0),
        ) {
            Ok(rating_id) => Some(rating_id),
            Err(rusqlite::Error::QueryReturnedNoRows) => None,
            Err(e) => return Err(io_err("add_or_update_rating", &detail, e)),
        };

        match existing {
            Some(rating_id) => {
                tx.execute(
                    "UPDATE Ratings SET ratingValue = ?2 WHERE ratingID = ?1",
                    params![rating_id, value],
                )
                .map_err(|e| io_err("add_or_update_rating", &detail, e))?;
            }
            None => {
                let inserted = tx.execute(
                    &format!(
                        "INSERT INTO Ratings (userID, {column}, ratingValue) VALUES (?1, ?2, ?3)"
                    ),
                    params![user_id, entity_id, value],
                );
                match inserted {
                    Ok(_) => {}
                    // dangling entity or user id, the rating has nothing to attach to
                    Err(e) if is_constraint_violation(&e) => return Ok(false),
                    Err(e) => return Err(io_err("add_or_update_rating", &detail, e)),
                }
            }
        }

        if entity == RatedEntityType::Song {
            recompute_song_aggregates(&tx, entity_id).map_err(|e| io_err("add_or_update_rating", &detail, e))?;
        }
        tx.commit().map_err(|e| io_err("add_or_update_rating", &detail, e))?;
        Ok(true)
    }

    fn delete_rating(&self, rating_id: i64) -> StoreResult<bool> {
        let mut conn = self.write_conn.lock().unwrap();
        let tx = conn
            .transaction()
            .map_err(|e| io_err("delete_rating", rating_id, e))?;

        let song_id: Option<i64> = match tx.query_row(
            "SELECT songID FROM Ratings WHERE ratingID = ?1",
            params![rating_id],
            |row| row.get(0),
        ) {
            Ok(song_id) => song_id,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(false),
            Err(e) => return Err(io_err("delete_rating", rating_id, e)),
        };

        tx.execute("DELETE FROM Ratings WHERE ratingID = ?1", params![rating_id])
            .map_err(|e| io_err("delete_rating", rating_id, e))?;
        if let Some(song_id) = song_id {
            recompute_song_aggregates(&tx, song_id)
                .map_err(|e| io_err("delete_rating", rating_id, e))?;
        }
        tx.commit()
            .map_err(|e| io_err("delete_rating", rating_id, e))?;
        Ok(true)
    }

    fn ratings_by_user(&self, user_id: i64) -> StoreResult<Vec<Rating>> {
        let conn = self.read_conn();
        let conn = conn.lock().unwrap();
        let mut stmt = conn
            .prepare_cached(
                "SELECT ratingID, userID, songID, ratingValue FROM Ratings
                 WHERE userID = ?1 ORDER BY ratingID",
            )
            .map_err(|e| io_err("ratings_by_user", user_id, e))?;
        let ratings = stmt
            .query_map(params![user_id], parse_rating)
            .and_then(Iterator::collect)
            .map_err(|e| io_err("ratings_by_user", user_id, e))?;
        Ok(ratings)
    }

    fn ratings_by_song(&self, song_id: i64) -> StoreResult<Vec<Rating>> {
        let conn = self.read_conn();
        let conn = conn.lock().unwrap();
        let mut stmt = conn
            .prepare_cached(
                "SELECT ratingID, userID, songID, ratingValue FROM Ratings
                 WHERE songID = ?1 ORDER BY ratingID",
            )
            .map_err(|e| io_err("ratings_by_song", song_id, e))?;
        let ratings = stmt
            .query_map(params![song_id], parse_rating)
            .and_then(Iterator::collect)
            .map_err(|e| io_err("ratings_by_song", song_id, e))?;
        Ok(ratings)
    }

    fn get_rating(&self, user_id: i64, song_id: i64) -> StoreResult<Option<Rating>> {
        let conn = self.read_conn();
        let conn = conn.lock().unwrap();
        let mut stmt = conn
            .prepare_cached(
                "SELECT ratingID, userID, songID, ratingValue FROM Ratings
                 WHERE userID = ?1 AND songID = ?2",
            )
            .map_err(|e| io_err("get_rating", format!("userID={user_id} songID={song_id}"), e))?;
        match stmt.query_row(params![user_id, song_id], parse_rating) {
            Ok(rating) => Ok(Some(rating)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(io_err(
                "get_rating",
                format!("userID={user_id} songID={song_id}"),
                e,
            )),
        }
    }

    fn user_rating_for(
        &self,
        entity: RatedEntityType,
        entity_id: i64,
        user_id: i64,
    ) -> StoreResult<Option<i64>> {
        let column = entity.key_column();
        let conn = self.read_conn();
        let conn = conn.lock().unwrap();
        match conn.query_row(
            &format!("SELECT ratingValue FROM Ratings WHERE userID = ?1 AND {column} = ?2"),
            params![user_id, entity_id],
            |row| row.get(0),
        ) {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(io_err(
                "user_rating_for",
                format!("entity={entity} entityID={entity_id} userID={user_id}"),
                e,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::models::{NewAlbum, NewPlaylist, NewSong, NewUser};
    use super::super::sqlite_store::test_support::create_tmp_store;
    use super::super::trait_def::{
        AlbumStore, ArtistStore, PlaylistStore, SongStore, UserStore,
    };
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
    fn song_ratings_update_aggregates() {
        let (_tmp, store) = create_tmp_store();
        let alice = seed_user(&store, "alice");
        let bob = seed_user(&store, "bob");
        let song_id = seed_song(&store, "Hysteria");

        assert!(store.add_or_update_rating(RatedEntityType::Song, song_id, alice, 4).unwrap());
        assert!(store.add_or_update_rating(RatedEntityType::Song, song_id, bob, 5).unwrap());

        let song = store.get_song(song_id).unwrap().unwrap();
        assert_eq!(song.rating_count, 2);
        assert_eq!(song.ratings_sum, 9);
        assert_eq!(song.average_rating, 4.5);
    }

    #[test]
    fn rerating_overwrites_instead_of_duplicating() {
        let (_tmp, store) = create_tmp_store();
        let alice = seed_user(&store, "alice");
        let song_id = seed_song(&store, "Hysteria");

        store.add_or_update_rating(RatedEntityType::Song, song_id, alice, 2).unwrap();
        store.add_or_update_rating(RatedEntityType::Song, song_id, alice, 5).unwrap();

        let song = store.get_song(song_id).unwrap().unwrap();
        assert_eq!(song.rating_count, 1);
        assert_eq!(song.ratings_sum, 5);
        assert_eq!(song.average_rating, 5.0);
        assert_eq!(
            store
                .user_rating_for(RatedEntityType::Song, song_id, alice)
                .unwrap(),
            Some(5)
        );
    }

    #[test]
    fn deleting_a_rating_recomputes_aggregates() {
        let (_tmp, store) = create_tmp_store();
        let alice = seed_user(&store, "alice");
        let bob = seed_user(&store, "bob");
        let song_id = seed_song(&store, "Hysteria");

        store.add_or_update_rating(RatedEntityType::Song, song_id, alice, 4).unwrap();
        store.add_or_update_rating(RatedEntityType::Song, song_id, bob, 5).unwrap();

        let ratings = store.ratings_by_user(alice).unwrap();
        assert_eq!(ratings.len(), 1);
        assert!(store.delete_rating(ratings[0].rating_id).unwrap());

        let song = store.get_song(song_id).unwrap().unwrap();
        assert_eq!(song.rating_count, 1);
        assert_eq!(song.ratings_sum, 5);
        assert_eq!(song.average_rating, 5.0);

        assert!(!store.delete_rating(ratings[0].rating_id).unwrap());
    }

    #[test]
    fn playlist_ratings_leave_song_aggregates_alone() {
        let (_tmp, store) = create_tmp_store();
        let alice = seed_user(&store, "alice");
        let song_id = seed_song(&store, "Hysteria");
        let playlist_id = store
            .create_playlist(&NewPlaylist {
                user_id: alice,
                name: "Road Trip".into(),
                is_public: true,
            })
            .unwrap();

        assert!(store
            .add_or_update_rating(RatedEntityType::Playlist, playlist_id, alice, 5)
            .unwrap());

        let song = store.get_song(song_id).unwrap().unwrap();
        assert_eq!(song.rating_count, 0);
        assert_eq!(
            store
                .user_rating_for(RatedEntityType::Playlist, playlist_id, alice)
                .unwrap(),
            Some(5)
        );
    }

    #[test]
    fn same_user_can_rate_one_entity_of_each_kind() {
        let (_tmp, store) = create_tmp_store();
        let alice = seed_user(&store, "alice");
        let song_id = seed_song(&store, "Hysteria");
        let song = store.get_song(song_id).unwrap().unwrap();

        assert!(store.add_or_update_rating(RatedEntityType::Song, song_id, alice, 3).unwrap());
        assert!(store
            .add_or_update_rating(RatedEntityType::Artist, song.artist_id, alice, 4)
            .unwrap());
        assert!(store
            .add_or_update_rating(RatedEntityType::Album, song.album_id, alice, 5)
            .unwrap());

        assert_eq!(
            store
                .user_rating_for(RatedEntityType::Artist, song.artist_id, alice)
                .unwrap(),
            Some(4)
        );
    }

    #[test]
    fn ratings_are_listed_per_song_and_per_pair() {
        let (_tmp, store) = create_tmp_store();
        let alice = seed_user(&store, "alice");
        let bob = seed_user(&store, "bob");
        let song_id = seed_song(&store, "Hysteria");

        store.add_or_update_rating(RatedEntityType::Song, song_id, alice, 4).unwrap();
        store.add_or_update_rating(RatedEntityType::Song, song_id, bob, 5).unwrap();

        let by_song = store.ratings_by_song(song_id).unwrap();
        assert_eq!(by_song.len(), 2);
        assert_eq!(by_song[0].user_id, alice);

        let pair = store.get_rating(bob, song_id).unwrap().unwrap();
        assert_eq!(pair.rating_value, 5);
        assert_eq!(pair.song_id, Some(song_id));
        assert!(store.get_rating(alice, 999).unwrap().is_none());
    }

    #[test]
    fn rating_a_missing_entity_reports_false() {
        let (_tmp, store) = create_tmp_store();
        let alice = seed_user(&store, "alice");

        assert!(!store.add_or_update_rating(RatedEntityType::Song, 999, alice, 5).unwrap());
    }

    #[test]
    fn deleting_a_song_cascades_its_ratings() {
        let (_tmp, store) = create_tmp_store();
        let alice = seed_user(&store, "alice");
        let song_id = seed_song(&store, "Hysteria");

        store.add_or_update_rating(RatedEntityType::Song, song_id, alice, 4).unwrap();
        store.delete_song(song_id).unwrap();

        assert!(store.ratings_by_user(alice).unwrap().is_empty());
    }
}
