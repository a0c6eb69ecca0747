//! SQLite schema for the music catalog database.
//!
//! Table and column names are the wire contract shared with the web layer and
//! with pre-existing databases, so they keep their original casing. Version 0
//! is that contract verbatim; version 1 widens the Ratings table so ratings
//! can target playlists, artists and albums, not just songs.

use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema, EPOCH_NOW_DEFAULT,
};

const ARTIST_FK: ForeignKey = ForeignKey {
    foreign_table: "Artists",
    foreign_column: "artistID",
    on_delete: ForeignKeyOnChange::Cascade,
};

const ALBUM_FK: ForeignKey = ForeignKey {
    foreign_table: "Albums",
    foreign_column: "albumID",
    on_delete: ForeignKeyOnChange::Cascade,
};

const SONG_FK: ForeignKey = ForeignKey {
    foreign_table: "Songs",
    foreign_column: "songID",
    on_delete: ForeignKeyOnChange::Cascade,
};

const USER_FK: ForeignKey = ForeignKey {
    foreign_table: "Users",
    foreign_column: "userID",
    on_delete: ForeignKeyOnChange::Cascade,
};

const PLAYLIST_FK: ForeignKey = ForeignKey {
    foreign_table: "Playlists",
    foreign_column: "playlistID",
    on_delete: ForeignKeyOnChange::Cascade,
};

const ARTISTS_TABLE: Table = Table {
    name: "Artists",
    columns: &[
        sqlite_column!("artistID", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_artists_name", "name")],
    unique_constraints: &[],
};

const ALBUMS_TABLE: Table = Table {
    name: "Albums",
    columns: &[
        sqlite_column!("albumID", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!(
            "artistID",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ARTIST_FK)
        ),
        // ISO date, e.g. 2003-11-18
        sqlite_column!("releaseDate", &SqlType::Text, non_null = true),
    ],
    indices: &[
        ("idx_albums_artist", "artistID"),
        ("idx_albums_title", "title"),
    ],
    unique_constraints: &[],
};

const SONGS_TABLE: Table = Table {
    name: "Songs",
    columns: &[
        sqlite_column!("songID", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!(
            "albumID",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ALBUM_FK)
        ),
        sqlite_column!(
            "artistID",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ARTIST_FK)
        ),
        // duration in seconds
        sqlite_column!("length", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "ratingCount",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "averageRating",
            &SqlType::Real,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "ratingsSum",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
    ],
    indices: &[
        ("idx_songs_album", "albumID"),
        ("idx_songs_artist", "artistID"),
        ("idx_songs_title", "title"),
    ],
    unique_constraints: &[],
};

const USERS_TABLE: Table = Table {
    name: "Users",
    columns: &[
        sqlite_column!("userID", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("firstName", &SqlType::Text, non_null = true),
        sqlite_column!("lastName", &SqlType::Text, non_null = true),
        sqlite_column!("userName", &SqlType::Text, non_null = true),
        // hash produced by the (external) auth layer, opaque here
        sqlite_column!("password", &SqlType::Text, non_null = true),
        sqlite_column!(
            "registrationDate",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(EPOCH_NOW_DEFAULT)
        ),
        // unix epoch seconds, NULL = never subscribed
        sqlite_column!("subscriptionEndDate", &SqlType::Integer),
    ],
    indices: &[("idx_users_username", "userName")],
    unique_constraints: &[&["userName"]],
};

const PLAYLISTS_TABLE: Table = Table {
    name: "Playlists",
    columns: &[
        sqlite_column!("playlistID", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "userID",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!(
            "isPublic",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
    ],
    indices: &[
        ("idx_playlists_user", "userID"),
        ("idx_playlists_name", "name"),
    ],
    unique_constraints: &[],
};

const PLAYLIST_SONGS_TABLE: Table = Table {
    name: "PlaylistSongs",
    columns: &[
        sqlite_column!(
            "playlistID",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&PLAYLIST_FK)
        ),
        sqlite_column!(
            "songID",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&SONG_FK)
        ),
    ],
    indices: &[("idx_playlistsongs_playlist", "playlistID")],
    unique_constraints: &[&["playlistID", "songID"]],
};

const RATINGS_TABLE_V0: Table = Table {
    name: "Ratings",
    columns: &[
        sqlite_column!("ratingID", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "userID",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("songID", &SqlType::Integer, foreign_key = Some(&SONG_FK)),
        sqlite_column!("ratingValue", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_ratings_song", "songID")],
    unique_constraints: &[&["userID", "songID"]],
};

/// V1: one nullable key column per ratable entity kind. A row populates
/// exactly one of songID / playlistID / artistID / albumID.
const RATINGS_TABLE_V1: Table = Table {
    name: "Ratings",
    columns: &[
        sqlite_column!("ratingID", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "userID",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("songID", &SqlType::Integer, foreign_key = Some(&SONG_FK)),
        sqlite_column!("ratingValue", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "playlistID",
            &SqlType::Integer,
            foreign_key = Some(&PLAYLIST_FK)
        ),
        sqlite_column!("artistID", &SqlType::Integer, foreign_key = Some(&ARTIST_FK)),
        sqlite_column!("albumID", &SqlType::Integer, foreign_key = Some(&ALBUM_FK)),
    ],
    indices: &[("idx_ratings_song", "songID")],
    unique_constraints: &[
        &["userID", "songID"],
        &["userID", "playlistID"],
        &["userID", "artistID"],
        &["userID", "albumID"],
    ],
};

pub const MUSIC_VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 0,
        tables: &[
            ARTISTS_TABLE,
            ALBUMS_TABLE,
            SONGS_TABLE,
            USERS_TABLE,
            PLAYLISTS_TABLE,
            PLAYLIST_SONGS_TABLE,
            RATINGS_TABLE_V0,
        ],
        migration: None,
    },
    VersionedSchema {
        version: 1,
        tables: &[
            ARTISTS_TABLE,
            ALBUMS_TABLE,
            SONGS_TABLE,
            USERS_TABLE,
            PLAYLISTS_TABLE,
            PLAYLIST_SONGS_TABLE,
            RATINGS_TABLE_V1,
        ],
        migration: Some(|conn| {
            // ADD COLUMN cannot carry a UNIQUE constraint, so the upsert keys
            // are enforced with unique indices instead.
            conn.execute(
                "ALTER TABLE Ratings ADD COLUMN playlistID INTEGER REFERENCES Playlists(playlistID) ON DELETE CASCADE",
                [],
            )?;
            conn.execute(
                "ALTER TABLE Ratings ADD COLUMN artistID INTEGER REFERENCES Artists(artistID) ON DELETE CASCADE",
                [],
            )?;
            conn.execute(
                "ALTER TABLE Ratings ADD COLUMN albumID INTEGER REFERENCES Albums(albumID) ON DELETE CASCADE",
                [],
            )?;
            conn.execute(
                "CREATE UNIQUE INDEX uq_ratings_user_playlist ON Ratings(userID, playlistID)",
                [],
            )?;
            conn.execute(
                "CREATE UNIQUE INDEX uq_ratings_user_artist ON Ratings(userID, artistID)",
                [],
            )?;
            conn.execute(
                "CREATE UNIQUE INDEX uq_ratings_user_album ON Ratings(userID, albumID)",
                [],
            )?;
            Ok(())
        }),
    },
];
