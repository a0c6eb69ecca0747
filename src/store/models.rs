use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::error::StoreError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub artist_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    pub album_id: i64,
    pub title: String,
    pub artist_id: i64,
    pub release_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub song_id: i64,
    pub title: String,
    pub album_id: i64,
    pub artist_id: i64,
    /// Duration in seconds.
    pub length: i64,
    pub rating_count: i64,
    pub average_rating: f64,
    pub ratings_sum: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub playlist_id: i64,
    pub user_id: i64,
    pub name: String,
    pub is_public: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    pub rating_id: i64,
    pub user_id: i64,
    /// Populated when the rated entity is a song, NULL otherwise.
    pub song_id: Option<i64>,
    pub rating_value: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub user_name: String,
    /// Hash produced by the auth layer, stored opaquely.
    #[serde(skip_serializing)]
    pub password: String,
    pub registration_date: DateTime<Utc>,
    pub subscription_end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewAlbum {
    pub title: String,
    pub artist_id: i64,
    pub release_date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct NewSong {
    pub title: String,
    pub album_id: i64,
    pub artist_id: i64,
    pub length: i64,
}

#[derive(Debug, Clone)]
pub struct NewPlaylist {
    pub user_id: i64,
    pub name: String,
    pub is_public: bool,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub user_name: String,
    pub password: String,
    pub subscription_end_date: Option<DateTime<Utc>>,
}

/// The four kinds of entity a rating can target. Each maps to its key column
/// in the Ratings table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatedEntityType {
    Song,
    Playlist,
    Artist,
    Album,
}

impl RatedEntityType {
    pub fn key_column(&self) -> &'static str {
        match self {
            RatedEntityType::Song => "songID",
            RatedEntityType::Playlist => "playlistID",
            RatedEntityType::Artist => "artistID",
            RatedEntityType::Album => "albumID",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RatedEntityType::Song => "song",
            RatedEntityType::Playlist => "playlist",
            RatedEntityType::Artist => "artist",
            RatedEntityType::Album => "album",
        }
    }
}

impl fmt::Display for RatedEntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RatedEntityType {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "song" => Ok(RatedEntityType::Song),
            "playlist" => Ok(RatedEntityType::Playlist),
            "artist" => Ok(RatedEntityType::Artist),
            "album" => Ok(RatedEntityType::Album),
            other => Err(StoreError::InvalidArgument(format!(
                "unknown ratable entity type '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_type_parses_known_names() {
        assert_eq!(
            "playlist".parse::<RatedEntityType>().unwrap(),
            RatedEntityType::Playlist
        );
        assert_eq!(RatedEntityType::Album.key_column(), "albumID");
    }

    #[test]
    fn entity_type_rejects_unknown_names() {
        let err = "podcast".parse::<RatedEntityType>().unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument(_)));
    }

    #[test]
    fn user_serialization_skips_password() {
        let user = User {
            user_id: 1,
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            user_name: "ada".into(),
            password: "secret-hash".into(),
            registration_date: DateTime::UNIX_EPOCH,
            subscription_end_date: None,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
    }
}
