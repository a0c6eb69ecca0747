use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use super::error::{StoreError, StoreResult};
use super::models::{NewUser, User};
use super::sqlite_store::{io_err, is_constraint_violation, SqliteMusicStore};
use super::trait_def::UserStore;

const USER_COLUMNS: &str =
    "userID, firstName, lastName, userName, password, registrationDate, subscriptionEndDate";

fn epoch_to_datetime(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::UNIX_EPOCH)
}

fn parse_user(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        user_id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        user_name: row.get(3)?,
        password: row.get(4)?,
        registration_date: epoch_to_datetime(row.get(5)?),
        subscription_end_date: row.get::<_, Option<i64>>(6)?.map(epoch_to_datetime),
    })
}

impl UserStore for SqliteMusicStore {
    fn create_user(&self, user: &NewUser) -> StoreResult<i64> {
        if user.user_name.trim().is_empty() {
            return Err(StoreError::InvalidArgument(
                "user name must not be blank".to_string(),
            ));
        }
        if user.password.is_empty() {
            return Err(StoreError::InvalidArgument(
                "password hash must not be empty".to_string(),
            ));
        }
        let conn = self.write_conn.lock().unwrap();
        let result = conn.execute(
            "INSERT INTO Users (firstName, lastName, userName, password, subscriptionEndDate)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user.first_name,
                user.last_name,
                user.user_name,
                user.password,
                user.subscription_end_date.map(|d| d.timestamp()),
            ],
        );
        match result {
            Ok(_) => Ok(conn.last_insert_rowid()),
            Err(e) if is_constraint_violation(&e) => Err(StoreError::InvalidArgument(format!(
                "user name '{}' is already taken",
                user.user_name
            ))),
            Err(e) => Err(io_err("create_user", &user.user_name, e)),
        }
    }

    fn get_user(&self, user_id: i64) -> StoreResult<Option<User>> {
        let conn = self.read_conn();
        let conn = conn.lock().unwrap();
        let mut stmt = conn
            .prepare_cached(&format!(
                "SELECT {USER_COLUMNS} FROM Users WHERE userID = ?1"
            ))
            .map_err(|e| io_err("get_user", user_id, e))?;
        match stmt.query_row(params![user_id], parse_user) {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(io_err("get_user", user_id, e)),
        }
    }

    fn user_by_name(&self, user_name: &str) -> StoreResult<Option<User>> {
        let conn = self.read_conn();
        let conn = conn.lock().unwrap();
        let mut stmt = conn
            .prepare_cached(&format!(
                "SELECT {USER_COLUMNS} FROM Users WHERE userName = ?1"
            ))
            .map_err(|e| io_err("user_by_name", user_name, e))?;
        match stmt.query_row(params![user_name], parse_user) {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(io_err("user_by_name", user_name, e)),
        }
    }

    fn delete_user(&self, user_id: i64) -> StoreResult<bool> {
        let conn = self.write_conn.lock().unwrap();
        let deleted = conn
            .execute("DELETE FROM Users WHERE userID = ?1", params![user_id])
            .map_err(|e| io_err("delete_user", user_id, e))?;
        Ok(deleted > 0)
    }

    fn subscription_end_date(&self, user_id: i64) -> StoreResult<Option<DateTime<Utc>>> {
        let conn = self.read_conn();
        let conn = conn.lock().unwrap();
        match conn.query_row(
            "SELECT subscriptionEndDate FROM Users WHERE userID = ?1",
            params![user_id],
            |row| row.get::<_, Option<i64>>(0),
        ) {
            Ok(secs) => Ok(secs.map(epoch_to_datetime)),
            // missing user reads the same as "never subscribed"
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(io_err("subscription_end_date", user_id, e)),
        }
    }

    fn set_subscription_end_date(
        &self,
        user_id: i64,
        end_date: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let conn = self.write_conn.lock().unwrap();
        let updated = conn
            .execute(
                "UPDATE Users SET subscriptionEndDate = ?2 WHERE userID = ?1",
                params![user_id, end_date.timestamp()],
            )
            .map_err(|e| io_err("set_subscription_end_date", user_id, e))?;
        Ok(updated > 0)
    }
}
