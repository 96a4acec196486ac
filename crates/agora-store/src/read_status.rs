//! Per-(room, user) read pointers. A pointer only ever moves forward, and
//! only to a sequence that exists in its room, so advancement is idempotent
//! and safe to repeat on every page fetch and every send.

use agora_types::{ChatError, RoomId, UserId};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::models::ReadStatusRow;
use crate::Database;

impl Database {
    /// Create or advance the caller's read pointer to `seq`. The guarded
    /// upsert is a single statement, so concurrent advances from overlapping
    /// page fetches converge to the maximum observed value and never
    /// regress. Returns whether the pointer actually moved.
    pub fn advance_read(
        &self,
        room: RoomId,
        user: UserId,
        seq: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, ChatError> {
        self.with_conn(|conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM direct_chat_messages WHERE room_id = ?1 AND seq = ?2)",
                params![room.0, seq],
                |r| r.get(0),
            )?;
            if !exists {
                return Err(ChatError::invalid_argument(format!(
                    "no message with seq {seq} in room {room}"
                )));
            }

            let advanced = conn.execute(
                "INSERT INTO direct_chat_read_status (room_id, user_id, last_read_seq, last_read_time)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(room_id, user_id) DO UPDATE
                 SET last_read_seq = excluded.last_read_seq,
                     last_read_time = excluded.last_read_time
                 WHERE direct_chat_read_status.last_read_seq IS NULL
                    OR direct_chat_read_status.last_read_seq < excluded.last_read_seq",
                params![room.0, user.0, seq, now],
            )?;
            Ok(advanced > 0)
        })
    }

    /// The highest sequence `user` has acknowledged in `room`, or `None`
    /// when nothing has been read yet.
    pub fn last_read_seq(&self, room: RoomId, user: UserId) -> Result<Option<i64>, ChatError> {
        self.with_conn(|conn| {
            let seq = conn
                .query_row(
                    "SELECT last_read_seq FROM direct_chat_read_status
                     WHERE room_id = ?1 AND user_id = ?2",
                    params![room.0, user.0],
                    |r| r.get::<_, Option<i64>>(0),
                )
                .optional()?;
            Ok(seq.flatten())
        })
    }

    pub fn read_status(
        &self,
        room: RoomId,
        user: UserId,
    ) -> Result<Option<ReadStatusRow>, ChatError> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT room_id, user_id, last_read_seq, last_read_time
                     FROM direct_chat_read_status
                     WHERE room_id = ?1 AND user_id = ?2",
                    params![room.0, user.0],
                    map_read_status,
                )
                .optional()?;
            Ok(row)
        })
    }
}

fn map_read_status(row: &Row<'_>) -> rusqlite::Result<ReadStatusRow> {
    Ok(ReadStatusRow {
        room_id: RoomId(row.get(0)?),
        user_id: UserId(row.get(1)?),
        last_read_seq: row.get(2)?,
        last_read_time: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_types::models::MessagePayload;

    fn seed(db: &Database, count: usize) -> RoomId {
        let room = db
            .get_or_create_room(UserId(5), UserId(9), Utc::now())
            .unwrap()
            .id;
        for i in 0..count {
            db.append_message(
                room,
                UserId(9),
                &MessagePayload::Text {
                    message: format!("m{i}"),
                },
                Utc::now(),
            )
            .unwrap();
        }
        room
    }

    #[test]
    fn pointer_starts_unset_and_advances() {
        let db = Database::open_in_memory().unwrap();
        let room = seed(&db, 3);

        assert_eq!(db.last_read_seq(room, UserId(5)).unwrap(), None);

        assert!(db.advance_read(room, UserId(5), 2, Utc::now()).unwrap());
        assert_eq!(db.last_read_seq(room, UserId(5)).unwrap(), Some(2));
    }

    #[test]
    fn pointer_never_regresses() {
        let db = Database::open_in_memory().unwrap();
        let room = seed(&db, 3);

        assert!(db.advance_read(room, UserId(5), 3, Utc::now()).unwrap());
        // older value is a no-op, not an error
        assert!(!db.advance_read(room, UserId(5), 1, Utc::now()).unwrap());
        assert_eq!(db.last_read_seq(room, UserId(5)).unwrap(), Some(3));

        // re-acknowledging the same value is also a no-op
        assert!(!db.advance_read(room, UserId(5), 3, Utc::now()).unwrap());
    }

    #[test]
    fn pointer_must_reference_an_existing_message() {
        let db = Database::open_in_memory().unwrap();
        let room = seed(&db, 1);

        let err = db.advance_read(room, UserId(5), 7, Utc::now()).unwrap_err();
        assert!(matches!(err, ChatError::InvalidArgument(_)));
        assert_eq!(db.last_read_seq(room, UserId(5)).unwrap(), None);
    }

    #[test]
    fn pointers_are_tracked_per_user() {
        let db = Database::open_in_memory().unwrap();
        let room = seed(&db, 2);

        db.advance_read(room, UserId(5), 2, Utc::now()).unwrap();
        assert_eq!(db.last_read_seq(room, UserId(5)).unwrap(), Some(2));
        assert_eq!(db.last_read_seq(room, UserId(9)).unwrap(), None);

        let status = db.read_status(room, UserId(5)).unwrap().unwrap();
        assert_eq!(status.last_read_seq, Some(2));
    }
}
