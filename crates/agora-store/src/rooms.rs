//! Direct-room registry: canonicalizes an unordered participant pair into a
//! single room identity and owns room creation and lookup.

use agora_types::{ChatError, RoomId, UserId};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use crate::models::RoomRow;
use crate::Database;

impl Database {
    /// Fetch the room for the unordered pair `(a, b)`, creating it on first
    /// contact. Safe when both participants race on first contact: the
    /// unique pair constraint plus `INSERT OR IGNORE` leaves exactly one
    /// room, and the loser observes it. Timestamps are set on first insert
    /// only.
    pub fn get_or_create_room(
        &self,
        a: UserId,
        b: UserId,
        now: DateTime<Utc>,
    ) -> Result<RoomRow, ChatError> {
        if a == b {
            return Err(ChatError::invalid_argument(
                "cannot open a chat room with yourself",
            ));
        }
        let (user1, user2) = if a < b { (a, b) } else { (b, a) };

        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO direct_chat_rooms
                 (user1_id, user2_id, created_time, updated_time)
                 VALUES (?1, ?2, ?3, ?4)",
                params![user1.0, user2.0, now, now],
            )?;
            if inserted > 0 {
                debug!("Created direct room for users {} and {}", user1, user2);
            }

            let room = conn.query_row(
                "SELECT id, user1_id, user2_id, created_time, updated_time
                 FROM direct_chat_rooms
                 WHERE user1_id = ?1 AND user2_id = ?2",
                params![user1.0, user2.0],
                map_room,
            )?;
            Ok(room)
        })
    }

    pub fn room(&self, id: RoomId) -> Result<Option<RoomRow>, ChatError> {
        self.with_conn(|conn| {
            let room = conn
                .query_row(
                    "SELECT id, user1_id, user2_id, created_time, updated_time
                     FROM direct_chat_rooms WHERE id = ?1",
                    params![id.0],
                    map_room,
                )
                .optional()?;
            Ok(room)
        })
    }

    /// All rooms containing `user`, most recently active first.
    pub fn rooms_for(&self, user: UserId) -> Result<Vec<RoomRow>, ChatError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user1_id, user2_id, created_time, updated_time
                 FROM direct_chat_rooms
                 WHERE user1_id = ?1 OR user2_id = ?1
                 ORDER BY updated_time DESC",
            )?;
            let rows = stmt
                .query_map(params![user.0], map_room)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Bump a room's last-activity time. Called on every send.
    pub fn touch_room(&self, id: RoomId, now: DateTime<Utc>) -> Result<(), ChatError> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE direct_chat_rooms SET updated_time = ?2 WHERE id = ?1",
                params![id.0, now],
            )?;
            Ok(())
        })
    }
}

fn map_room(row: &Row<'_>) -> rusqlite::Result<RoomRow> {
    Ok(RoomRow {
        id: RoomId(row.get(0)?),
        user1_id: UserId(row.get(1)?),
        user2_id: UserId(row.get(2)?),
        created_time: row.get(3)?,
        updated_time: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_is_canonicalized_both_ways() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();

        let room = db.get_or_create_room(UserId(9), UserId(5), now).unwrap();
        assert_eq!(room.user1_id, UserId(5));
        assert_eq!(room.user2_id, UserId(9));

        let same = db.get_or_create_room(UserId(5), UserId(9), now).unwrap();
        assert_eq!(same.id, room.id);
    }

    #[test]
    fn self_chat_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        let err = db
            .get_or_create_room(UserId(3), UserId(3), Utc::now())
            .unwrap_err();
        assert!(matches!(err, ChatError::InvalidArgument(_)));
    }

    #[test]
    fn repeat_contact_keeps_original_timestamps() {
        let db = Database::open_in_memory().unwrap();
        let first = Utc::now();
        let room = db.get_or_create_room(UserId(1), UserId(2), first).unwrap();

        let later = first + chrono::Duration::seconds(60);
        let again = db.get_or_create_room(UserId(2), UserId(1), later).unwrap();
        assert_eq!(again.id, room.id);
        assert_eq!(again.created_time, room.created_time);
        assert_eq!(again.updated_time, room.updated_time);
    }

    #[test]
    fn rooms_for_lists_only_own_rooms_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let t0 = Utc::now();
        let r1 = db.get_or_create_room(UserId(1), UserId(2), t0).unwrap();
        let r2 = db.get_or_create_room(UserId(1), UserId(3), t0).unwrap();
        db.get_or_create_room(UserId(2), UserId(3), t0).unwrap();

        db.touch_room(r1.id, t0 + chrono::Duration::seconds(5)).unwrap();

        let rooms = db.rooms_for(UserId(1)).unwrap();
        let ids: Vec<_> = rooms.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![r1.id, r2.id]);
        assert!(rooms.iter().all(|r| r.contains(UserId(1))));
    }

    #[test]
    fn other_participant_resolution() {
        let db = Database::open_in_memory().unwrap();
        let room = db.get_or_create_room(UserId(5), UserId(9), Utc::now()).unwrap();
        assert_eq!(room.other_participant(UserId(5)), Some(UserId(9)));
        assert_eq!(room.other_participant(UserId(9)), Some(UserId(5)));
        assert_eq!(room.other_participant(UserId(7)), None);
    }
}
