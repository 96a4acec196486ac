//! Group-chat persistence: per-group rooms, reply-threaded messages, and the
//! read-marker table backing the denormalized read counter.

use agora_types::{ChatError, GroupId, GroupMessageId, GroupRoomId, UserId};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::models::{GroupMessageRow, GroupRoomRow};
use crate::Database;

const GROUP_MESSAGE_COLUMNS: &str =
    "id, room_id, sender_id, body, reply_to, read_count, created_time";

impl Database {
    pub fn create_group_room(
        &self,
        group: GroupId,
        name: &str,
        admin_only: bool,
    ) -> Result<GroupRoomRow, ChatError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO group_chat_rooms (group_id, name, admin_only) VALUES (?1, ?2, ?3)",
                params![group.0, name, admin_only],
            )?;
            Ok(GroupRoomRow {
                id: GroupRoomId(conn.last_insert_rowid()),
                group_id: group,
                name: name.to_owned(),
                admin_only,
            })
        })
    }

    pub fn group_room(&self, id: GroupRoomId) -> Result<Option<GroupRoomRow>, ChatError> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, group_id, name, admin_only FROM group_chat_rooms WHERE id = ?1",
                    params![id.0],
                    |r| {
                        Ok(GroupRoomRow {
                            id: GroupRoomId(r.get(0)?),
                            group_id: GroupId(r.get(1)?),
                            name: r.get(2)?,
                            admin_only: r.get(3)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Persist a group message with a zero read count. A reply target must
    /// already exist in the same room.
    pub fn insert_group_message(
        &self,
        room: GroupRoomId,
        sender: UserId,
        body: &str,
        reply_to: Option<GroupMessageId>,
        now: DateTime<Utc>,
    ) -> Result<GroupMessageRow, ChatError> {
        if body.trim().is_empty() {
            return Err(ChatError::Validation { field: "message" });
        }

        self.with_conn(|conn| {
            if let Some(target) = reply_to {
                let target_room: Option<i64> = conn
                    .query_row(
                        "SELECT room_id FROM group_chat_messages WHERE id = ?1",
                        params![target.0],
                        |r| r.get(0),
                    )
                    .optional()?;
                match target_room {
                    None => return Err(ChatError::NotFound("reply target")),
                    Some(other) if other != room.0 => {
                        return Err(ChatError::Validation {
                            field: "reply_to_message_id",
                        })
                    }
                    Some(_) => {}
                }
            }

            conn.execute(
                "INSERT INTO group_chat_messages
                 (room_id, sender_id, body, reply_to, read_count, created_time)
                 VALUES (?1, ?2, ?3, ?4, 0, ?5)",
                params![room.0, sender.0, body, reply_to.map(|m| m.0), now],
            )?;

            Ok(GroupMessageRow {
                id: GroupMessageId(conn.last_insert_rowid()),
                room_id: room,
                sender_id: sender,
                body: body.to_owned(),
                reply_to,
                read_count: 0,
                created_time: now,
            })
        })
    }

    pub fn group_message(
        &self,
        id: GroupMessageId,
    ) -> Result<Option<GroupMessageRow>, ChatError> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!(
                        "SELECT {GROUP_MESSAGE_COLUMNS} FROM group_chat_messages WHERE id = ?1"
                    ),
                    params![id.0],
                    map_group_message,
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Idempotent read receipt: insert the (message, user) marker and, only
    /// when the marker is new, increment the message's read counter. Both
    /// writes share one transaction so the counter stays exactly the number
    /// of distinct readers. Returns whether the marker was new.
    pub fn mark_group_message_read(
        &self,
        message: GroupMessageId,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<bool, ChatError> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM group_chat_messages WHERE id = ?1)",
                params![message.0],
                |r| r.get(0),
            )?;
            if !exists {
                return Err(ChatError::NotFound("group message"));
            }

            let inserted = tx.execute(
                "INSERT OR IGNORE INTO group_message_reads (message_id, user_id, created_time)
                 VALUES (?1, ?2, ?3)",
                params![message.0, user.0, now],
            )?;
            if inserted > 0 {
                tx.execute(
                    "UPDATE group_chat_messages SET read_count = read_count + 1 WHERE id = ?1",
                    params![message.0],
                )?;
            }

            tx.commit()?;
            Ok(inserted > 0)
        })
    }

    /// Served from the stored counter; markers are never recounted.
    pub fn group_read_count(&self, message: GroupMessageId) -> Result<u32, ChatError> {
        self.with_conn(|conn| {
            let count = conn
                .query_row(
                    "SELECT read_count FROM group_chat_messages WHERE id = ?1",
                    params![message.0],
                    |r| r.get::<_, u32>(0),
                )
                .optional()?;
            count.ok_or(ChatError::NotFound("group message"))
        })
    }
}

fn map_group_message(row: &Row<'_>) -> rusqlite::Result<GroupMessageRow> {
    Ok(GroupMessageRow {
        id: GroupMessageId(row.get(0)?),
        room_id: GroupRoomId(row.get(1)?),
        sender_id: UserId(row.get(2)?),
        body: row.get(3)?,
        reply_to: row.get::<_, Option<i64>>(4)?.map(GroupMessageId),
        read_count: row.get(5)?,
        created_time: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rooms(db: &Database) -> (GroupRoomRow, GroupRoomRow) {
        let general = db
            .create_group_room(GroupId(1), "general", false)
            .unwrap();
        let other = db.create_group_room(GroupId(1), "planning", false).unwrap();
        (general, other)
    }

    #[test]
    fn empty_body_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        let (room, _) = rooms(&db);
        let err = db
            .insert_group_message(room.id, UserId(1), "  ", None, Utc::now())
            .unwrap_err();
        assert!(matches!(err, ChatError::Validation { field: "message" }));
    }

    #[test]
    fn reply_must_stay_in_the_same_room() {
        let db = Database::open_in_memory().unwrap();
        let (general, planning) = rooms(&db);
        let now = Utc::now();

        let target = db
            .insert_group_message(general.id, UserId(1), "original", None, now)
            .unwrap();

        let err = db
            .insert_group_message(planning.id, UserId(2), "reply", Some(target.id), now)
            .unwrap_err();
        assert!(matches!(
            err,
            ChatError::Validation {
                field: "reply_to_message_id"
            }
        ));

        let reply = db
            .insert_group_message(general.id, UserId(2), "reply", Some(target.id), now)
            .unwrap();
        assert_eq!(reply.reply_to, Some(target.id));
    }

    #[test]
    fn reply_to_missing_message_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        let (room, _) = rooms(&db);
        let err = db
            .insert_group_message(room.id, UserId(1), "hi", Some(GroupMessageId(99)), Utc::now())
            .unwrap_err();
        assert!(matches!(err, ChatError::NotFound(_)));
    }

    #[test]
    fn marking_read_twice_counts_once() {
        let db = Database::open_in_memory().unwrap();
        let (room, _) = rooms(&db);
        let msg = db
            .insert_group_message(room.id, UserId(1), "notice", None, Utc::now())
            .unwrap();

        assert!(db.mark_group_message_read(msg.id, UserId(2), Utc::now()).unwrap());
        assert!(!db.mark_group_message_read(msg.id, UserId(2), Utc::now()).unwrap());
        assert_eq!(db.group_read_count(msg.id).unwrap(), 1);

        // a second distinct reader does increment
        assert!(db.mark_group_message_read(msg.id, UserId(3), Utc::now()).unwrap());
        assert_eq!(db.group_read_count(msg.id).unwrap(), 2);
    }

    #[test]
    fn read_operations_on_missing_message_are_not_found() {
        let db = Database::open_in_memory().unwrap();
        let missing = GroupMessageId(42);

        let err = db
            .mark_group_message_read(missing, UserId(1), Utc::now())
            .unwrap_err();
        assert!(matches!(err, ChatError::NotFound(_)));
        assert!(matches!(
            db.group_read_count(missing).unwrap_err(),
            ChatError::NotFound(_)
        ));
    }
}
