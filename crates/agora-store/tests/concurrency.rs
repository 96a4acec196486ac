//! Multi-actor behavior of the store: racing first contacts, interleaved
//! sends, overlapping pointer advances, and duplicate read receipts.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use agora_store::Database;
use agora_types::models::MessagePayload;
use agora_types::{GroupId, RoomId, UserId};
use chrono::Utc;

fn text(body: &str) -> MessagePayload {
    MessagePayload::Text {
        message: body.into(),
    }
}

#[test]
fn racing_first_contact_yields_one_room() {
    let db = Arc::new(Database::open_in_memory().unwrap());

    let ids: Vec<RoomId> = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let db = db.clone();
                // half the callers see the pair in each order
                let (a, b) = if i % 2 == 0 {
                    (UserId(5), UserId(9))
                } else {
                    (UserId(9), UserId(5))
                };
                s.spawn(move || db.get_or_create_room(a, b, Utc::now()).unwrap().id)
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let distinct: HashSet<_> = ids.iter().copied().collect();
    assert_eq!(distinct.len(), 1);
    assert_eq!(db.rooms_for(UserId(5)).unwrap().len(), 1);
}

#[test]
fn concurrent_sends_assign_unique_increasing_sequences() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let room = db
        .get_or_create_room(UserId(1), UserId(2), Utc::now())
        .unwrap()
        .id;

    let seqs: Vec<i64> = thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let db = db.clone();
                let sender = if i % 2 == 0 { UserId(1) } else { UserId(2) };
                s.spawn(move || {
                    (0..10)
                        .map(|j| {
                            db.append_message(room, sender, &text(&format!("{i}-{j}")), Utc::now())
                                .unwrap()
                                .seq
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect()
    });

    let distinct: HashSet<_> = seqs.iter().copied().collect();
    assert_eq!(distinct.len(), 40);
    assert_eq!(*seqs.iter().min().unwrap(), 1);
    assert_eq!(*seqs.iter().max().unwrap(), 40);
}

#[test]
fn overlapping_pointer_advances_converge_to_the_maximum() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let room = db
        .get_or_create_room(UserId(1), UserId(2), Utc::now())
        .unwrap()
        .id;
    for i in 0..20 {
        db.append_message(room, UserId(1), &text(&format!("m{i}")), Utc::now())
            .unwrap();
    }

    thread::scope(|s| {
        for chunk in [5i64, 20, 12, 1] {
            let db = db.clone();
            s.spawn(move || {
                db.advance_read(room, UserId(2), chunk, Utc::now()).unwrap();
            });
        }
    });

    assert_eq!(db.last_read_seq(room, UserId(2)).unwrap(), Some(20));
    assert_eq!(db.count_unread(room, UserId(2), Some(20)).unwrap(), 0);
}

#[test]
fn duplicate_receipts_from_one_reader_increment_once() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let room = db.create_group_room(GroupId(1), "general", false).unwrap();
    let msg = db
        .insert_group_message(room.id, UserId(1), "announcement", None, Utc::now())
        .unwrap();

    let newly_marked: Vec<bool> = thread::scope(|s| {
        let handles: Vec<_> = (0..8i64)
            .map(|i| {
                let db = db.clone();
                // readers 2 and 3, four attempts each
                let reader = UserId(2 + i % 2);
                s.spawn(move || {
                    db.mark_group_message_read(msg.id, reader, Utc::now())
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(newly_marked.iter().filter(|&&n| n).count(), 2);
    assert_eq!(db.group_read_count(msg.id).unwrap(), 2);
}
