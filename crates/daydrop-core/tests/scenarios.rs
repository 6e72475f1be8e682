//! End-to-end walkthroughs of the follow, group and drop rules.

use std::sync::Arc;

use daydrop_core::{CoreError, DropRejection, Engine, ErrorKind, NullFeed};
use daydrop_db::Database;
use daydrop_types::models::{DbId, FollowStatus, MemberStatus, UserRole};

fn setup() -> (Arc<Database>, Engine) {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let engine = Engine::new(db.clone(), Arc::new(NullFeed));
    (db, engine)
}

fn user(db: &Database, name: &str, is_private: bool) -> DbId {
    db.create_user(name, is_private, UserRole::User).unwrap().id
}

#[test]
fn following_a_public_user() {
    let (db, engine) = setup();
    let one = user(&db, "one", false);
    let two = user(&db, "two", false);

    let follow = engine.follows.request_follow(two, one).unwrap();
    assert_eq!(follow.status, FollowStatus::Accepted);

    let err = engine.follows.request_follow(two, one).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[test]
fn following_a_private_user() {
    let (db, engine) = setup();
    let two = user(&db, "two", false);
    let three = user(&db, "three", true);

    let follow = engine.follows.request_follow(two, three).unwrap();
    assert_eq!(follow.status, FollowStatus::Pending);

    let err = engine.follows.accept_follow(follow.id, two).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    let follow = engine.follows.accept_follow(follow.id, three).unwrap();
    assert_eq!(follow.status, FollowStatus::Accepted);
}

#[test]
fn joining_a_private_group() {
    let (db, engine) = setup();
    let creator = user(&db, "ten", false);
    let joiner = user(&db, "eleven", false);
    let plain = user(&db, "twelve", false);
    let group = db.create_group("g", true, creator).unwrap();
    engine.groups.add_member(group.id, plain, creator, "member").unwrap();

    let pending = engine.groups.join_group(group.id, joiner, "member").unwrap();
    assert_eq!(pending.status, MemberStatus::Pending);

    let err = engine.groups.accept_member(group.id, joiner, plain).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    let active = engine.groups.accept_member(group.id, joiner, creator).unwrap();
    assert_eq!(active.status, MemberStatus::Active);
}

#[test]
fn creator_protection() {
    let (db, engine) = setup();
    let creator = user(&db, "ten", false);
    let manager = user(&db, "twenty", false);
    let group = db.create_group("g", true, creator).unwrap();
    engine.groups.add_member(group.id, manager, creator, "manager").unwrap();

    let own = engine.groups.list_members(group.id, creator).unwrap();
    assert!(own.iter().any(|m| m.member_id == creator && m.status == MemberStatus::Active));

    let err = engine.groups.remove_member(group.id, creator, manager).unwrap_err();
    assert!(matches!(err, CoreError::Unauthorized(_)));

    engine.groups.remove_member(group.id, creator, creator).unwrap();
}

#[test]
fn one_drop_per_notification() {
    let (db, engine) = setup();
    let five = user(&db, "five", false);
    let six = user(&db, "six", false);

    let n1 = engine.drops.publish_notification("daily").unwrap();
    engine.drops.can_create_drop(n1.id, five).unwrap();
    engine.drops.create_drop(n1.id, five, "").unwrap();

    assert!(matches!(
        engine.drops.can_create_drop(n1.id, five),
        Err(CoreError::CannotDrop(DropRejection::AlreadyDropped))
    ));

    engine.drops.publish_notification("daily").unwrap();
    assert!(matches!(
        engine.drops.can_create_drop(n1.id, six),
        Err(CoreError::CannotDrop(DropRejection::NotCurrent))
    ));
}
