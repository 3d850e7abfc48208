use dt_core::{
    AdjustmentAction, CachedTimeStorage, ItemRef, PackedFormat, SessionId, StorageFormat, Target,
    Timer, UserId,
};
use dt_db::{Database, SqliteTimeStorage, TimerKey};
use tempfile::TempDir;

fn key() -> TimerKey {
    TimerKey::new(
        UserId::new("candidate-7").expect("user id"),
        SessionId::new("delivery-42").expect("session id"),
    )
}

fn timer_at(path: &std::path::Path, format: StorageFormat) -> Timer {
    let db = Database::open(path).expect("open db");
    let storage = SqliteTimeStorage::new(db, key());
    let mut timer = Timer::with_storage(Box::new(storage), format.build());
    timer.load().expect("load timer");
    timer
}

#[test]
fn timer_survives_reopening_the_database() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("dt.db");
    let item = ItemRef::new("item-1", 0).in_section("section-1").in_test("test-1");

    let mut timer = timer_at(&path, StorageFormat::Json);
    timer.start(&item, 100.0).expect("start");
    timer.save().expect("save");

    let mut timer = timer_at(&path, StorageFormat::Json);
    timer.end(&item, 142.5, None).expect("end");
    timer
        .adjustments_mut()
        .put("test-1", AdjustmentAction::Increase, 300);
    timer.save().expect("save");

    let timer = timer_at(&path, StorageFormat::Json);
    let elapsed = timer
        .compute_until(&["section-1"], Some(Target::Server), 500.0)
        .expect("compute");
    assert!((elapsed - 42.5).abs() < 1e-9);
    assert_eq!(timer.adjustments().get("test-1"), 300);
}

#[test]
fn cached_storage_writes_on_flush() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("dt.db");
    let item = ItemRef::new("item-1", 0);

    let storage = CachedTimeStorage::new(SqliteTimeStorage::new(
        Database::open(&path).expect("open db"),
        key(),
    ));
    let mut timer = Timer::with_storage(Box::new(storage), Box::new(PackedFormat));
    timer.load().expect("load");
    timer.start(&item, 10.0).expect("start");
    timer.save().expect("save");
    timer.end(&item, 20.0, None).expect("end");
    timer.save().expect("save");

    let reader = Database::open(&path).expect("open db");
    assert_eq!(reader.load_timer(&key()).expect("load"), None);

    timer.flush().expect("flush");
    assert!(reader.load_timer(&key()).expect("load").is_some());

    let reloaded = timer_at(&path, StorageFormat::Packed);
    assert_eq!(reloaded.time_line().len(), 2);
}

#[test]
fn delete_removes_the_row() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("dt.db");

    let mut timer = timer_at(&path, StorageFormat::Json);
    timer.start(&ItemRef::new("item-1", 0), 1.0).expect("start");
    timer.save().expect("save");
    assert!(timer.delete().expect("delete"));
    assert!(timer.time_line().is_empty());

    let db = Database::open(&path).expect("open db");
    assert!(db.list_timers().expect("list").is_empty());
}

#[test]
fn reading_with_the_wrong_format_is_rejected() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("dt.db");

    let mut timer = timer_at(&path, StorageFormat::Json);
    timer.start(&ItemRef::new("item-1", 0), 1.0).expect("start");
    timer.save().expect("save");

    let db = Database::open(&path).expect("open db");
    let mut packed = Timer::with_storage(
        Box::new(SqliteTimeStorage::new(db, key())),
        Box::new(PackedFormat),
    );
    assert!(matches!(
        packed.load(),
        Err(dt_core::TimerError::InvalidData(_))
    ));
    assert!(packed.time_line().is_empty());
}
