use chrono::NaiveDate;
use proptest::prelude::*;
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fs;
use std::rc::Rc;
use tasktrack_core::db::open_db_in_memory;
use tasktrack_core::repo::task_repo::TASKS_FILE_NAME;
use tasktrack_core::{
    JsonTaskRepository, RepoError, RepoResult, SqliteTaskRepository, StoreError, TaskFields,
    TaskId, TaskRecord, TaskRepository, TaskStore,
};

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn design_fields() -> TaskFields {
    TaskFields {
        sub_task: "Design".to_string(),
        main_task: "Web".to_string(),
        priority: "High".to_string(),
        status: "Not Started".to_string(),
        start_date: Some(date(2024, 1, 1)),
        end_date: Some(date(2024, 1, 10)),
        responsible: "Team Member 1".to_string(),
        notes: "wireframes first".to_string(),
    }
}

/// Keeps the collection in memory; good enough for lifecycle properties.
#[derive(Default)]
struct MemoryRepo {
    tasks: RefCell<Vec<TaskRecord>>,
}

impl TaskRepository for MemoryRepo {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn load_tasks(&self) -> RepoResult<Vec<TaskRecord>> {
        Ok(self.tasks.borrow().clone())
    }

    fn save_tasks(&self, tasks: &[TaskRecord]) -> RepoResult<()> {
        *self.tasks.borrow_mut() = tasks.to_vec();
        Ok(())
    }
}

/// Loads fine but refuses every write.
struct ReadOnlyRepo;

impl TaskRepository for ReadOnlyRepo {
    fn backend_name(&self) -> &'static str {
        "read_only"
    }

    fn load_tasks(&self) -> RepoResult<Vec<TaskRecord>> {
        Ok(Vec::new())
    }

    fn save_tasks(&self, _tasks: &[TaskRecord]) -> RepoResult<()> {
        Err(RepoError::InvalidData("storage is read-only".to_string()))
    }
}

/// In-memory storage whose writes can be switched off through a shared flag.
#[derive(Clone, Default)]
struct FlakyRepo {
    tasks: Rc<RefCell<Vec<TaskRecord>>>,
    failing: Rc<Cell<bool>>,
}

impl TaskRepository for FlakyRepo {
    fn backend_name(&self) -> &'static str {
        "flaky"
    }

    fn load_tasks(&self) -> RepoResult<Vec<TaskRecord>> {
        Ok(self.tasks.borrow().clone())
    }

    fn save_tasks(&self, tasks: &[TaskRecord]) -> RepoResult<()> {
        if self.failing.get() {
            return Err(RepoError::InvalidData("disk unavailable".to_string()));
        }
        *self.tasks.borrow_mut() = tasks.to_vec();
        Ok(())
    }
}

#[test]
fn lifecycle_scenario_add_soft_delete_restore_hard_delete() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = TaskStore::open(JsonTaskRepository::in_dir(dir.path()));
    assert!(store.load_warning().is_none());

    let id = store.add(design_fields()).unwrap();
    assert_eq!(store.active().len(), 1);
    assert_eq!(store.deleted().len(), 0);

    store.soft_delete(&id).unwrap();
    assert_eq!(store.active().len(), 0);
    assert_eq!(store.deleted().len(), 1);

    store.restore(&id).unwrap();
    assert_eq!(store.active().len(), 1);
    assert_eq!(store.deleted().len(), 0);

    store.hard_delete(&id).unwrap();
    assert!(store.load().unwrap().is_empty());

    let reopened = TaskStore::open(JsonTaskRepository::in_dir(dir.path()));
    assert!(reopened.get(&id).is_none());
    assert!(reopened.records().is_empty());
}

#[test]
fn add_stores_fields_exactly_with_fresh_id() {
    let mut store = TaskStore::open(MemoryRepo::default());

    let first = store.add(design_fields()).unwrap();
    let second = store.add(design_fields()).unwrap();
    assert!(!first.is_empty());
    assert_ne!(first, second);

    let loaded = store.load().unwrap().to_vec();
    let record = loaded.iter().find(|task| task.id == first).unwrap();
    assert_eq!(record.fields(), design_fields());
    assert!(!record.is_deleted);
}

#[test]
fn add_rejects_invalid_fields_without_state_change() {
    let mut store = TaskStore::open(MemoryRepo::default());

    let err = store.add(TaskFields::new("   ")).unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));

    let mut reversed = design_fields();
    reversed.start_date = Some(date(2024, 2, 1));
    reversed.end_date = Some(date(2024, 1, 1));
    let err = store.add(reversed).unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));

    assert!(store.records().is_empty());
}

#[test]
fn update_preserves_id_and_refreshes_last_update() {
    let mut store = TaskStore::open(MemoryRepo::default());
    let id = store.add(design_fields()).unwrap();
    let before = store.get(&id).unwrap().last_update;

    let mut edited = design_fields();
    edited.status = "Completed".to_string();
    edited.notes = String::new();
    store.update(&id, edited.clone()).unwrap();

    let record = store.get(&id).unwrap();
    assert_eq!(record.id, id);
    assert_eq!(record.fields(), edited);
    assert!(record.last_update > before);
    assert_eq!(store.records().len(), 1);
}

#[test]
fn update_revives_soft_deleted_record() {
    let mut store = TaskStore::open(MemoryRepo::default());
    let id = store.add(design_fields()).unwrap();
    store.soft_delete(&id).unwrap();

    store.update(&id, design_fields()).unwrap();
    assert!(store.get(&id).unwrap().is_active());
}

#[test]
fn restore_is_idempotent() {
    let mut store = TaskStore::open(MemoryRepo::default());
    let id = store.add(design_fields()).unwrap();

    store.soft_delete(&id).unwrap();
    store.restore(&id).unwrap();
    store.restore(&id).unwrap();

    assert!(!store.get(&id).unwrap().is_deleted);
    assert_eq!(store.active().len(), 1);
}

#[test]
fn unknown_id_is_not_found_for_every_id_operation() {
    let mut store = TaskStore::open(MemoryRepo::default());
    store.add(design_fields()).unwrap();
    let snapshot = store.records().to_vec();
    let missing = TaskId::generate();

    let results = [
        store.update(&missing, design_fields()),
        store.soft_delete(&missing),
        store.restore(&missing),
        store.hard_delete(&missing),
        store.update_checked(&missing, snapshot[0].last_update, design_fields()),
    ];
    for result in results {
        assert!(
            matches!(&result, Err(StoreError::NotFound(id)) if id == &missing),
            "unexpected result: {result:?}"
        );
    }
    assert_eq!(store.records(), snapshot.as_slice());
}

#[test]
fn update_checked_detects_concurrent_edit_through_shared_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut setup = TaskStore::open(JsonTaskRepository::in_dir(dir.path()));
    let id = setup.add(design_fields()).unwrap();

    let mut first = TaskStore::open(JsonTaskRepository::in_dir(dir.path()));
    let mut second = TaskStore::open(JsonTaskRepository::in_dir(dir.path()));
    let seen_by_first = first.get(&id).unwrap().last_update;
    let seen_by_second = second.get(&id).unwrap().last_update;

    let mut first_edit = design_fields();
    first_edit.status = "In Progress".to_string();
    first.update_checked(&id, seen_by_first, first_edit).unwrap();

    let mut second_edit = design_fields();
    second_edit.status = "On Hold".to_string();
    let err = second
        .update_checked(&id, seen_by_second, second_edit.clone())
        .unwrap_err();
    match err {
        StoreError::Conflict {
            id: conflict_id,
            expected,
            actual,
        } => {
            assert_eq!(conflict_id, id);
            assert_eq!(expected, seen_by_second);
            assert!(actual > expected);
        }
        other => panic!("unexpected error: {other}"),
    }

    // Retrying with a fresh token succeeds.
    second.load().unwrap();
    let fresh = second.get(&id).unwrap().last_update;
    assert_eq!(second.get(&id).unwrap().status, "In Progress");
    second.update_checked(&id, fresh, second_edit).unwrap();

    let reopened = TaskStore::open(JsonTaskRepository::in_dir(dir.path()));
    assert_eq!(reopened.get(&id).unwrap().status, "On Hold");
}

#[test]
fn corrupt_file_loads_empty_with_warning_and_is_quarantined() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(TASKS_FILE_NAME);
    fs::write(&path, "{ this is not json").unwrap();

    let mut store = TaskStore::open(JsonTaskRepository::in_dir(dir.path()));
    let warning = store.take_load_warning().unwrap();
    assert!(matches!(warning, StoreError::StorageRead(RepoError::Json { .. })));
    assert!(warning.is_warning());
    assert!(store.records().is_empty());

    let backup = dir.path().join(format!("{TASKS_FILE_NAME}.corrupt"));
    assert_eq!(fs::read_to_string(backup).unwrap(), "{ this is not json");

    // The store stays usable and the next write replaces the bad file.
    let id = store.add(design_fields()).unwrap();
    let reopened = TaskStore::open(JsonTaskRepository::in_dir(dir.path()));
    assert!(reopened.load_warning().is_none());
    assert!(reopened.get(&id).is_some());
}

#[test]
fn duplicate_ids_in_file_are_reported_as_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = TaskStore::open(JsonTaskRepository::in_dir(dir.path()));
    let id = store.add(design_fields()).unwrap();

    let mut records = store.records().to_vec();
    records.push(records[0].clone());
    fs::write(
        dir.path().join(TASKS_FILE_NAME),
        serde_json::to_string(&records).unwrap(),
    )
    .unwrap();

    let reopened = TaskStore::open(JsonTaskRepository::in_dir(dir.path()));
    assert!(matches!(
        reopened.load_warning(),
        Some(StoreError::StorageRead(RepoError::InvalidData(message)))
            if message.contains(id.as_str())
    ));
    assert!(reopened.records().is_empty());
}

#[test]
fn failed_write_keeps_in_memory_change_and_names_the_task() {
    let mut store = TaskStore::open(ReadOnlyRepo);

    let err = store.add(design_fields()).unwrap_err();
    assert!(err.is_warning());
    let id = match err {
        StoreError::StorageWrite {
            task_id: Some(id), ..
        } => id,
        other => panic!("unexpected error: {other}"),
    };
    assert!(store.get(&id).is_some());

    let err = store.soft_delete(&id).unwrap_err();
    assert!(matches!(err, StoreError::StorageWrite { task_id: Some(ref t), .. } if t == &id));
    assert!(store.get(&id).unwrap().is_deleted);
}

#[test]
fn update_checked_keeps_records_whose_write_failed() {
    let repo = FlakyRepo::default();
    let mut store = TaskStore::open(repo.clone());
    let first = store.add(design_fields()).unwrap();
    let token = store.get(&first).unwrap().last_update;

    repo.failing.set(true);
    let err = store.add(TaskFields::new("Unsaved")).unwrap_err();
    let unsaved = match err {
        StoreError::StorageWrite {
            task_id: Some(id), ..
        } => id,
        other => panic!("unexpected error: {other}"),
    };
    assert_eq!(store.records().len(), 2);

    repo.failing.set(false);
    let mut edit = design_fields();
    edit.status = "Completed".to_string();
    store.update_checked(&first, token, edit).unwrap();

    assert_eq!(store.records().len(), 2);
    assert!(store.get(&unsaved).is_some());
    assert_eq!(store.get(&first).unwrap().status, "Completed");
    assert!(store.get(&first).unwrap().last_update > token);

    // The successful write carried the previously unsaved record too.
    let reopened = TaskStore::open(repo);
    assert_eq!(reopened.records().len(), 2);
    assert!(reopened.get(&unsaved).is_some());
}

#[test]
fn json_round_trip_is_exact() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = TaskStore::open(JsonTaskRepository::in_dir(dir.path()));
    store.add(design_fields()).unwrap();
    let mut undated = TaskFields::new("Ünïcode notes ✓");
    undated.notes = "line one\nline two".to_string();
    let undated_id = store.add(undated).unwrap();
    store.soft_delete(&undated_id).unwrap();

    let reopened = TaskStore::open(JsonTaskRepository::in_dir(dir.path()));
    assert_eq!(reopened.records(), store.records());
}

#[test]
fn sqlite_round_trip_is_exact_and_ordered() {
    let conn = open_db_in_memory().unwrap();
    let mut store = TaskStore::open(SqliteTaskRepository::new(&conn));
    for name in ["zeta", "alpha", "mid"] {
        store.add(TaskFields::new(name)).unwrap();
    }
    let deleted = store.add(design_fields()).unwrap();
    store.soft_delete(&deleted).unwrap();

    let reopened = TaskStore::open(SqliteTaskRepository::new(&conn));
    assert!(reopened.load_warning().is_none());
    assert_eq!(reopened.records(), store.records());
    let names: Vec<&str> = reopened
        .records()
        .iter()
        .map(|task| task.sub_task.as_str())
        .collect();
    assert_eq!(names, ["zeta", "alpha", "mid", "Design"]);
}

#[derive(Debug, Clone)]
enum Op {
    Add(String),
    Update(usize),
    SoftDelete(usize),
    Restore(usize),
    HardDelete(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        "[a-z]{1,8}".prop_map(Op::Add),
        any::<usize>().prop_map(Op::Update),
        any::<usize>().prop_map(Op::SoftDelete),
        any::<usize>().prop_map(Op::Restore),
        any::<usize>().prop_map(Op::HardDelete),
    ]
}

proptest! {
    #[test]
    fn active_and_deleted_partition_the_collection(
        ops in prop::collection::vec(op_strategy(), 1..40)
    ) {
        let mut store = TaskStore::open(MemoryRepo::default());

        for op in ops {
            let ids: Vec<TaskId> = store.records().iter().map(|task| task.id.clone()).collect();
            let pick = |index: usize| ids.get(index % ids.len().max(1)).cloned();
            match op {
                Op::Add(name) => {
                    store.add(TaskFields::new(name)).unwrap();
                }
                Op::Update(index) => {
                    if let Some(id) = pick(index) {
                        store.update(&id, TaskFields::new("edited")).unwrap();
                    }
                }
                Op::SoftDelete(index) => {
                    if let Some(id) = pick(index) {
                        store.soft_delete(&id).unwrap();
                    }
                }
                Op::Restore(index) => {
                    if let Some(id) = pick(index) {
                        store.restore(&id).unwrap();
                    }
                }
                Op::HardDelete(index) => {
                    if let Some(id) = pick(index) {
                        store.hard_delete(&id).unwrap();
                        prop_assert!(store.load().unwrap().iter().all(|task| task.id != id));
                    }
                }
            }

            let active: HashSet<TaskId> =
                store.active().into_iter().map(|task| task.id).collect();
            let deleted: HashSet<TaskId> =
                store.deleted().into_iter().map(|task| task.id).collect();
            let all: HashSet<TaskId> =
                store.load().unwrap().iter().map(|task| task.id.clone()).collect();

            prop_assert!(active.is_disjoint(&deleted));
            let union: HashSet<TaskId> = active.union(&deleted).cloned().collect();
            prop_assert_eq!(union, all);
            prop_assert_eq!(store.records().len(), store.active().len() + store.deleted().len());
        }
    }
}
