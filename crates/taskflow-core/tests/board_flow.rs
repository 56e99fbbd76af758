use std::cell::{Cell, RefCell};
use std::rc::Rc;

use chrono::{Duration, Utc};
use taskflow_core::cli::Invocation;
use taskflow_core::commands;
use taskflow_core::config::Config;
use taskflow_core::datastore::FileStore;
use taskflow_core::drag::{DragCoordinator, DragOutcome};
use taskflow_core::grouping::ColumnGrouping;
use taskflow_core::render::Renderer;
use taskflow_core::session::Session;
use taskflow_core::store::{BoardStore, SubscriptionToken};
use taskflow_core::task::{Priority, Profession, Task, User};
use tempfile::tempdir;

fn logged_in_store() -> (tempfile::TempDir, FileStore, User) {
    let temp = tempdir().expect("tempdir");
    let store = FileStore::open(temp.path()).expect("open store");
    let now = Utc::now();
    let user = User::new(
        "Ada".to_string(),
        "ada@example.com".to_string(),
        Profession::Developer,
        now,
    );
    Session::save(&store, user.clone(), now).expect("save session");
    (temp, store, user)
}

#[test]
fn board_roundtrip_and_drag_commit() {
    let (_temp, store, user) = logged_in_store();
    let now = Utc::now();

    let board = store.initialize_default_board(&user, now).expect("init board");
    assert!(board.has_member("ada@example.com"));

    let boards = store
        .boards_for_member("ada@example.com")
        .expect("boards for member");
    assert_eq!(boards.len(), 1);

    let columns = store.load_columns_for_board(&board.id).expect("columns");
    assert_eq!(columns.len(), 3);
    assert_eq!(columns[0].title, "Planned");
    let planned = columns[0].clone();
    let doing = columns[1].clone();

    let t1 = Task::new(
        "Write onboarding docs".to_string(),
        board.id.clone(),
        planned.id.clone(),
        Priority::High,
        now,
    );
    let t2 = Task::new(
        "Fix login page".to_string(),
        board.id.clone(),
        planned.id.clone(),
        Priority::Medium,
        now - Duration::seconds(60),
    );
    store.create_task(&t1).expect("create t1");
    store.create_task(&t2).expect("create t2");

    let pushes: Rc<RefCell<Vec<Vec<Task>>>> = Rc::new(RefCell::new(vec![]));
    let sink = Rc::clone(&pushes);
    let token = store.subscribe_to_board_tasks(
        &board.id,
        Box::new(move |tasks| {
            sink.borrow_mut().push(tasks.to_vec());
        }),
    );

    let tasks = store.load_tasks_for_board(&board.id).expect("load tasks");
    let grouping = ColumnGrouping::from_tasks(&columns, tasks);
    assert_eq!(grouping.tasks_in(&planned.id).len(), 2);

    let mut coordinator = DragCoordinator::new(columns.clone(), grouping);
    coordinator.begin_drag(&t1.id);
    coordinator.drag_over(Some(doing.id.as_str()));
    let outcome = coordinator.end_drag(Some(doing.id.as_str()), &store, Utc::now());
    assert_eq!(outcome, DragOutcome::Committed);

    // The persisted column matches what the view shows.
    let stored = store.find_task(&t1.id).expect("find task").expect("task present");
    assert_eq!(stored.column_id, doing.id);
    let doing_tasks = store
        .load_tasks_for_column(&doing.id)
        .expect("load doing tasks");
    assert_eq!(doing_tasks.len(), 1);
    assert_eq!(
        coordinator.grouping().column_of_task(&t1.id),
        Some(doing.id.as_str())
    );

    // The commit produced exactly one push to board subscribers.
    assert_eq!(pushes.borrow().len(), 1);
    store.unsubscribe(token);
}

#[test]
fn same_column_drop_does_not_touch_storage() {
    let (_temp, store, user) = logged_in_store();
    let now = Utc::now();

    let board = store.initialize_default_board(&user, now).expect("init board");
    let columns = store.load_columns_for_board(&board.id).expect("columns");
    let planned = columns[0].clone();

    let t1 = Task::new(
        "Sketch the dashboard".to_string(),
        board.id.clone(),
        planned.id.clone(),
        Priority::Low,
        now,
    );
    store.create_task(&t1).expect("create t1");
    let before = store.load_tasks_for_board(&board.id).expect("load tasks");

    let grouping = ColumnGrouping::from_tasks(&columns, before.clone());
    let mut coordinator = DragCoordinator::new(columns.clone(), grouping);
    coordinator.begin_drag(&t1.id);
    let outcome = coordinator.end_drag(Some(planned.id.as_str()), &store, Utc::now());
    assert_eq!(outcome, DragOutcome::SameColumn);

    let after = store.load_tasks_for_board(&board.id).expect("reload tasks");
    assert_eq!(before, after);
}

#[test]
fn drag_commit_failure_rolls_the_view_back() {
    let (_temp, store, user) = logged_in_store();
    let now = Utc::now();

    let board = store.initialize_default_board(&user, now).expect("init board");
    let columns = store.load_columns_for_board(&board.id).expect("columns");
    let planned = columns[0].clone();
    let doing = columns[1].clone();

    let t1 = Task::new(
        "Doomed move".to_string(),
        board.id.clone(),
        planned.id.clone(),
        Priority::Medium,
        now,
    );
    store.create_task(&t1).expect("create t1");

    let tasks = store.load_tasks_for_board(&board.id).expect("load tasks");
    let grouping = ColumnGrouping::from_tasks(&columns, tasks);
    let mut coordinator = DragCoordinator::new(columns.clone(), grouping);

    coordinator.begin_drag(&t1.id);
    coordinator.drag_over(Some(doing.id.as_str()));

    // The task disappears from storage mid-gesture, so the commit fails.
    store.delete_task(&t1.id).expect("delete task");

    let outcome = coordinator.end_drag(Some(doing.id.as_str()), &store, Utc::now());
    assert_eq!(outcome, DragOutcome::RolledBack);
    assert_eq!(
        coordinator.grouping().column_of_task(&t1.id),
        Some(planned.id.as_str())
    );
}

#[test]
fn board_new_and_board_rm_commands_roundtrip() {
    let (temp, mut store, user) = logged_in_store();

    let rc_path = temp.path().join("taskflowrc");
    std::fs::write(&rc_path, "color = off\n").expect("write rc");
    let cfg = Config::load(Some(rc_path.as_path())).expect("load config");
    let mut renderer = Renderer::new(&cfg).expect("renderer");

    let inv = Invocation {
        command: "board-new".to_string(),
        args: vec![
            "Release".to_string(),
            "train".to_string(),
            "--column".to_string(),
            "Todo".to_string(),
            "--column".to_string(),
            "Shipped".to_string(),
        ],
    };
    commands::dispatch(&mut store, &cfg, &mut renderer, inv).expect("board-new");

    let boards = store.boards_for_member(&user.email).expect("boards");
    assert_eq!(boards.len(), 1);
    assert_eq!(boards[0].title, "Release train");

    let columns = store.load_columns_for_board(&boards[0].id).expect("columns");
    let titles: Vec<&str> = columns.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, vec!["Todo", "Shipped"]);

    let inv = Invocation {
        command: "board-rm".to_string(),
        args: vec![boards[0].id.clone()],
    };
    commands::dispatch(&mut store, &cfg, &mut renderer, inv).expect("board-rm");

    assert!(
        store
            .boards_for_member(&user.email)
            .expect("boards after rm")
            .is_empty()
    );
    assert!(
        store
            .load_columns_for_board(&boards[0].id)
            .expect("columns after rm")
            .is_empty()
    );
}

#[test]
fn created_board_without_column_flags_gets_the_default_three() {
    let (_temp, store, user) = logged_in_store();
    let now = Utc::now();

    let board = store
        .create_board(&user, "Side project", &[], now)
        .expect("create board");
    let columns = store.load_columns_for_board(&board.id).expect("columns");
    let titles: Vec<&str> = columns.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, vec!["Planned", "In Progress", "Done"]);
}

#[test]
fn listener_can_unsubscribe_from_its_own_notification() {
    let temp = tempdir().expect("tempdir");
    let store = Rc::new(FileStore::open(temp.path()).expect("open store"));
    let now = Utc::now();
    let user = User::new(
        "Ada".to_string(),
        "ada@example.com".to_string(),
        Profession::Developer,
        now,
    );
    let board = store.initialize_default_board(&user, now).expect("init board");
    let columns = store.load_columns_for_board(&board.id).expect("columns");

    let fired = Rc::new(Cell::new(0u32));
    let token_slot: Rc<RefCell<Option<SubscriptionToken>>> = Rc::new(RefCell::new(None));

    let store_handle = Rc::clone(&store);
    let slot = Rc::clone(&token_slot);
    let count = Rc::clone(&fired);
    let token = store.subscribe_to_board_tasks(
        &board.id,
        Box::new(move |_tasks| {
            count.set(count.get() + 1);
            if let Some(token) = slot.borrow_mut().take() {
                store_handle.unsubscribe(token);
            }
        }),
    );
    *token_slot.borrow_mut() = Some(token);

    let t1 = Task::new(
        "One-shot".to_string(),
        board.id.clone(),
        columns[0].id.clone(),
        Priority::Medium,
        now,
    );
    store.create_task(&t1).expect("create t1");

    let t2 = Task::new(
        "Second".to_string(),
        board.id.clone(),
        columns[0].id.clone(),
        Priority::Medium,
        now,
    );
    store.create_task(&t2).expect("create t2");

    // The listener detached itself during its first notification.
    assert_eq!(fired.get(), 1);
}

#[test]
fn delete_board_cascades_to_columns_and_tasks() {
    let (_temp, store, user) = logged_in_store();
    let now = Utc::now();

    let board = store.initialize_default_board(&user, now).expect("init board");
    let columns = store.load_columns_for_board(&board.id).expect("columns");
    let t1 = Task::new(
        "Orphan-to-be".to_string(),
        board.id.clone(),
        columns[0].id.clone(),
        Priority::Medium,
        now,
    );
    store.create_task(&t1).expect("create t1");

    store.delete_board(&board.id).expect("delete board");

    assert!(store.load_board(&board.id).expect("load board").is_none());
    assert!(
        store
            .load_columns_for_board(&board.id)
            .expect("columns after delete")
            .is_empty()
    );
    assert!(
        store
            .load_tasks_for_board(&board.id)
            .expect("tasks after delete")
            .is_empty()
    );
}
