use anyhow::{Context, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, instrument};

use crate::cli::Invocation;
use crate::config::Config;
use crate::datastore::FileStore;
use crate::drag::{DragCoordinator, DragOutcome};
use crate::filter::TaskFilter;
use crate::grouping::ColumnGrouping;
use crate::render::Renderer;
use crate::session::Session;
use crate::store::BoardStore;
use crate::task::{Priority, Profession, Task, User};

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "add",
        "board",
        "board-new",
        "board-rm",
        "boards",
        "columns",
        "help",
        "init",
        "login",
        "logout",
        "move",
        "rm",
        "show",
        "version",
        "whoami",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(store, cfg, renderer, inv))]
pub fn dispatch(
    store: &mut FileStore,
    cfg: &Config,
    renderer: &mut Renderer,
    inv: Invocation,
) -> anyhow::Result<()> {
    let now = Utc::now();
    let command = inv.command.as_str();
    debug!(command, args = ?inv.args, "dispatching");

    match command {
        "login" => cmd_login(store, &inv.args, now),
        "logout" => cmd_logout(store),
        "whoami" => cmd_whoami(store),
        "init" => cmd_init(store, now),
        "boards" => cmd_boards(store, renderer),
        "board" => cmd_board(store, renderer, &inv.args, now),
        "board-new" => cmd_board_new(store, &inv.args, now),
        "board-rm" => cmd_board_rm(store, &inv.args),
        "columns" => cmd_columns(store, renderer, &inv.args),
        "add" => cmd_add(store, &inv.args, now),
        "move" => cmd_move(store, &inv.args, now),
        "rm" => cmd_rm(store, &inv.args),
        "show" => cmd_show(store, renderer, &inv.args),
        "help" => cmd_help(cfg),
        "version" => {
            println!("taskflow {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

#[instrument(skip(store, args, now))]
fn cmd_login(store: &FileStore, args: &[String], now: DateTime<Utc>) -> anyhow::Result<()> {
    info!("command login");

    let (flags, positional) = split_flags(args)?;
    let profession = flags
        .value("profession")
        .map(|raw| raw.parse::<Profession>())
        .transpose()?
        .unwrap_or_default();

    let [email, name_words @ ..] = positional.as_slice() else {
        return Err(anyhow!("login requires <email> <name>"));
    };
    if name_words.is_empty() {
        return Err(anyhow!("login requires <email> <name>"));
    }

    let user = User::new(name_words.join(" "), email.clone(), profession, now);
    Session::save(store, user.clone(), now)?;
    println!("Logged in as {} <{}>.", user.name, user.email);
    Ok(())
}

#[instrument(skip(store))]
fn cmd_logout(store: &FileStore) -> anyhow::Result<()> {
    info!("command logout");
    Session::clear(store)?;
    println!("Logged out.");
    Ok(())
}

#[instrument(skip(store))]
fn cmd_whoami(store: &FileStore) -> anyhow::Result<()> {
    info!("command whoami");
    let session = Session::load(store)?;
    match session.current_user() {
        Some(user) => println!(
            "{} <{}> ({})",
            user.name,
            user.email,
            user.profession.as_str()
        ),
        None => println!("Not logged in."),
    }
    Ok(())
}

#[instrument(skip(store, now))]
fn cmd_init(store: &FileStore, now: DateTime<Utc>) -> anyhow::Result<()> {
    info!("command init");
    let session = Session::load(store)?;
    let user = session.require_user()?;
    let board = store.initialize_default_board(user, now)?;
    println!("Initialized board {}.", board.id);
    Ok(())
}

#[instrument(skip(store, renderer))]
fn cmd_boards(store: &FileStore, renderer: &mut Renderer) -> anyhow::Result<()> {
    info!("command boards");
    let session = Session::load(store)?;
    let user = session.require_user()?;
    let boards = store.boards_for_member(&user.email)?;
    if boards.is_empty() {
        println!("No boards. Run `taskflow init` to create your personal board.");
        return Ok(());
    }
    renderer.print_board_list(&boards)
}

#[instrument(skip(store, renderer, args, now))]
fn cmd_board(
    store: &FileStore,
    renderer: &mut Renderer,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command board");

    let (flags, positional) = split_flags(args)?;
    let [board_id] = positional.as_slice() else {
        return Err(anyhow!("board requires <board-id>"));
    };

    let board = store
        .load_board(board_id)?
        .ok_or_else(|| anyhow!("board not found: {board_id}"))?;
    let columns = store.load_columns_for_board(board_id)?;
    let mut tasks = Vec::new();
    for column in &columns {
        tasks.extend(store.load_tasks_for_column(&column.id)?);
    }

    let filter = TaskFilter::new(
        flags.value("search").map(str::to_string),
        flags
            .value("profession")
            .map(|raw| raw.parse::<Profession>())
            .transpose()?,
    );
    let visible: Vec<Task> = if filter.is_empty() {
        tasks
    } else {
        filter.apply(&tasks).into_iter().cloned().collect()
    };

    let grouping = ColumnGrouping::from_tasks(&columns, visible);
    renderer.print_board(&board, &columns, &grouping, now)
}

#[instrument(skip(store, args, now))]
fn cmd_board_new(store: &FileStore, args: &[String], now: DateTime<Utc>) -> anyhow::Result<()> {
    info!("command board-new");

    let (flags, positional) = split_flags(args)?;
    if positional.is_empty() {
        return Err(anyhow!("board-new requires <title>"));
    }

    let session = Session::load(store)?;
    let user = session.require_user()?;

    let title = positional.join(" ");
    let column_titles = flags.values("column");
    let board = store.create_board(user, &title, &column_titles, now)?;
    println!("Created board {}.", board.id);
    Ok(())
}

#[instrument(skip(store, args))]
fn cmd_board_rm(store: &FileStore, args: &[String]) -> anyhow::Result<()> {
    info!("command board-rm");
    let [board_id] = args else {
        return Err(anyhow!("board-rm requires <board-id>"));
    };
    store
        .load_board(board_id)?
        .ok_or_else(|| anyhow!("board not found: {board_id}"))?;
    store.delete_board(board_id)?;
    println!("Deleted board {board_id}.");
    Ok(())
}

#[instrument(skip(store, renderer, args))]
fn cmd_columns(store: &FileStore, renderer: &mut Renderer, args: &[String]) -> anyhow::Result<()> {
    info!("command columns");
    let [board_id] = args else {
        return Err(anyhow!("columns requires <board-id>"));
    };
    let columns = store.load_columns_for_board(board_id)?;
    renderer.print_column_list(&columns)
}

#[instrument(skip(store, args, now))]
fn cmd_add(store: &FileStore, args: &[String], now: DateTime<Utc>) -> anyhow::Result<()> {
    info!("command add");

    let (flags, positional) = split_flags(args)?;
    let [board_id, column_id, title_words @ ..] = positional.as_slice() else {
        return Err(anyhow!("add requires <board-id> <column-id> <title>"));
    };
    if title_words.is_empty() {
        return Err(anyhow!("add requires a task title"));
    }

    store
        .load_board(board_id)?
        .ok_or_else(|| anyhow!("board not found: {board_id}"))?;
    let columns = store.load_columns_for_board(board_id)?;
    if !crate::grouping::is_column_id(&columns, column_id) {
        return Err(anyhow!("column not found on board {board_id}: {column_id}"));
    }

    let priority = flags
        .value("priority")
        .map(|raw| raw.parse::<Priority>())
        .transpose()?
        .unwrap_or_default();

    let mut task = Task::new(
        title_words.join(" "),
        board_id.clone(),
        column_id.clone(),
        priority,
        now,
    );
    task.description = flags.value("description").map(str::to_string);
    task.profession = flags
        .value("profession")
        .map(|raw| raw.parse::<Profession>())
        .transpose()?;
    task.due_date = flags.value("due").map(parse_due_date).transpose()?;
    task.labels = flags.values("label");

    store.create_task(&task)?;
    println!("Created task {}.", task.id);
    Ok(())
}

/// Moves a task to another column by running a full drag gesture through
/// the coordinator: begin, hover, drop.
#[instrument(skip(store, args, now))]
fn cmd_move(store: &mut FileStore, args: &[String], now: DateTime<Utc>) -> anyhow::Result<()> {
    info!("command move");

    let [task_id, target_id] = args else {
        return Err(anyhow!("move requires <task-id> <column-id>"));
    };

    let task = store
        .find_task(task_id)?
        .ok_or_else(|| anyhow!("task not found: {task_id}"))?;
    let columns = store.load_columns_for_board(&task.board_id)?;
    let tasks = store.load_tasks_for_board(&task.board_id)?;
    let grouping = ColumnGrouping::from_tasks(&columns, tasks);

    let mut coordinator = DragCoordinator::new(columns, grouping);
    coordinator.begin_drag(task_id);
    coordinator.drag_over(Some(target_id.as_str()));
    let outcome = coordinator.end_drag(Some(target_id.as_str()), store, now);

    match outcome {
        DragOutcome::Committed => {
            println!("Moved task {task_id} to {target_id}.");
            Ok(())
        }
        DragOutcome::SameColumn => {
            println!("Task {task_id} is already there.");
            Ok(())
        }
        DragOutcome::Cancelled => Err(anyhow!("cannot resolve move target: {target_id}")),
        DragOutcome::RolledBack => Err(anyhow!(
            "move failed; task {task_id} left in its original column"
        )),
    }
}

#[instrument(skip(store, args))]
fn cmd_rm(store: &FileStore, args: &[String]) -> anyhow::Result<()> {
    info!("command rm");
    let [task_id] = args else {
        return Err(anyhow!("rm requires <task-id>"));
    };
    store
        .find_task(task_id)?
        .ok_or_else(|| anyhow!("task not found: {task_id}"))?;
    store.delete_task(task_id)?;
    println!("Deleted task {task_id}.");
    Ok(())
}

#[instrument(skip(store, renderer, args))]
fn cmd_show(store: &FileStore, renderer: &mut Renderer, args: &[String]) -> anyhow::Result<()> {
    info!("command show");
    let [task_id] = args else {
        return Err(anyhow!("show requires <task-id>"));
    };
    let task = store
        .find_task(task_id)?
        .ok_or_else(|| anyhow!("task not found: {task_id}"))?;
    renderer.print_task_detail(&task)
}

fn cmd_help(_cfg: &Config) -> anyhow::Result<()> {
    println!("taskflow <command> [args]");
    println!();
    println!("  login <email> <name> [--profession P]   save the session profile");
    println!("  logout                                  clear the session profile");
    println!("  whoami                                  show the session profile");
    println!("  init                                    create your personal board");
    println!("  boards                                  list boards you belong to");
    println!("  board <board-id> [--search Q] [--profession P]");
    println!("                                          render a board");
    println!("  board-new <title...> [--column TITLE ...]");
    println!("                                          create a board");
    println!("  board-rm <board-id>                     delete a board with its columns and tasks");
    println!("  columns <board-id>                      list a board's columns");
    println!("  add <board-id> <column-id> <title...>   create a task");
    println!("      [--priority P] [--profession P] [--due YYYY-MM-DD]");
    println!("      [--description TEXT] [--label L ...]");
    println!("  move <task-id> <column-id>              move a task across columns");
    println!("  rm <task-id>                            delete a task");
    println!("  show <task-id>                          print a task in full");
    println!("  version                                 print the version");
    Ok(())
}

fn parse_due_date(raw: &str) -> anyhow::Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("invalid due date: {raw}"))?;
    let dt = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow!("invalid due date: {raw}"))?;
    Ok(dt.and_utc())
}

#[derive(Debug, Default)]
struct Flags {
    entries: Vec<(String, String)>,
}

impl Flags {
    fn value(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn values(&self, name: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
            .collect()
    }
}

/// Splits `--name value` pairs out of an argument list, leaving the
/// positional words.
fn split_flags(args: &[String]) -> anyhow::Result<(Flags, Vec<String>)> {
    let mut flags = Flags::default();
    let mut positional = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if let Some(name) = arg.strip_prefix("--") {
            let value = iter
                .next()
                .ok_or_else(|| anyhow!("flag --{name} requires a value"))?;
            flags.entries.push((name.to_string(), value.clone()));
        } else {
            positional.push(arg.clone());
        }
    }

    Ok((flags, positional))
}
