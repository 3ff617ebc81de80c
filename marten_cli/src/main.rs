use std::path::PathBuf;
use std::time::Duration;

use crossbeam::channel::select;

use marten_sat::misc::Timer;

mod adapter;
mod misc;
mod parse;
mod runner;
mod watcher;

use adapter::JobFileAdapter;
use runner::JobRunner;
use watcher::{DirectoryWatcher, EventKind, FileEvent};

fn main() {
    env_logger::init();

    let matches = parse::cli::cli().get_matches();
    let config = parse::config::config_from_args(&matches);

    let base_path = matches
        .get_one::<PathBuf>("directory")
        .expect("directory is required")
        .clone();

    let watch_period = matches
        .get_one::<u64>("watch_period_millis")
        .copied()
        .unwrap_or(100);
    let watch_period = Duration::from_millis(watch_period);

    if let Err(e) = prepare_directories(&base_path) {
        eprintln!("Cannot prepare {}: {e}", base_path.display());
        std::process::exit(1);
    }

    let timer = Timer::start();
    let mut adapter = JobFileAdapter::new(base_path.clone(), &config, timer);
    let runner = JobRunner::new(config, timer);

    let (mut new_watcher, new_events) =
        DirectoryWatcher::watch(base_path.join("new"), watch_period);
    let (mut done_watcher, done_events) =
        DirectoryWatcher::watch(base_path.join("done"), watch_period);

    log::info!("Watching {}", base_path.join("new").display());

    loop {
        select! {
            recv(new_events) -> event => match event {
                Ok(event) => handle_new_event(&mut adapter, &runner, event),
                Err(_) => break,
            },

            recv(done_events) -> event => match event {
                Ok(FileEvent { name, kind: EventKind::Disappeared }) => {
                    if name.ends_with(".json") {
                        adapter.handle_result_collected(&name);
                    }
                }
                Ok(_) => {}
                Err(_) => break,
            },
        }
    }

    new_watcher.stop();
    done_watcher.stop();
    std::process::exit(0);
}

fn handle_new_event(adapter: &mut JobFileAdapter, runner: &JobRunner, event: FileEvent) {
    if event.kind != EventKind::Appeared {
        return;
    }

    let Some(arrival) = adapter.handle_new_job(&event.name) else {
        return;
    };

    if arrival.done {
        return;
    }

    if !arrival.dependencies.is_empty() {
        log::info!(
            "Job #{} : depends on jobs {:?}",
            arrival.description.id,
            arrival.dependencies,
        );
    }

    let Some(file) = arrival.file.as_ref() else {
        return;
    };

    let mut description = arrival.description;
    match misc::load_dimacs(file) {
        Ok(stream) => description.payload = stream,
        Err(e) => {
            log::warn!("Cannot read problem payload {}: {e}", file.display());
            return;
        }
    }

    match runner.run(&description) {
        Ok(result) => adapter.handle_job_done(&result),
        Err(e) => log::warn!("Job #{} : {e}", description.id),
    }
}

fn prepare_directories(base_path: &PathBuf) -> std::io::Result<()> {
    for sub in ["new", "pending", "introduced", "done"] {
        std::fs::create_dir_all(base_path.join(sub))?;
    }
    std::fs::create_dir_all(base_path.join("..").join("users"))
}
