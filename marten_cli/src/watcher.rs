/*!
A polling watcher over one directory.

A background thread scans the directory on a fixed period and publishes a
[FileEvent] for each file which appears or disappears.
A name is forgotten once its file disappears, so a resubmission under the same name
is reported again.
*/

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam::channel::{unbounded, Receiver, Sender};

/// What happened to a file in the watched directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    Appeared,
    Disappeared,
}

/// A change observed in the watched directory.
pub struct FileEvent {
    pub name: String,
    pub kind: EventKind,
}

/// The watcher thread and its stop flag.
pub struct DirectoryWatcher {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl DirectoryWatcher {
    /// Watches the given directory, publishing events on the returned channel.
    pub fn watch(directory: PathBuf, period: Duration) -> (Self, Receiver<FileEvent>) {
        let (sender, receiver) = unbounded();
        let stop = Arc::new(AtomicBool::new(false));

        let handle = {
            let stop = stop.clone();
            std::thread::spawn(move || scan_loop(directory, period, sender, stop))
        };

        (
            DirectoryWatcher {
                stop,
                handle: Some(handle),
            },
            receiver,
        )
    }

    /// Stops the scan loop and joins its thread.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);

        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for DirectoryWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn scan_loop(
    directory: PathBuf,
    period: Duration,
    sender: Sender<FileEvent>,
    stop: Arc<AtomicBool>,
) {
    let mut reported: HashSet<String> = HashSet::new();

    while !stop.load(Ordering::Acquire) {
        let mut present: HashSet<String> = HashSet::new();

        if let Ok(entries) = std::fs::read_dir(&directory) {
            for entry in entries.flatten() {
                if !entry.path().is_file() {
                    continue;
                }

                let name = entry.file_name().to_string_lossy().into_owned();
                present.insert(name.clone());

                if reported.insert(name.clone()) {
                    let event = FileEvent {
                        name,
                        kind: EventKind::Appeared,
                    };
                    if sender.send(event).is_err() {
                        return;
                    }
                }
            }
        }

        for name in reported.iter().filter(|name| !present.contains(*name)) {
            let event = FileEvent {
                name: name.clone(),
                kind: EventKind::Disappeared,
            };
            if sender.send(event).is_err() {
                return;
            }
        }

        reported.retain(|name| present.contains(name));

        std::thread::sleep(period);
    }
}
