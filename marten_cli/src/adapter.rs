/*!
The filesystem submission adapter.

Watches a base directory whose `new/` subdirectory receives job files.
An accepted job file is copied into `pending/` and `introduced/` under its
user-qualified name and removed from `new/`; on completion the pending file gains a
`result` object and moves --- written whole, then renamed --- into `done/`.

A job file names its `user`, and the paired definition under `../users/` must agree
on the user's id; the effective priority is the product of the user's and the job's,
optionally jittered.
Incremental jobs reference their `precursor` to keep their internal id across
revisions, and retire it with `done: true`.

Malformed submissions --- unreadable JSON, missing fields, inconsistent user files,
unknown precursors, modification of an already-parsed file --- are warned about and
skipped, without affecting running jobs.
*/

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use rand::Rng;
use serde::Deserialize;
use serde_json::json;

use marten_sat::{
    config::Config,
    job::{
        description::{Application, JobDescription},
        result::JobResult,
    },
    misc::Timer,
};

/// The stations a job file passes through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    New,
    Pending,
    Introduced,
    Done,
}

impl Status {
    fn directory(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Pending => "pending",
            Self::Introduced => "introduced",
            Self::Done => "done",
        }
    }
}

/// A job file as submitted.
#[derive(Deserialize)]
struct JobFileEntry {
    user: String,
    name: String,

    file: Option<String>,
    priority: Option<f64>,
    arrival: Option<f64>,
    incremental: Option<bool>,
    precursor: Option<String>,
    done: Option<bool>,

    #[serde(rename = "wallclock-limit")]
    wallclock_limit: Option<String>,

    #[serde(rename = "cpu-limit")]
    cpu_limit: Option<String>,

    #[serde(rename = "max-demand")]
    max_demand: Option<i32>,

    application: Option<String>,

    dependencies: Option<Vec<String>>,
}

/// A user definition file.
#[derive(Deserialize)]
struct UserFileEntry {
    id: String,
    priority: f64,
}

/// What the adapter remembers about an accepted revision.
struct JobImage {
    user_qualified_name: String,
    arrival: f64,
    incremental: bool,
}

/// An accepted submission, handed on to the runner.
pub struct JobArrival {
    pub description: JobDescription,

    /// The problem payload to read, absent when the arrival retires an id.
    pub file: Option<PathBuf>,

    /// Internal ids of the jobs this one depends on.
    pub dependencies: Vec<i32>,

    /// True iff the arrival retires an incremental job.
    pub done: bool,
}

/// The adapter: id allocation, name maps, and file movement.
pub struct JobFileAdapter {
    base_path: PathBuf,
    jitter_priorities: bool,
    timer: Timer,

    running_id: i32,
    name_to_id_rev: HashMap<String, (i32, i32)>,
    id_to_latest_rev: HashMap<i32, i32>,
    id_rev_to_image: HashMap<(i32, i32), JobImage>,
}

impl JobFileAdapter {
    pub fn new(base_path: PathBuf, config: &Config, timer: Timer) -> Self {
        JobFileAdapter {
            base_path,
            jitter_priorities: config.jitter_job_priorities,
            timer,

            running_id: 1,
            name_to_id_rev: HashMap::new(),
            id_to_latest_rev: HashMap::new(),
            id_rev_to_image: HashMap::new(),
        }
    }

    /// The directory for the given station.
    pub fn directory(&self, status: Status) -> PathBuf {
        self.base_path.join(status.directory())
    }

    fn user_file_path(&self, user: &str) -> PathBuf {
        self.base_path.join("..").join("users").join(format!("{user}.json"))
    }

    fn job_file_path(&self, id: i32, revision: i32, status: Status) -> Option<PathBuf> {
        let image = self.id_rev_to_image.get(&(id, revision))?;
        Some(self.directory(status).join(&image.user_qualified_name))
    }

    /// Handles a file which appeared in `new/`.
    ///
    /// Returns the accepted arrival, or `None` when the file was skipped.
    pub fn handle_new_job(&mut self, file_name: &str) -> Option<JobArrival> {
        log::info!("New job file event: \"{file_name}\"");

        let event_file = self.directory(Status::New).join(file_name);
        if !event_file.is_file() {
            log::info!("Job file {} does not exist (any more)", event_file.display());
            return None;
        }

        let raw = match fs::read_to_string(&event_file) {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("Cannot read {}: {e}", event_file.display());
                return None;
            }
        };

        let entry: JobFileEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Parse error on {}: {e}", event_file.display());
                return None;
            }
        };

        let user = match self.read_user(&entry.user) {
            Some(user) => user,
            None => return None,
        };

        let job_name = format!("{}.{}.json", entry.user, entry.name);
        let arrival = entry.arrival.unwrap_or_else(|| self.timer.elapsed_seconds());
        let incremental = entry.incremental.unwrap_or(false);

        let (id, revision) = match (incremental, &entry.precursor) {
            (true, Some(precursor)) => {
                let precursor_name = format!("{precursor}.json");

                let Some((id, revision)) = self.name_to_id_rev.get(&precursor_name).copied()
                else {
                    log::warn!("Unknown precursor job \"{precursor_name}\"");
                    return None;
                };

                if entry.done.unwrap_or(false) {
                    // The incremental job is notified to be done: retire the id.
                    log::info!("Incremental job #{id} is done");

                    self.name_to_id_rev.remove(&precursor_name);
                    for revision in 0..=self.id_to_latest_rev.remove(&id).unwrap_or(revision) {
                        self.id_rev_to_image.remove(&(id, revision));
                    }

                    let _ = fs::remove_file(&event_file);

                    let mut description = JobDescription::new(id, 0.0, true);
                    description.revision = revision;

                    return Some(JobArrival {
                        description,
                        file: None,
                        dependencies: Vec::new(),
                        done: true,
                    });
                }

                // A new increment of a former job: same id, bumped revision.
                let revision = revision + 1;
                self.id_to_latest_rev.insert(id, revision);
                self.name_to_id_rev.insert(job_name.clone(), (id, revision));
                self.id_rev_to_image.insert(
                    (id, revision),
                    JobImage {
                        user_qualified_name: job_name.clone(),
                        arrival,
                        incremental: true,
                    },
                );

                (id, revision)
            }

            _ => {
                let id = match self.name_to_id_rev.get(&job_name) {
                    Some((id, _)) => *id,
                    None => {
                        let id = self.running_id;
                        self.running_id += 1;
                        self.name_to_id_rev.insert(job_name.clone(), (id, 0));
                        id
                    }
                };

                log::info!("Mapping job \"{job_name}\" to internal ID #{id}");

                if self.id_rev_to_image.contains_key(&(id, 0)) {
                    log::warn!("Modification of a file already parsed, ignoring");
                    return None;
                }

                self.id_rev_to_image.insert(
                    (id, 0),
                    JobImage {
                        user_qualified_name: job_name.clone(),
                        arrival,
                        incremental,
                    },
                );
                self.id_to_latest_rev.insert(id, 0);

                (id, 0)
            }
        };

        let Some(file) = entry.file.as_ref() else {
            log::warn!("Job file missing its problem payload, ignoring");
            return None;
        };

        // Keep copies in pending and introduced, drop the original.
        for status in [Status::Pending, Status::Introduced] {
            let station = self.directory(status).join(&job_name);
            if let Err(e) = fs::write(&station, &raw) {
                log::warn!("Cannot place {}: {e}", station.display());
                return None;
            }
        }
        let _ = fs::remove_file(&event_file);

        let mut priority = user.priority * entry.priority.unwrap_or(1.0);
        if self.jitter_priorities {
            priority *= 0.99 + 0.01 * rand::thread_rng().gen::<f64>();
        }

        let mut description = JobDescription::new(id, priority, incremental);
        description.revision = revision;

        if let Some(limit) = entry.wallclock_limit.as_deref() {
            match crate::misc::parse_duration_seconds(limit) {
                Some(seconds) => {
                    description.wallclock_limit = seconds;
                    log::info!("Job #{id} : wallclock time limit {seconds:.3} secs");
                }
                None => log::warn!("Job #{id} : unreadable wallclock limit \"{limit}\""),
            }
        }

        if let Some(limit) = entry.cpu_limit.as_deref() {
            match crate::misc::parse_duration_seconds(limit) {
                Some(seconds) => {
                    description.cpu_limit = seconds;
                    log::info!("Job #{id} : CPU time limit {seconds:.3} CPU secs");
                }
                None => log::warn!("Job #{id} : unreadable CPU limit \"{limit}\""),
            }
        }

        if let Some(ceiling) = entry.max_demand {
            description.max_demand = ceiling;
            log::info!("Job #{id} : max demand {ceiling}");
        }

        if let Some(application) = entry.application.as_deref() {
            description.application = match application {
                "SAT" => Application::Sat,
                _ => Application::Dummy,
            };
        }

        // Translate dependencies (if any) to internal job ids, forward-allocating
        // ids for jobs not yet known.
        let mut dependencies = Vec::new();
        for name in entry.dependencies.unwrap_or_default() {
            let name = format!("{name}.json");
            let id = match self.name_to_id_rev.get(&name) {
                Some((id, _)) => *id,
                None => {
                    let id = self.running_id;
                    self.running_id += 1;
                    log::info!("Forward mapping job \"{name}\" to internal ID #{id}");
                    self.name_to_id_rev.insert(name, (id, 0));
                    id
                }
            };
            dependencies.push(id);
        }

        Some(JobArrival {
            description,
            file: Some(PathBuf::from(file)),
            dependencies,
            done: false,
        })
    }

    /// Handles a finished job: the pending file gains a result and moves to `done/`.
    pub fn handle_job_done(&mut self, result: &JobResult) {
        let Some(pending) = self.job_file_path(result.id, result.revision, Status::Pending) else {
            log::warn!("Job done event for unknown #{} rev. {}", result.id, result.revision);
            return;
        };

        log::info!(
            "Job done event for #{} rev. {} : {}",
            result.id,
            result.revision,
            pending.display(),
        );

        if !pending.is_file() {
            log::warn!("Pending job file {} gone", pending.display());
            return;
        }

        let mut parsed: serde_json::Value = match fs::read_to_string(&pending)
            .map_err(|e| e.to_string())
            .and_then(|raw| serde_json::from_str(&raw).map_err(|e| e.to_string()))
        {
            Ok(parsed) => parsed,
            Err(e) => {
                log::warn!("Parse error on {}: {e}", pending.display());
                return;
            }
        };

        let arrival = self
            .id_rev_to_image
            .get(&(result.id, result.revision))
            .map(|image| image.arrival)
            .unwrap_or(0.0);

        let resultstring = match result.result.code() {
            10 => "SAT",
            20 => "UNSAT",
            _ => "UNKNOWN",
        };

        parsed["result"] = json!({
            "resultcode": result.result.code(),
            "resultstring": resultstring,
            "revision": result.revision,
            "solution": result.solution,
            "responsetime": self.timer.elapsed_seconds() - arrival,
        });

        let Some(done) = self.job_file_path(result.id, result.revision, Status::Done) else {
            return;
        };

        // Write whole, then rename: readers of done/ never observe a partial file.
        let staged = done.with_extension("tmp");
        let written = fs::write(&staged, format!("{parsed:#}")).and_then(|()| fs::rename(&staged, &done));
        if let Err(e) = written {
            log::warn!("Cannot write result file {}: {e}", done.display());
            return;
        }

        let _ = fs::remove_file(&pending);
    }

    /// Forgets a non-incremental job whose result file was collected.
    pub fn handle_result_collected(&mut self, file_name: &str) {
        let Some((id, revision)) = self.name_to_id_rev.get(file_name).copied() else {
            log::warn!("Cannot clean up job \"{file_name}\" : not known");
            return;
        };

        if self
            .id_rev_to_image
            .get(&(id, revision))
            .is_some_and(|image| image.incremental)
        {
            return;
        }

        self.name_to_id_rev.remove(file_name);
        self.id_rev_to_image.remove(&(id, revision));
        log::info!("Cleaned up \"{file_name}\"");
    }

    fn read_user(&self, user: &str) -> Option<UserFileEntry> {
        let user_file = self.user_file_path(user);

        let parsed: UserFileEntry = match fs::read_to_string(&user_file)
            .map_err(|e| e.to_string())
            .and_then(|raw| serde_json::from_str(&raw).map_err(|e| e.to_string()))
        {
            Ok(parsed) => parsed,
            Err(e) => {
                log::warn!("Unknown user or invalid user definition: {e}");
                return None;
            }
        };

        if parsed.id != user {
            log::warn!(
                "User file {} has inconsistent user ID, ignoring job file",
                user_file.display(),
            );
            return None;
        }

        if !(0.0..=1.0).contains(&parsed.priority) || parsed.priority == 0.0 {
            log::warn!("User {} has priority outside (0, 1], ignoring job file", user);
            return None;
        }

        Some(parsed)
    }
}

#[cfg(test)]
mod adapter_tests {
    use super::*;
    use marten_sat::solver::SolveReport;

    fn scaffold() -> (tempfile::TempDir, JobFileAdapter) {
        let scratch = tempfile::TempDir::new().unwrap();
        let base = scratch.path().join("jobs");

        for sub in ["new", "pending", "introduced", "done"] {
            fs::create_dir_all(base.join(sub)).unwrap();
        }
        fs::create_dir_all(scratch.path().join("users")).unwrap();

        fs::write(
            scratch.path().join("users").join("ada.json"),
            r#"{ "id": "ada", "priority": 0.5 }"#,
        )
        .unwrap();

        let adapter = JobFileAdapter::new(base, &Config::default(), Timer::start());
        (scratch, adapter)
    }

    fn submit(scratch: &tempfile::TempDir, adapter: &JobFileAdapter, name: &str, body: &str) {
        let _ = scratch;
        fs::write(adapter.directory(Status::New).join(name), body).unwrap();
    }

    #[test]
    fn acceptance_moves_the_file() {
        let (scratch, mut adapter) = scaffold();

        submit(
            &scratch,
            &adapter,
            "first.json",
            r#"{ "user": "ada", "name": "first", "file": "problem.cnf", "priority": 0.5 }"#,
        );

        let arrival = adapter.handle_new_job("first.json").unwrap();

        assert_eq!(arrival.description.id, 1);
        assert_eq!(arrival.description.revision, 0);
        assert_eq!(arrival.description.priority, 0.25);
        assert!(!arrival.done);

        assert!(!adapter.directory(Status::New).join("first.json").exists());
        assert!(adapter.directory(Status::Pending).join("ada.first.json").is_file());
        assert!(adapter.directory(Status::Introduced).join("ada.first.json").is_file());
    }

    #[test]
    fn ids_allocate_monotonically() {
        let (scratch, mut adapter) = scaffold();

        for name in ["a", "b"] {
            submit(
                &scratch,
                &adapter,
                &format!("{name}.json"),
                &format!(r#"{{ "user": "ada", "name": "{name}", "file": "p.cnf" }}"#),
            );
        }

        assert_eq!(adapter.handle_new_job("a.json").unwrap().description.id, 1);
        assert_eq!(adapter.handle_new_job("b.json").unwrap().description.id, 2);
    }

    #[test]
    fn increments_keep_the_id_and_bump_the_revision() {
        let (scratch, mut adapter) = scaffold();

        submit(
            &scratch,
            &adapter,
            "base.json",
            r#"{ "user": "ada", "name": "base", "file": "p.cnf", "incremental": true }"#,
        );
        let first = adapter.handle_new_job("base.json").unwrap();

        submit(
            &scratch,
            &adapter,
            "inc.json",
            r#"{ "user": "ada", "name": "inc", "file": "q.cnf",
                 "incremental": true, "precursor": "ada.base" }"#,
        );
        let second = adapter.handle_new_job("inc.json").unwrap();

        assert_eq!(second.description.id, first.description.id);
        assert_eq!(second.description.revision, 1);
    }

    #[test]
    fn done_retires_the_id() {
        let (scratch, mut adapter) = scaffold();

        submit(
            &scratch,
            &adapter,
            "base.json",
            r#"{ "user": "ada", "name": "base", "file": "p.cnf", "incremental": true }"#,
        );
        adapter.handle_new_job("base.json").unwrap();

        submit(
            &scratch,
            &adapter,
            "fin.json",
            r#"{ "user": "ada", "name": "fin", "incremental": true,
                 "precursor": "ada.base", "done": true }"#,
        );
        let arrival = adapter.handle_new_job("fin.json").unwrap();

        assert!(arrival.done);

        // The retired precursor is unknown to later increments.
        submit(
            &scratch,
            &adapter,
            "late.json",
            r#"{ "user": "ada", "name": "late", "file": "r.cnf",
                 "incremental": true, "precursor": "ada.base" }"#,
        );
        assert!(adapter.handle_new_job("late.json").is_none());
    }

    #[test]
    fn inconsistent_users_are_rejected() {
        let (scratch, mut adapter) = scaffold();

        fs::write(
            scratch.path().join("users").join("bob.json"),
            r#"{ "id": "alice", "priority": 0.5 }"#,
        )
        .unwrap();

        submit(
            &scratch,
            &adapter,
            "j.json",
            r#"{ "user": "bob", "name": "j", "file": "p.cnf" }"#,
        );

        assert!(adapter.handle_new_job("j.json").is_none());
    }

    #[test]
    fn malformed_submissions_are_skipped() {
        let (scratch, mut adapter) = scaffold();

        submit(&scratch, &adapter, "bad.json", "{ not json");
        assert!(adapter.handle_new_job("bad.json").is_none());

        submit(&scratch, &adapter, "missing.json", r#"{ "user": "ada" }"#);
        assert!(adapter.handle_new_job("missing.json").is_none());
    }

    #[test]
    fn results_land_in_done() {
        let (scratch, mut adapter) = scaffold();

        submit(
            &scratch,
            &adapter,
            "solve.json",
            r#"{ "user": "ada", "name": "solve", "file": "p.cnf" }"#,
        );
        let arrival = adapter.handle_new_job("solve.json").unwrap();

        adapter.handle_job_done(&JobResult {
            id: arrival.description.id,
            revision: 0,
            result: SolveReport::Satisfiable,
            solution: vec![1, -2],
        });

        let done = adapter.directory(Status::Done).join("ada.solve.json");
        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(done).unwrap()).unwrap();

        assert_eq!(written["result"]["resultcode"], 10);
        assert_eq!(written["result"]["resultstring"], "SAT");
        assert_eq!(written["result"]["solution"], json!([1, -2]));

        assert!(!adapter.directory(Status::Pending).join("ada.solve.json").exists());
    }
}
