use std::path::PathBuf;

use clap::{value_parser, Arg, ArgAction, Command};

pub fn cli() -> Command {
    Command::new("marten_cli")
        .about("Accepts job files and solves them by cube-and-conquer")
        .version("kit (not yet fully grown)")

        .arg(Arg::new("directory")
            .required(true)
            .num_args(1)
            .value_parser(value_parser!(PathBuf))
            .help("The base directory to watch.")
            .long_help("The base directory to watch.
Job files are read from <directory>/new, move through <directory>/pending and <directory>/introduced, and results land in <directory>/done.
User files are read from <directory>/../users."))

        .arg(Arg::new("growth_period")
            .long("growth-period")
            .value_parser(value_parser!(f64))
            .required(false)
            .num_args(1)
            .help("Seconds between doublings of a job's demand.")
            .long_help("Seconds between doublings of a job's demand.
At or below zero a job demands the full communicator immediately."))

        .arg(Arg::new("continuous_growth")
            .long("continuous-growth")
            .action(ArgAction::SetTrue)
            .required(false)
            .help("Grow demand along the continuous curve rather than in discrete steps."))

        .arg(Arg::new("max_demand")
            .long("max-demand")
            .value_parser(value_parser!(i32))
            .required(false)
            .num_args(1)
            .help("A global ceiling on the demand of any job, 0 for unlimited."))

        .arg(Arg::new("threads_per_process")
            .long("threads-per-process")
            .value_parser(value_parser!(usize))
            .required(false)
            .num_args(1)
            .help("Solver threads owned by each process of a job, at least one."))

        .arg(Arg::new("size_limit_per_process")
            .long("size-limit-per-process")
            .value_parser(value_parser!(usize))
            .required(false)
            .num_args(1)
            .help("A ceiling on threads x formula literals per process, 0 for unlimited.")
            .long_help("A ceiling on threads x formula literals per process, 0 for unlimited.
When exceeded, the thread count of the affected job is reduced, never below one."))

        .arg(Arg::new("job_comm_update_period")
            .long("job-comm-update-period")
            .value_parser(value_parser!(f64))
            .required(false)
            .num_args(1)
            .help("Seconds between checks of a job's communication appetite."))

        .arg(Arg::new("jitter_job_priorities")
            .long("jitter-job-priorities")
            .action(ArgAction::SetTrue)
            .required(false)
            .help("Apply a multiplicative jitter in [0.99, 1.00) to job priorities."))

        .arg(Arg::new("cubes_per_batch")
            .long("cubes-per-batch")
            .value_parser(value_parser!(usize))
            .required(false)
            .num_args(1)
            .help("Cubes handed to a worker per batch."))

        .arg(Arg::new("watch_period_millis")
            .long("watch-period-millis")
            .value_parser(value_parser!(u64))
            .required(false)
            .num_args(1)
            .help("Milliseconds between scans of the new-job directory."))
}
