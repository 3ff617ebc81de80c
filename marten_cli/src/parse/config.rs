use clap::ArgMatches;

use marten_sat::config::Config;

pub fn config_from_args(args: &ArgMatches) -> Config {
    let mut the_config = Config::default();

    if let Ok(Some(period)) = args.try_get_one::<f64>("growth_period") {
        the_config.growth_period = *period
    };

    if args.get_flag("continuous_growth") {
        the_config.continuous_growth = true
    };

    if let Ok(Some(ceiling)) = args.try_get_one::<i32>("max_demand") {
        the_config.max_demand = *ceiling
    };

    if let Ok(Some(threads)) = args.try_get_one::<usize>("threads_per_process") {
        the_config.threads_per_process = (*threads).max(1)
    };

    if let Ok(Some(limit)) = args.try_get_one::<usize>("size_limit_per_process") {
        the_config.size_limit_per_process = *limit
    };

    if let Ok(Some(period)) = args.try_get_one::<f64>("job_comm_update_period") {
        the_config.job_comm_update_period = *period
    };

    if args.get_flag("jitter_job_priorities") {
        the_config.jitter_job_priorities = true
    };

    if let Ok(Some(batch)) = args.try_get_one::<usize>("cubes_per_batch") {
        the_config.cubes_per_batch = (*batch).max(1)
    };

    the_config
}
