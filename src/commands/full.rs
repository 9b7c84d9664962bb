//! `full` command: parse everything, report statistics, optionally
//! replay the recovered messages to a live broker

use crate::config::RunConfig;
use crate::discovery::find_files;
use crate::error::Result;
use crate::pool::run_pool;
use crate::publish::{AmqpPublisher, PublisherPool};
use crate::report::{self, FullReport, OutputMode};
use humansize::{format_size, BINARY};

pub fn run(config: &RunConfig, replay: bool, output: Option<OutputMode>) -> Result<()> {
    let files = find_files(&config.folder, config.max_depth, &config.patterns)?;
    if config.verbose {
        report::status(format!(
            "{} file(s) to process on {} thread(s)",
            files.len(),
            config.threads
        ));
    }

    let publisher_pool = if replay {
        let broker = config.broker.clone();
        Some(PublisherPool::spawn(config.threads, move |_| {
            AmqpPublisher::connect(&broker)
        })?)
    } else {
        None
    };
    let publish_tx = publisher_pool.as_ref().map(|pool| pool.sender());

    let run = run_pool(files, config.threads, config.match_re.clone(), publish_tx)?;

    match output {
        Some(mode) => {
            let doc = FullReport {
                files: run.files.records(),
                file_types: run.file_types.records(),
                queues: run.queues.records(),
                queue_types: run.queue_types.records(),
            };
            println!("{}", report::render_structured(mode, &doc)?);
        }
        None => {
            report::print_table("Files", &run.files, false);
            report::print_table("Queues", &run.queues, false);
            report::print_table("Queue Types", &run.queue_types, true);
            report::print_table("File Types", &run.file_types, true);
        }
    }

    if config.verbose {
        let total = run.files.total();
        report::status(format!(
            "Processed {} file(s), {} message(s), {}",
            run.files_processed,
            run.messages,
            format_size(total.sum() as u64, BINARY)
        ));
    }

    if let Some(pool) = publisher_pool {
        let published = pool.finish();
        let total: u64 = published.values().sum();
        report::status(format!("Published {total} message(s)"));
    }

    Ok(())
}
