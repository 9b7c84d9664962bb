//! `replay` command: republish message files written by `find-lost` or
//! `split-messages`
//!
//! Every file directly under the folder is one queue (the file name),
//! every line one base64-encoded body.

use crate::config::RunConfig;
use crate::discovery::find_files;
use crate::error::{PublishResult, ReplayerError, Result};
use crate::publish::{AmqpPublisher, Publisher, PublisherPool};
use crate::report;
use crate::store::Message;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use tracing::warn;

pub fn run(config: &RunConfig) -> Result<()> {
    let broker = config.broker.clone();
    let published = run_with(config, move |_| AmqpPublisher::connect(&broker))?;
    report::print_published_table(&published);
    Ok(())
}

/// Replay with an arbitrary publisher factory; returns per-queue totals
pub fn run_with<P, F>(config: &RunConfig, factory: F) -> Result<HashMap<String, u64>>
where
    P: Publisher + 'static,
    F: Fn(usize) -> PublishResult<P> + Send + Sync + 'static,
{
    let pool = PublisherPool::spawn(1, factory)?;
    let sender = pool.sender();

    let files = find_files(&config.folder, 1, &["*".to_string()])?;
    for path in files {
        report::status(format!("Processing file {}", path.display()));
        let queue = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_string();

        let file = File::open(&path)?;
        for line in BufReader::new(file).lines() {
            let line = line?;
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }
            let body = match STANDARD.decode(line) {
                Ok(body) => body,
                Err(err) => {
                    warn!(file = %path.display(), error = %err, "skipping undecodable line");
                    continue;
                }
            };
            sender
                .send(Message::from_body(queue.clone(), body))
                .map_err(|_| ReplayerError::ChannelClosed)?;
        }
    }
    drop(sender);

    report::status("Waiting for publisher to complete");
    Ok(pool.finish())
}
