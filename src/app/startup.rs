//! Demo binary composition root
//!
//! Wires CLI + config + logging into a working kiosk against the in-memory
//! store: every component is constructed here and passed down explicitly,
//! no globals beyond the process logger.

use crate::core::error_handling::{log_error_with_context, ContextualError};
use crate::core::logging::init_logging;
use crate::core::time::{SystemTimeProvider, TimeProvider};
use crate::queue::{
    PartitionKey, QueueObserver, ResilientSubmitter, StatsAggregator, VisitorPayload,
};
use crate::storage::{EmergencyBackupLog, FileStorage, KeyValueStorage, MemoryStorage};
use crate::store::{DocumentStore, MemoryStore};
use clap::Parser;
use std::sync::Arc;

use super::args::Args;
use super::config::{KioskConfig, SubmissionMode};
use super::flow::build_flow;

/// Run the demo kiosk; returns the process exit code
pub async fn run() -> i32 {
    let args = Args::parse();

    let config = match KioskConfig::load(args.config_file.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    // CLI log flags override the config file
    let log_level = args.log_level.as_deref().or(config.log.level.as_deref());
    let log_format = args.log_format.as_deref().or(config.log.format.as_deref());
    let log_file_arg = args
        .log_file
        .clone()
        .or_else(|| config.log.file.clone())
        .filter(|p| p.as_os_str() != "none");
    let log_file = log_file_arg.as_ref().map(|p| p.display().to_string());
    if let Err(e) = init_logging(log_level, log_format, log_file.as_deref()) {
        eprintln!("Error initializing logging: {}", e);
        return 1;
    }

    log::info!("deskqueue kiosk starting");

    let mode = if args.admin {
        SubmissionMode::Admin
    } else {
        config.mode
    };

    let time: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
    let backup = EmergencyBackupLog::new(backup_storage(&config));
    let submitter = Arc::new(ResilientSubmitter::new(
        Arc::clone(&store),
        backup,
        config.retry_policy(),
        config.client_profile(),
        Arc::clone(&time),
    ));
    let stats = StatsAggregator::new(Arc::clone(&store));
    let flow = build_flow(mode, submitter, stats, Arc::clone(&time));

    // Live display feed for today's queue
    let partition = PartitionKey::new(time.today());
    let observer = QueueObserver::new(Arc::clone(&store));
    let subscription = match observer.subscribe(partition).await {
        Ok((subscription, mut rx)) => {
            tokio::spawn(async move {
                while let Some(snapshot) = rx.recv().await {
                    log::info!("Queue board: {} visitors waiting", snapshot.len());
                }
            });
            Some(subscription)
        }
        Err(e) => {
            log::warn!("Queue board subscription unavailable: {}", e);
            None
        }
    };

    let mut exit_code = 0;
    for name in &args.visitors {
        match flow.submit(&VisitorPayload::new(name)).await {
            Ok(line) => println!("{}", line),
            Err(e) => {
                log_error_with_context(&e, &format!("submission for '{}'", name));
                if let Some(message) = e.user_message() {
                    println!("{}", message);
                }
                exit_code = 1;
            }
        }
    }

    if let Some(subscription) = subscription {
        subscription.close();
    }
    log::info!("deskqueue kiosk shutting down");
    exit_code
}

fn backup_storage(config: &KioskConfig) -> Arc<dyn KeyValueStorage> {
    if let Some(path) = &config.backup_path {
        return Arc::new(FileStorage::new(path));
    }
    match FileStorage::at_default_location() {
        Ok(storage) => Arc::new(storage),
        Err(e) => {
            log::warn!(
                "No usable backup location, emergency captures will not survive restarts: {}",
                e
            );
            Arc::new(MemoryStorage::new())
        }
    }
}
