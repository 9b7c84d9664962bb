//! rabbit-replayer - RabbitMQ Persistence-File Message Recovery
//!
//! A tool to reinject orphaned messages into RabbitMQ following a
//! persistent-store or queue-index corruption. It decodes the broker's
//! on-disk artifacts directly — per-queue index files (`.idx`) and
//! shared persistent-store segments (`.rdq`) — reconstructs each
//! message body and the queue it belongs to, aggregates statistics, and
//! can republish everything to a live AMQP 0-9-1 broker.
//!
//! # Features
//!
//! - **Direct binary decoding**: parses the undocumented record layout
//!   (length framing, the `rabbit_framing_amqp_0_9_1` sentinel, tagged
//!   blocks reassembled in reverse order) without a running broker.
//!
//! - **Parallel extraction**: a bounded worker pool parses files
//!   concurrently; one corrupt file never poisons the run.
//!
//! - **Flexible sinks**: statistics tables or Json/Yaml/Hcl documents,
//!   per-queue base64 exports, or straight republishing with per-worker
//!   broker connections.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                 msg_store folder (*.rdq, *.idx)              │
//! └──────────────────────────────┬───────────────────────────────┘
//!                                │ discovery (glob, max depth)
//!                                ▼
//!                   ┌──────────────────────────┐
//!                   │   jobs (crossbeam, =W)   │
//!                   └──────────────────────────┘
//!                     │          │          │
//!              ┌──────┴───┐ ┌────┴─────┐ ┌──┴───────┐
//!              │ parser 1 │ │ parser 2 │ │ parser W │   blob scan +
//!              └──────┬───┘ └────┬─────┘ └──┬───────┘   queue lookup
//!                     │          │          │
//!                     ▼          ▼          ▼
//!                   ┌──────────────────────────┐
//!                   │ results (=files)         │
//!                   └────────────┬─────────────┘
//!                                │ coordinator: join stats,
//!                                │ fold type buckets
//!                                ▼
//!              statistics ───────┼────── publish (=W×30)
//!              (tables/Json/     │         │
//!               Yaml/Hcl)        │   ┌─────┴──────┐
//!                                │   │ publishers │ 1 connection each
//!                                │   └────────────┘
//! ```
//!
//! # Example
//!
//! ```bash
//! # Inventory what is recoverable
//! rabbit-replayer -f /var/lib/rabbitmq/msg_store full
//!
//! # Recover and republish everything matching a queue filter
//! rabbit-replayer -f ./store -m 'q\.doc.*' full --replay
//!
//! # Targeted recovery against known per-queue losses
//! rabbit-replayer -f ./store --output-folder ./out \
//!     find-lost --lost-messages lost.yaml
//! ```

pub mod commands;
pub mod config;
pub mod discovery;
pub mod error;
pub mod pool;
pub mod publish;
pub mod report;
pub mod stats;
pub mod store;

pub use config::{CliArgs, Command, RunConfig};
pub use error::{ParseError, ReplayerError, Result};
pub use pool::{run_pool, RunReport};
pub use publish::{BrokerConfig, Publisher, PublisherPool};
pub use stats::{StatRecord, Statistic, Statistics};
pub use store::{Blob, FileReport, Message, RabbitFile, ScanControl};
