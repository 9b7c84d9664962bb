//! AMQP 0-9-1 publisher
//!
//! Synchronous client kept deliberately thin: one connection and one
//! channel per publisher worker, persistent delivery mode, mandatory
//! publishes, and a drained `basic.return` listener so returned
//! messages surface as warnings instead of silent losses.

use crate::error::{PublishError, PublishResult};
use crate::publish::{BrokerConfig, Publisher};
use crate::store::Message;
use amiquip::{
    AmqpProperties, AmqpValue, Channel, Connection, FieldTable, Publish, QueueDeclareOptions,
    Return,
};
use crossbeam_channel::Receiver;
use tracing::warn;

/// Delivery mode marking a message persistent on the broker
const PERSISTENT: u8 = 2;

/// One worker's broker connection and channel
pub struct AmqpPublisher {
    // Held so the connection outlives the channel it carries
    _connection: Connection,
    channel: Channel,
    returns: Receiver<Return>,
    declare_queues: bool,
    exchange_mode: bool,
}

impl AmqpPublisher {
    /// Open a connection and channel for one worker
    pub fn connect(config: &BrokerConfig) -> PublishResult<Self> {
        let mut connection =
            Connection::insecure_open(&config.url).map_err(|err| PublishError::ConnectionFailed {
                url: config.url.clone(),
                reason: err.to_string(),
            })?;
        let channel = connection
            .open_channel(None)
            .map_err(|err| PublishError::ChannelFailed(err.to_string()))?;
        let returns = channel
            .listen_for_returns()
            .map_err(|err| PublishError::ChannelFailed(err.to_string()))?;
        Ok(Self {
            _connection: connection,
            channel,
            returns,
            declare_queues: config.declare_queues,
            exchange_mode: config.exchange_mode,
        })
    }

    /// Surface broker-returned messages as warnings
    fn drain_returns(&self) {
        for ret in self.returns.try_iter() {
            warn!(
                routing_key = %ret.routing_key,
                reply = %ret.reply_text,
                "message returned by broker"
            );
        }
    }
}

impl Publisher for AmqpPublisher {
    fn publish(&mut self, msg: &Message) -> PublishResult<()> {
        if self.declare_queues {
            self.channel
                .queue_declare(
                    msg.queue.as_str(),
                    QueueDeclareOptions {
                        durable: true,
                        exclusive: false,
                        auto_delete: false,
                        ..QueueDeclareOptions::default()
                    },
                )
                .map_err(|err| PublishError::DeclareFailed {
                    queue: msg.queue.clone(),
                    reason: err.to_string(),
                })?;
        }

        let mut properties = AmqpProperties::default().with_delivery_mode(PERSISTENT);
        if msg.is_push() {
            let mut headers = FieldTable::default();
            headers.insert("cmf".into(), AmqpValue::LongString(msg.cmf_header().into()));
            properties = properties.with_headers(headers);
        }

        let (exchange, routing_key) = if self.exchange_mode {
            (msg.queue.as_str(), String::new())
        } else {
            ("", msg.queue.clone())
        };

        self.channel
            .basic_publish(
                exchange,
                Publish {
                    body: &msg.body,
                    routing_key,
                    mandatory: true,
                    immediate: false,
                    properties,
                },
            )
            .map_err(|err| PublishError::PublishFailed {
                queue: msg.queue.clone(),
                reason: err.to_string(),
            })?;

        self.drain_returns();
        Ok(())
    }
}
