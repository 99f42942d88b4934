//! MQTT command publishing
//!
//! Pushes classified intents to the robot over MQTT. The broker is
//! best-effort infrastructure: connect failures are non-fatal, and a publish
//! while disconnected is skipped and logged, never surfaced to the caller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, Incoming, MqttOptions, QoS};

use crate::config::MqttConfig;
use crate::intent::Intent;
use crate::{Error, Result};

/// Connection attempts before giving up
const CONNECT_RETRIES: u32 = 3;

/// Base delay for exponential connect backoff
const CONNECT_BACKOFF: Duration = Duration::from_secs(1);

/// Sink for robot commands; publishing never fails the calling request
#[async_trait]
pub trait CommandSink: Send + Sync {
    /// Publish an intent for a robot
    async fn publish(&self, robot_id: &str, intent: Intent);
}

/// MQTT-backed command sink
pub struct MqttPublisher {
    client: AsyncClient,
    topic_base: String,
    connected: Arc<AtomicBool>,
}

impl MqttPublisher {
    /// Connect to the broker with bounded retries
    ///
    /// The event loop keeps running in the background after connect and
    /// re-establishes the session when the broker drops it.
    ///
    /// # Errors
    ///
    /// Returns error when no attempt reaches the broker
    pub async fn connect(config: &MqttConfig) -> Result<Self> {
        let client_id = format!("michi-gateway-{}", uuid::Uuid::new_v4());

        let mut last_err = None;
        for attempt in 0..CONNECT_RETRIES {
            if attempt > 0 {
                let delay = CONNECT_BACKOFF * 2_u32.pow(attempt - 1);
                tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "retrying MQTT connect");
                tokio::time::sleep(delay).await;
            }

            let mut options = MqttOptions::new(&client_id, &config.broker, config.port);
            options.set_keep_alive(Duration::from_secs(30));

            let (client, mut eventloop) = AsyncClient::new(options, 16);

            match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                    tracing::info!(broker = %config.broker, port = config.port, "MQTT connected");

                    let connected = Arc::new(AtomicBool::new(true));
                    let flag = connected.clone();
                    tokio::spawn(async move {
                        loop {
                            match eventloop.poll().await {
                                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                                    tracing::info!("MQTT reconnected");
                                    flag.store(true, Ordering::SeqCst);
                                }
                                Ok(_) => {}
                                Err(e) => {
                                    if flag.swap(false, Ordering::SeqCst) {
                                        tracing::warn!(error = %e, "MQTT connection lost");
                                    }
                                    tokio::time::sleep(CONNECT_BACKOFF).await;
                                }
                            }
                        }
                    });

                    return Ok(Self {
                        client,
                        topic_base: config.topic_base.clone(),
                        connected,
                    });
                }
                Ok(other) => {
                    tracing::debug!(event = ?other, "unexpected MQTT event before ConnAck");
                    last_err = Some(Error::Publish("no ConnAck from broker".to_string()));
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "MQTT connect attempt failed");
                    last_err = Some(Error::Publish(e.to_string()));
                }
            }
        }

        Err(last_err.unwrap_or_else(|| Error::Publish("MQTT connect failed".to_string())))
    }
}

/// Sink used when no broker is reachable; commands are dropped with a log line
pub struct NoopSink;

#[async_trait]
impl CommandSink for NoopSink {
    async fn publish(&self, robot_id: &str, intent: Intent) {
        tracing::debug!(robot_id, intent = %intent, "no command broker, command dropped");
    }
}

#[async_trait]
impl CommandSink for MqttPublisher {
    async fn publish(&self, robot_id: &str, intent: Intent) {
        if !self.connected.load(Ordering::SeqCst) {
            tracing::warn!(robot_id, intent = %intent, "MQTT disconnected, command skipped");
            return;
        }

        let topic = format!("{}/{robot_id}", self.topic_base);
        let payload = serde_json::json!({
            "robot_id": robot_id,
            "response": intent.as_str(),
        });

        match self
            .client
            .publish(&topic, QoS::AtLeastOnce, false, payload.to_string())
            .await
        {
            Ok(()) => {
                tracing::info!(robot_id, intent = %intent, topic = %topic, "command published");
            }
            Err(e) => {
                tracing::warn!(robot_id, intent = %intent, error = %e, "command publish failed");
            }
        }
    }
}
