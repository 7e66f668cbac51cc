//! Broker consumer feeding rating deliveries to the aggregator.
//!
//! One task per [`RatingSubscription`]. A delivery is acknowledged only after
//! the handler returns; the handler's result decides between ack, reject and
//! requeue (see [`Disposition`]). Each delivery runs under its own
//! [`TraceId`] so aggregator logs can be correlated.
//!
//! Each task owns its broker session. When the connection drops or the
//! delivery stream ends the task reconnects with capped exponential backoff;
//! readiness reports 503 until the queue is attached again.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use lapin::message::Delivery;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicQosOptions, BasicRejectOptions,
};
use lapin::types::FieldTable;
use lapin::{Channel, Connection, ConnectionProperties};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::domain::TraceId;
use crate::domain::ports::{RatingEventHandler, RatingOutcome};
use crate::inbound::http::health::HealthState;

use super::message::{Disposition, RatingMessage};
use super::topology::{self, RatingSubscription, SUBSCRIPTIONS};

/// Keeps the readiness consumer count in step with attached consumers.
struct Attachment<'a>(&'a HealthState);

impl<'a> Attachment<'a> {
    fn new(health: &'a HealthState) -> Self {
        health.consumer_started();
        Self(health)
    }
}

impl Drop for Attachment<'_> {
    fn drop(&mut self) {
        self.0.consumer_stopped();
    }
}

/// Pacing for re-establishing a lost broker session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Pause after the first failed session.
    pub initial_delay: Duration,
    /// Longest pause between attempts.
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl ReconnectPolicy {
    /// Pause before the attempt following `failures` consecutive failed
    /// sessions: doubles from `initial_delay`, capped at `max_delay`.
    #[must_use]
    pub fn delay(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(16);
        self.initial_delay
            .saturating_mul(1 << exponent)
            .min(self.max_delay)
    }
}

/// Rating consumer shared by every subscription task.
pub struct RatingConsumer {
    handler: Arc<dyn RatingEventHandler>,
    health: Arc<HealthState>,
    prefetch: u16,
    reconnect: ReconnectPolicy,
}

impl RatingConsumer {
    /// Build a consumer. `prefetch` bounds unacknowledged deliveries per queue.
    pub fn new(handler: Arc<dyn RatingEventHandler>, health: Arc<HealthState>, prefetch: u16) -> Self {
        Self {
            handler,
            health,
            prefetch: prefetch.max(1),
            reconnect: ReconnectPolicy::default(),
        }
    }

    /// Override reconnect pacing.
    #[must_use]
    pub fn with_reconnect_policy(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Decode and handle one delivery body, returning how to settle it.
    pub async fn process(&self, subscription: RatingSubscription, body: &[u8]) -> Disposition {
        let trace_id = TraceId::generate();
        let span = info_span!(
            "rating_delivery",
            trace_id = %trace_id,
            queue = subscription.queue
        );
        let work = async {
            let message = match RatingMessage::decode(body) {
                Ok(message) => message,
                Err(err) => {
                    warn!(error = %err, "malformed rating delivery, rejecting");
                    return Disposition::Reject;
                }
            };
            let result = self
                .handler
                .handle(message.into_event(subscription.kind))
                .await;
            let disposition = Disposition::for_result(&result);
            match &result {
                Ok(RatingOutcome::Applied { course_id, .. }) => {
                    debug!(course_id = %course_id, "rating delivery applied");
                }
                Ok(RatingOutcome::Skipped { course_id }) => {
                    debug!(course_id = %course_id, "rating delivery skipped");
                }
                Err(err) => {
                    warn!(
                        code = ?err.code(),
                        error = %err,
                        disposition = ?disposition,
                        "rating delivery failed"
                    );
                }
            }
            disposition
        };
        TraceId::scope(trace_id, work.instrument(span)).await
    }

    async fn consume(
        &self,
        channel: Channel,
        subscription: RatingSubscription,
        attached: &mut bool,
    ) -> lapin::Result<()> {
        topology::declare(&channel, subscription).await?;
        channel
            .basic_qos(self.prefetch, BasicQosOptions::default())
            .await?;
        let consumer_tag = format!("course-service-{}", subscription.queue);
        let mut deliveries = channel
            .basic_consume(
                subscription.queue,
                &consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        let _attachment = Attachment::new(&self.health);
        *attached = true;
        info!(queue = subscription.queue, "rating consumer attached");
        while let Some(delivery) = deliveries.next().await {
            let delivery = delivery?;
            let disposition = self.process(subscription, &delivery.data).await;
            settle(&delivery, disposition).await?;
        }
        Ok(())
    }

    /// One broker session: connect, open a channel and consume until the
    /// stream ends or the broker fails.
    async fn session(
        &self,
        uri: &str,
        subscription: RatingSubscription,
        attached: &mut bool,
    ) -> lapin::Result<()> {
        let connection = Connection::connect(uri, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;
        self.consume(channel, subscription, attached).await
    }

    /// Keep `subscription` consumed for as long as the task lives.
    async fn supervise(self: Arc<Self>, uri: Arc<str>, subscription: RatingSubscription) {
        let mut failures = 0_u32;
        loop {
            let mut attached = false;
            match self.session(&uri, subscription, &mut attached).await {
                Ok(()) => warn!(queue = subscription.queue, "rating consumer stream ended"),
                Err(err) => {
                    error!(queue = subscription.queue, error = %err, "rating consumer session failed");
                }
            }
            failures = if attached { 1 } else { failures.saturating_add(1) };
            let delay = self.reconnect.delay(failures);
            info!(
                queue = subscription.queue,
                attempt = failures,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "reconnecting rating consumer"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Start one supervised task per subscription.
    ///
    /// Readiness waits for every subscription to attach. Tasks never finish
    /// on their own; abort the handles on shutdown.
    pub fn spawn(self: Arc<Self>, uri: &str) -> Vec<JoinHandle<()>> {
        self.health.expect_consumers(SUBSCRIPTIONS.len());
        let uri: Arc<str> = Arc::from(uri);
        SUBSCRIPTIONS
            .into_iter()
            .map(|subscription| {
                tokio::spawn(Arc::clone(&self).supervise(Arc::clone(&uri), subscription))
            })
            .collect()
    }
}

async fn settle(delivery: &Delivery, disposition: Disposition) -> lapin::Result<()> {
    match disposition {
        Disposition::Ack => {
            delivery.acker.ack(BasicAckOptions::default()).await?;
        }
        Disposition::Reject => {
            delivery
                .acker
                .reject(BasicRejectOptions { requeue: false })
                .await?;
        }
        Disposition::Requeue => {
            delivery
                .acker
                .nack(BasicNackOptions {
                    requeue: true,
                    ..BasicNackOptions::default()
                })
                .await?;
        }
    }
    Ok(())
}
