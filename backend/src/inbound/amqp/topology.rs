//! Exchange, queue and binding names for rating events.

use lapin::options::{ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::{Channel, ExchangeKind};

use crate::domain::RatingEventKind;

/// Durable direct exchange the review service publishes to.
pub const RATING_EXCHANGE: &str = "rating-exchange";

/// One queue the consumer drains, and the event kind it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatingSubscription {
    pub queue: &'static str,
    pub routing_key: &'static str,
    pub kind: RatingEventKind,
}

/// Ratings added by learners.
pub const ADD_SUBSCRIPTION: RatingSubscription = RatingSubscription {
    queue: "rate-course-queue",
    routing_key: "rate.course",
    kind: RatingEventKind::Add,
};

/// Ratings withdrawn by learners.
pub const REMOVE_SUBSCRIPTION: RatingSubscription = RatingSubscription {
    queue: "delete-rate-course-queue",
    routing_key: "delete.rate.course",
    kind: RatingEventKind::Remove,
};

/// Every subscription, each consumed by its own task.
pub const SUBSCRIPTIONS: [RatingSubscription; 2] = [ADD_SUBSCRIPTION, REMOVE_SUBSCRIPTION];

/// Declare the exchange, `subscription`'s queue and their binding.
///
/// Declarations are idempotent, so every consumer channel runs this on start.
pub async fn declare(channel: &Channel, subscription: RatingSubscription) -> lapin::Result<()> {
    channel
        .exchange_declare(
            RATING_EXCHANGE,
            ExchangeKind::Direct,
            ExchangeDeclareOptions {
                durable: true,
                ..ExchangeDeclareOptions::default()
            },
            FieldTable::default(),
        )
        .await?;
    channel
        .queue_declare(
            subscription.queue,
            QueueDeclareOptions {
                durable: true,
                ..QueueDeclareOptions::default()
            },
            FieldTable::default(),
        )
        .await?;
    channel
        .queue_bind(
            subscription.queue,
            RATING_EXCHANGE,
            subscription.routing_key,
            QueueBindOptions::default(),
            FieldTable::default(),
        )
        .await
}
