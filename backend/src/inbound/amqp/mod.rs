//! AMQP inbound adapter consuming rating-change events.

pub mod consumer;
pub mod message;
pub mod topology;

pub use consumer::{RatingConsumer, ReconnectPolicy};
pub use message::{Disposition, RatingMessage};
