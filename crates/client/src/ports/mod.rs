//! Ports layer: contracts between the notification pipeline and the outside world.

pub mod outbound;
