//! Transport abstraction for the pub/sub link.
//!
//! The telemetry publisher only needs to hand a payload to the client and
//! get back an id it will later see acknowledged.  Connection changes and
//! acknowledgements arrive as [`LinkEvent`]s on their own channel rather
//! than as callbacks into publisher state.

use core::fmt;

/// Transport-assigned identifier of one publish attempt.
pub type DeliveryId = u32;

/// Delivery guarantee requested from the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qos {
    AtMostOnce,
    AtLeastOnce,
}

/// Asynchronous notifications from the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    Connected,
    Disconnected,
    /// The broker acknowledged the publish with this id.
    Delivered(DeliveryId),
}

/// Why a publish could not be handed to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishError {
    /// No session with the broker.
    NotConnected,
    /// The client's outbox is full.
    Busy,
    /// Any other client failure (carries the platform error code).
    Failed(i32),
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "not connected"),
            Self::Busy => write!(f, "outbox full"),
            Self::Failed(code) => write!(f, "publish failed ({code})"),
        }
    }
}

/// Outbound side of the link.
pub trait PublishPort {
    /// Enqueue `payload` for sending.  Returns once the client has accepted
    /// it, not when the broker acknowledges.
    fn publish(&mut self, topic: &str, payload: &[u8], qos: Qos) -> Result<DeliveryId, PublishError>;
}

impl<P: PublishPort + ?Sized> PublishPort for &mut P {
    fn publish(&mut self, topic: &str, payload: &[u8], qos: Qos) -> Result<DeliveryId, PublishError> {
        (**self).publish(topic, payload, qos)
    }
}

/// An absent transport: everything stays buffered.
impl<P: PublishPort> PublishPort for Option<P> {
    fn publish(&mut self, topic: &str, payload: &[u8], qos: Qos) -> Result<DeliveryId, PublishError> {
        match self {
            Some(link) => link.publish(topic, payload, qos),
            None => Err(PublishError::NotConnected),
        }
    }
}
