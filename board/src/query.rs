use kiddee_protocol::{
    report::{FirmwareVersion, ProtocolVersion},
    types::{PinCapabilities, PinMode},
};
use std::time::Duration;
use tokio::sync::watch;

/// Holds the latest reply to one kind of query and wakes anyone waiting
/// for it.
#[derive(Debug)]
pub(crate) struct QuerySlot<T> {
    tx: watch::Sender<Option<T>>,
}

impl<T: Clone> QuerySlot<T> {
    pub(crate) fn new() -> Self {
        Self {
            tx: watch::Sender::new(None),
        }
    }

    pub(crate) fn clear(&self) {
        self.tx.send_replace(None);
    }

    pub(crate) fn set(&self, value: T) {
        self.tx.send_replace(Some(value));
    }

    pub(crate) fn take(&self) -> Option<T> {
        self.tx.send_replace(None)
    }

    /// Waits for the slot to be filled. Returns `None` on timeout.
    pub(crate) async fn wait(&self, timeout: Duration) -> Option<T> {
        let mut rx = self.tx.subscribe();
        let value = match tokio::time::timeout(timeout, rx.wait_for(Option::is_some)).await {
            Ok(Ok(value)) => value.clone(),
            _ => None,
        };
        value
    }
}

/// Reply to a pin state query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinState {
    pub pin: u8,
    pub mode: u8,
    /// Output level, PWM duty or pull-up flag depending on `mode`.
    pub state: u32,
}

impl PinState {
    pub fn pin_mode(&self) -> Option<PinMode> {
        PinMode::from_repr(self.mode)
    }
}

/// Reply slots for every request/response exchange.
#[derive(Debug)]
pub(crate) struct QueryReplies {
    pub(crate) firmware: QuerySlot<FirmwareVersion>,
    pub(crate) version: QuerySlot<ProtocolVersion>,
    pub(crate) analog_map: QuerySlot<Vec<u8>>,
    pub(crate) capabilities: QuerySlot<Vec<PinCapabilities>>,
    pub(crate) pin_state: QuerySlot<PinState>,
}

impl QueryReplies {
    pub(crate) fn new() -> Self {
        Self {
            firmware: QuerySlot::new(),
            version: QuerySlot::new(),
            analog_map: QuerySlot::new(),
            capabilities: QuerySlot::new(),
            pin_state: QuerySlot::new(),
        }
    }
}
