//! Topic-named fan-out of parameter patches.

use std::collections::HashMap;
use std::panic::Location;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use crate::uniforms::WarpParams;

/// Topic the upstream physics feed publishes canonical parameter sets on.
pub const UNIFORMS_TOPIC: &str = "warp:uniforms";

/// A published patch and the source line that published it.
pub type Delivery = (WarpParams, &'static Location<'static>);

/// Receiving end of one subscription.
pub struct Subscription {
    topic: String,
    rx: Receiver<Delivery>,
}

impl Subscription {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Next pending patch, without blocking.
    pub fn try_next(&self) -> Option<WarpParams> {
        self.try_next_traced().map(|(patch, _)| patch)
    }

    /// Like [`Subscription::try_next`], also returning where it was published.
    pub fn try_next_traced(&self) -> Option<Delivery> {
        match self.rx.try_recv() {
            Ok(delivery) => Some(delivery),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                log::debug!("bus for '{}' dropped", self.topic);
                None
            }
        }
    }
}

#[derive(Default)]
pub struct UniformBus {
    topics: HashMap<String, Vec<Sender<Delivery>>>,
}

impl UniformBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, topic: &str) -> Subscription {
        let (tx, rx) = mpsc::channel();
        self.topics.entry(topic.to_string()).or_default().push(tx);
        Subscription {
            topic: topic.to_string(),
            rx,
        }
    }

    /// Deliver `patch` to every live subscriber of `topic` and return how
    /// many received it. Subscribers whose receiver is gone are dropped.
    #[track_caller]
    pub fn publish(&mut self, topic: &str, patch: &WarpParams) -> usize {
        let origin = Location::caller();
        let Some(subscribers) = self.topics.get_mut(topic) else {
            log::trace!("{}: publish on '{}' with no subscribers", origin, topic);
            return 0;
        };
        subscribers.retain(|tx| tx.send((patch.clone(), origin)).is_ok());
        subscribers.len()
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics.get(topic).map_or(0, Vec::len)
    }
}
