use common::sink::MessageSink;
use tracing::{debug, error};

use crate::error::PollError;

/// Delivers rendered messages to the single configured destination.
pub struct Notifier {
    sink: Box<dyn MessageSink>,
}

impl Notifier {
    pub fn new(sink: Box<dyn MessageSink>) -> Self {
        Self { sink }
    }

    /// One delivery attempt. Failures come back as
    /// [`PollError::Delivery`] carrying the undelivered text.
    pub async fn notify(&self, message: &str) -> Result<(), PollError> {
        match self.sink.send_text(message).await {
            Ok(()) => {
                debug!(channel = self.sink.channel_type(), "Message \"{}\" sent", message);
                Ok(())
            }
            Err(e) => {
                error!(channel = self.sink.channel_type(), "Message delivery failed: {}", e);
                Err(PollError::Delivery {
                    message: message.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
}
