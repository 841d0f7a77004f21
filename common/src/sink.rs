use async_trait::async_trait;

/// Opaque failure reported by a messaging sink.
pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

/// A destination for plain-text notifications.
///
/// Implementations make exactly one delivery attempt per call and
/// surface every transport or API failure as a [`SinkError`].
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Short channel name used in logs (e.g. "telegram").
    fn channel_type(&self) -> &'static str;

    async fn send_text(&self, text: &str) -> Result<(), SinkError>;
}
