use std::time::Duration;

/// Stream and consumer settings for one event channel.
#[derive(Clone, Debug)]
pub struct StreamDef {
    /// JetStream stream name, e.g. `QUIZ_EVENTS`.
    pub stream_name: String,
    /// Subject the stream captures, e.g. `quiz.events`.
    pub subject: String,
    /// Durable consumer name; one per consuming service.
    pub durable_name: String,
    /// How long the broker waits for an ack before redelivering.
    pub ack_wait: Duration,
    /// Delivery attempts before the broker stops redelivering.
    pub max_deliver: i64,
}

impl StreamDef {
    pub fn new(
        stream_name: impl Into<String>,
        subject: impl Into<String>,
        durable_name: impl Into<String>,
    ) -> Self {
        Self {
            stream_name: stream_name.into(),
            subject: subject.into(),
            durable_name: durable_name.into(),
            ack_wait: Duration::from_secs(30),
            max_deliver: 5,
        }
    }

    pub fn with_ack_wait(mut self, ack_wait: Duration) -> Self {
        self.ack_wait = ack_wait;
        self
    }

    pub fn with_max_deliver(mut self, max_deliver: i64) -> Self {
        self.max_deliver = max_deliver;
        self
    }
}
