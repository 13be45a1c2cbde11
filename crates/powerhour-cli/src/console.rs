//! Chat output for the command line: every post and edit is printed.

use async_trait::async_trait;
use powerhour_core::error::Result;
use powerhour_core::ports::{MessageHandle, MessageSink};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct ConsoleMessageSink {
    next_id: AtomicUsize,
}

impl ConsoleMessageSink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageSink for ConsoleMessageSink {
    async fn post_message(&self, channel: &str, text: &str, media: Option<&str>) -> Result<MessageHandle> {
        let handle = MessageHandle::new(format!("msg-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1));
        println!("[#{channel} {handle}] {text}");
        if let Some(url) = media {
            println!("    (image: {url})");
        }
        Ok(handle)
    }

    async fn update_message(&self, channel: &str, handle: &MessageHandle, text: &str) -> Result<()> {
        println!("[#{channel} {handle} edited] {text}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_handles_are_sequential() {
        let sink = ConsoleMessageSink::new();
        let first = sink.post_message("C1", "hello", None).await.unwrap();
        let second = sink.post_message("C1", "again", Some("https://x.test/a.gif")).await.unwrap();
        assert_eq!(first.as_str(), "msg-1");
        assert_eq!(second.as_str(), "msg-2");
        assert!(sink.update_message("C1", &first, "edited").await.is_ok());
    }
}
