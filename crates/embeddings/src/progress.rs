use tokio::sync::mpsc;

/// Progress of one `embed_batch` call, reported per API batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub batches_done: usize,
    pub batches_total: usize,
    pub texts_done: usize,
    pub texts_total: usize,
}

pub type ProgressSender = mpsc::UnboundedSender<ProgressEvent>;
pub type ProgressReceiver = mpsc::UnboundedReceiver<ProgressEvent>;

/// Create a progress channel the caller may drain while a scan runs.
pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::unbounded_channel()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_flow_through_channel() {
        let (tx, mut rx) = progress_channel();
        tx.send(ProgressEvent {
            batches_done: 1,
            batches_total: 4,
            texts_done: 32,
            texts_total: 128,
        })
        .unwrap();
        drop(tx);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.batches_done, 1);
        assert_eq!(event.texts_total, 128);
        assert!(rx.recv().await.is_none());
    }
}
