//! Cooperative chunk loop shared by the decoder, index builder and join.
//!
//! Work is split into fixed-size chunks. Each chunk runs as one unit;
//! between chunks the loop checks cancellation, reports progress and
//! yields to the runtime so other tasks on the same thread get to run.

use crate::progress::{percent, CancelFlag, Cancelled, ProgressSink, Stage};

/// Chunking parameters for one stage.
#[derive(Clone, Copy)]
pub struct ChunkPlan<'a> {
    pub stage: Stage,
    pub chunk_size: usize,
    pub sink: &'a dyn ProgressSink,
    pub cancel: &'a CancelFlag,
}

impl<'a> ChunkPlan<'a> {
    pub fn new(
        stage: Stage,
        chunk_size: usize,
        sink: &'a dyn ProgressSink,
        cancel: &'a CancelFlag,
    ) -> Self {
        Self {
            stage,
            chunk_size: chunk_size.max(1),
            sink,
            cancel,
        }
    }

    /// Fails once cancellation was requested.
    pub fn check(&self) -> Result<(), Cancelled> {
        self.cancel.check(self.stage)
    }

    /// Close a chunk: report `round(processed / total * 100)` and yield
    /// to the runtime unless the stage is complete.
    pub async fn end_chunk(&self, processed: usize, total: usize) {
        self.sink.progress(self.stage, percent(processed, total));
        if processed < total {
            tokio::task::yield_now().await;
        }
    }

    /// Run `f` over `items` chunk by chunk. Returns the number of chunks.
    ///
    /// Empty input runs no chunk and reports nothing.
    pub async fn run<T, F>(&self, items: &[T], mut f: F) -> Result<usize, Cancelled>
    where
        F: FnMut(usize, &[T]),
    {
        let total = items.len();
        let mut processed = 0;
        let mut chunks = 0;

        for chunk in items.chunks(self.chunk_size) {
            self.check()?;

            f(processed, chunk);
            processed += chunk.len();
            chunks += 1;

            self.end_chunk(processed, total).await;
        }

        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_chunk_count_and_progress() {
        let seen = Mutex::new(Vec::new());
        let sink = |_: Stage, p: u8| seen.lock().unwrap().push(p);
        let cancel = CancelFlag::new();
        let items: Vec<usize> = (0..10).collect();

        let mut offsets = Vec::new();
        let chunks = ChunkPlan::new(Stage::Joining, 4, &sink, &cancel)
            .run(&items, |offset, chunk| offsets.push((offset, chunk.len())))
            .await
            .unwrap();

        assert_eq!(chunks, 3);
        assert_eq!(offsets, vec![(0, 4), (4, 4), (8, 2)]);
        assert_eq!(*seen.lock().unwrap(), vec![40, 80, 100]);
    }

    #[tokio::test]
    async fn test_empty_input_reports_nothing() {
        let seen = Mutex::new(Vec::new());
        let sink = |_: Stage, p: u8| seen.lock().unwrap().push(p);
        let cancel = CancelFlag::new();
        let items: Vec<u8> = Vec::new();

        let chunks = ChunkPlan::new(Stage::BuildingIndex, 10, &sink, &cancel)
            .run(&items, |_, _| panic!("no chunk expected"))
            .await
            .unwrap();

        assert_eq!(chunks, 0);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_stops_at_boundary() {
        let cancel = CancelFlag::new();
        let sink = crate::progress::NoProgress;
        let items: Vec<u32> = (0..100).collect();
        let mut processed = 0;

        let result = ChunkPlan::new(Stage::Joining, 10, &sink, &cancel)
            .run(&items, |_, chunk| {
                processed += chunk.len();
                if processed == 30 {
                    cancel.cancel();
                }
            })
            .await;

        assert_eq!(result, Err(Cancelled(Stage::Joining)));
        assert_eq!(processed, 30);
    }

    #[tokio::test]
    async fn test_end_chunk_reports_progress() {
        let seen = Mutex::new(Vec::new());
        let sink = |stage: Stage, p: u8| seen.lock().unwrap().push((stage, p));
        let cancel = CancelFlag::new();
        let plan = ChunkPlan::new(Stage::DecodingWeb, 10, &sink, &cancel);

        assert!(plan.check().is_ok());
        plan.end_chunk(1, 3).await;
        plan.end_chunk(3, 3).await;
        cancel.cancel();

        assert_eq!(plan.check(), Err(Cancelled(Stage::DecodingWeb)));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![(Stage::DecodingWeb, 33), (Stage::DecodingWeb, 100)]
        );
    }

    #[test]
    fn test_zero_chunk_size_is_clamped() {
        let cancel = CancelFlag::new();
        let plan = ChunkPlan::new(Stage::Joining, 0, &crate::progress::NoProgress, &cancel);
        assert_eq!(plan.chunk_size, 1);
    }
}
