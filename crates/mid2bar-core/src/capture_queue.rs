use mid2bar_ports::audio::AudioCaptureCallback;
use rtrb::{Consumer, Producer, RingBuffer};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Blocks the capture queue holds before new ones are dropped.
pub const CAPTURE_QUEUE_BLOCKS: usize = 8;

#[derive(Debug, Default)]
pub struct CaptureStats {
    captured: AtomicU64,
    dropped: AtomicU64,
}

impl CaptureStats {
    pub fn captured_blocks(&self) -> u64 {
        self.captured.load(Ordering::Relaxed)
    }

    pub fn dropped_blocks(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Audio-thread side. Never blocks: a block that does not fit is discarded.
pub struct CaptureProducer {
    producer: Producer<f32>,
    block_size: usize,
    stats: Arc<CaptureStats>,
}

impl CaptureProducer {
    /// Queues `samples` as one or more blocks, zero-padding the last one.
    pub fn push_samples(&mut self, samples: &[f32]) {
        for chunk in samples.chunks(self.block_size) {
            self.push_block(chunk);
        }
    }

    fn push_block(&mut self, chunk: &[f32]) {
        match self.producer.write_chunk_uninit(self.block_size) {
            Ok(slots) => {
                let padded = chunk.iter().copied().chain(std::iter::repeat(0.0));
                slots.fill_from_iter(padded);
                self.stats.captured.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

impl AudioCaptureCallback for CaptureProducer {
    fn capture(&mut self, block: &[f32]) {
        self.push_samples(block);
    }
}

/// Processing-thread side.
pub struct CaptureConsumer {
    consumer: Consumer<f32>,
    block_size: usize,
}

impl CaptureConsumer {
    /// Moves the oldest queued block into `out`. Returns false when empty.
    pub fn pop_block(&mut self, out: &mut Vec<f32>) -> bool {
        let Ok(chunk) = self.consumer.read_chunk(self.block_size) else {
            return false;
        };
        out.clear();
        let (first, second) = chunk.as_slices();
        out.extend_from_slice(first);
        out.extend_from_slice(second);
        chunk.commit_all();
        true
    }

    pub fn queued_blocks(&self) -> usize {
        self.consumer.slots() / self.block_size
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }
}

pub fn capture_queue(block_size: usize) -> (CaptureProducer, CaptureConsumer, Arc<CaptureStats>) {
    let block_size = block_size.max(1);
    let (producer, consumer) = RingBuffer::new(block_size * CAPTURE_QUEUE_BLOCKS);
    let stats = Arc::new(CaptureStats::default());
    (
        CaptureProducer {
            producer,
            block_size,
            stats: stats.clone(),
        },
        CaptureConsumer {
            consumer,
            block_size,
        },
        stats,
    )
}
