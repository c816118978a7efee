//! Buffered byte consumer with latched cancellation.
//!
//! Both ends of the pipeline push bytes through the same abstraction: the
//! transcriber fills a phoncode buffer that flushes into the synthesizer,
//! and the sound producer fills the caller's wave buffer that flushes into
//! the user callback.  A consumer that returns `true` latches the sink's
//! status; once latched no further deliveries happen, but the sink keeps
//! absorbing writes so upstream loops can drain at their next boundary.

/// Receiving end of a [`Sink`].
pub trait Consumer {
    /// Receive the buffered bytes.  Returning `true` aborts synthesis.
    ///
    /// The whole backing buffer is passed, not just the filled prefix:
    /// consumers that post-process in place (the transcription callback
    /// appends a synthetic terminator) rely on the guard tail beyond `len`.
    fn consume(&mut self, buffer: &mut [u8], len: usize) -> bool;

    /// Custom reset: refill the buffer and return the new starting offset.
    ///
    /// The default implementation leaves the buffer alone and restarts at
    /// offset zero.
    fn reset(&mut self, _buffer: &mut [u8]) -> usize {
        0
    }
}

/// A byte sink over a borrowed buffer.
///
/// `threshold` is the flush boundary; the buffer itself may be longer,
/// leaving guard space that [`Sink::write`] can transiently run into.
pub struct Sink<'a, C> {
    buffer: &'a mut [u8],
    offset: usize,
    threshold: usize,
    status: bool,
    pub consumer: C,
}

impl<'a, C: Consumer> Sink<'a, C> {
    /// Sink that flushes when the whole buffer is full.
    pub fn new(buffer: &'a mut [u8], consumer: C) -> Self {
        let threshold = buffer.len();
        Sink { buffer, offset: 0, threshold, status: false, consumer }
    }

    /// Sink that flushes at `threshold`, keeping the rest as guard space.
    pub fn with_threshold(buffer: &'a mut [u8], threshold: usize, consumer: C) -> Self {
        debug_assert!(threshold <= buffer.len());
        Sink { buffer, offset: 0, threshold, status: false, consumer }
    }

    /// Latched termination state.
    pub fn status(&self) -> bool {
        self.status
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Run the consumer's reset action.
    pub fn reset(&mut self) {
        self.offset = self.consumer.reset(self.buffer);
    }

    /// Deliver the buffered bytes and reset.
    ///
    /// A latched status suppresses the delivery; the reset still happens so
    /// the buffer keeps absorbing whatever upstream produces before it
    /// notices the latch.
    pub fn flush(&mut self) {
        if self.offset > 0 && !self.status {
            let aborted = self.consumer.consume(self.buffer, self.offset);
            self.status |= aborted;
        }
        self.reset();
    }

    /// Append one byte, flushing when the threshold is reached.
    pub fn put(&mut self, byte: u8) {
        self.buffer[self.offset] = byte;
        self.offset += 1;
        if self.offset >= self.threshold {
            self.flush();
        }
    }

    /// Append a block, flushing afterwards if the threshold was reached.
    ///
    /// The block is written before the boundary check, so a single write may
    /// transiently overrun the threshold by up to the block size.  Callers
    /// keep every atomic block smaller than the guard space.
    pub fn write(&mut self, block: &[u8]) {
        debug_assert!(
            self.offset + block.len() <= self.buffer.len(),
            "block of {} bytes exceeds the guard space",
            block.len()
        );
        self.buffer[self.offset..self.offset + block.len()].copy_from_slice(block);
        self.offset += block.len();
        if self.offset >= self.threshold {
            self.flush();
        }
    }

    /// Forget the last byte if there is one.
    pub fn back(&mut self) {
        if self.offset > 0 {
            self.offset -= 1;
        }
    }

    /// Replace the last byte; on an empty buffer acts like [`Sink::put`].
    pub fn replace(&mut self, byte: u8) {
        self.back();
        self.put(byte);
    }

    /// The last buffered byte, or `None` when the buffer is empty.
    pub fn last(&self) -> Option<u8> {
        self.offset.checked_sub(1).map(|i| self.buffer[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Collects every flushed chunk, aborting after `stop_after` calls.
    struct Collector {
        chunks: Vec<Vec<u8>>,
        stop_after: usize,
    }

    impl Consumer for Collector {
        fn consume(&mut self, buffer: &mut [u8], len: usize) -> bool {
            self.chunks.push(buffer[..len].to_vec());
            self.chunks.len() >= self.stop_after
        }
    }

    fn collector() -> Collector {
        Collector { chunks: Vec::new(), stop_after: usize::MAX }
    }

    #[test]
    fn test_put_flushes_at_threshold() {
        let mut buf = [0u8; 4];
        let mut sink = Sink::new(&mut buf, collector());
        for b in 0..6u8 {
            sink.put(b);
        }
        assert_eq!(sink.consumer.chunks, vec![vec![0, 1, 2, 3]]);
        assert_eq!(sink.offset(), 2);
    }

    #[test]
    fn test_write_overruns_into_guard() {
        let mut buf = [0u8; 8];
        let mut sink = Sink::with_threshold(&mut buf, 4, collector());
        sink.put(1);
        sink.put(2);
        sink.put(3);
        sink.write(&[4, 5, 6]);
        assert_eq!(sink.consumer.chunks, vec![vec![1, 2, 3, 4, 5, 6]]);
        assert_eq!(sink.offset(), 0);
    }

    #[test]
    fn test_back_replace_last() {
        let mut buf = [0u8; 8];
        let mut sink = Sink::new(&mut buf, collector());
        assert_eq!(sink.last(), None);
        sink.put(7);
        sink.put(8);
        assert_eq!(sink.last(), Some(8));
        sink.replace(9);
        assert_eq!(sink.last(), Some(9));
        sink.back();
        assert_eq!(sink.last(), Some(7));
    }

    #[test]
    fn test_status_latches_and_suppresses_delivery() {
        let mut buf = [0u8; 2];
        let mut sink = Sink::new(
            &mut buf,
            Collector { chunks: Vec::new(), stop_after: 1 },
        );
        sink.put(1);
        sink.put(2);
        assert!(sink.status());
        // Further writes are absorbed but never delivered.
        sink.put(3);
        sink.put(4);
        sink.flush();
        assert_eq!(sink.consumer.chunks.len(), 1);
    }

    #[test]
    fn test_empty_flush_skips_consumer() {
        let mut buf = [0u8; 4];
        let mut sink = Sink::new(&mut buf, collector());
        sink.flush();
        assert!(sink.consumer.chunks.is_empty());
    }
}
