//=========================================================================
// Frame Handoff
//=========================================================================
//
// Double-buffered rendezvous between the update thread (producer) and
// the render thread (consumer).
//
// Protocol (one frame):
//   update:  write back buffer ──wait start_update (prev consumed)──┐
//                                                                   │
//            swap front/back, frame_ready = true ─notify start_render
//   render:  wait start_render (frame_ready) → read front buffer
//            consumed = true ─notify start_update
//
// The producer never touches the buffer the consumer reads and runs at
// most one frame ahead. Neither side busy-waits.
//
//=========================================================================

//=== External Dependencies ===============================================

use log::{debug, trace};
use parking_lot::{Condvar, Mutex};

//=== Internal Dependencies ===============================================

use crate::core::error::HandoffError;

//=== HandoffState ========================================================

#[derive(Debug)]
struct HandoffState {
    /// Index of the buffer holding the last published frame.
    front: usize,
    frame_ready: bool,
    consumed: bool,
    closed: bool,
    published: u64,
}

//=== FrameHandoff ========================================================

/// Mutex/condition-variable frame exchange over two buffers.
///
/// Share it between the two threads with an `Arc`.
#[derive(Debug)]
pub struct FrameHandoff<T> {
    state: Mutex<HandoffState>,
    start_render: Condvar,
    start_update: Condvar,
    buffers: [Mutex<T>; 2],
}

impl<T> FrameHandoff<T> {
    /// Creates a handoff over two initial buffers. `back` is written first.
    pub fn new(front: T, back: T) -> Self {
        Self {
            state: Mutex::new(HandoffState {
                front: 0,
                frame_ready: false,
                consumed: true,
                closed: false,
                published: 0,
            }),
            start_render: Condvar::new(),
            start_update: Condvar::new(),
            buffers: [Mutex::new(front), Mutex::new(back)],
        }
    }

    //--- Producer ---------------------------------------------------------

    /// Writes the next frame with `produce`, then publishes it once the
    /// previous frame has been consumed.
    ///
    /// # Errors
    ///
    /// [`HandoffError::Closed`] if the handoff is closed before the frame
    /// could be published. The frame is discarded.
    pub fn producer_wait_and_produce<R>(
        &self,
        produce: impl FnOnce(&mut T) -> R,
    ) -> Result<R, HandoffError> {
        let back = {
            let state = self.state.lock();
            if state.closed {
                return Err(HandoffError::Closed);
            }
            1 - state.front
        };

        let result = produce(&mut *self.buffers[back].lock());

        let mut state = self.state.lock();
        while !state.consumed && !state.closed {
            self.start_update.wait(&mut state);
        }
        if state.closed {
            return Err(HandoffError::Closed);
        }

        state.front = back;
        state.frame_ready = true;
        state.consumed = false;
        state.published += 1;
        trace!(target: "sync", "Published frame {} (buffer {})", state.published, back);
        drop(state);

        self.start_render.notify_one();
        Ok(result)
    }

    //--- Consumer ---------------------------------------------------------

    /// Waits for a published frame and reads it with `consume`.
    ///
    /// A frame published before [`close`](Self::close) is still delivered.
    ///
    /// # Errors
    ///
    /// [`HandoffError::Closed`] if the handoff is closed and no frame is
    /// pending.
    pub fn consumer_wait_and_consume<R>(
        &self,
        consume: impl FnOnce(&T) -> R,
    ) -> Result<R, HandoffError> {
        let front = {
            let mut state = self.state.lock();
            while !state.frame_ready && !state.closed {
                self.start_render.wait(&mut state);
            }
            if !state.frame_ready {
                return Err(HandoffError::Closed);
            }
            state.frame_ready = false;
            state.front
        };

        let result = consume(&*self.buffers[front].lock());

        self.state.lock().consumed = true;
        self.start_update.notify_one();
        Ok(result)
    }

    //--- Lifecycle --------------------------------------------------------

    /// Shuts the handoff down and wakes both sides.
    pub fn close(&self) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        debug!(target: "sync", "Frame handoff closed after {} frames", state.published);
        drop(state);

        self.start_render.notify_all();
        self.start_update.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Number of frames published so far.
    pub fn frames_published(&self) -> u64 {
        self.state.lock().published
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use super::*;

    #[derive(Debug)]
    struct Slot {
        index: usize,
        frame: u64,
    }

    fn handoff() -> FrameHandoff<Slot> {
        FrameHandoff::new(Slot { index: 0, frame: 0 }, Slot { index: 1, frame: 0 })
    }

    //=====================================================================
    // Two-Thread Exchange
    //=====================================================================

    #[test]
    fn frames_delivered_once_in_order_without_overlap() {
        const FRAMES: u64 = 50;

        let handoff = Arc::new(handoff());
        let writing = Arc::new([AtomicBool::new(false), AtomicBool::new(false)]);
        let reading = Arc::new([AtomicBool::new(false), AtomicBool::new(false)]);

        let producer = {
            let handoff = Arc::clone(&handoff);
            let writing = Arc::clone(&writing);
            let reading = Arc::clone(&reading);
            thread::spawn(move || {
                for frame in 1..=FRAMES {
                    handoff
                        .producer_wait_and_produce(|slot| {
                            writing[slot.index].store(true, Ordering::SeqCst);
                            assert!(!reading[slot.index].load(Ordering::SeqCst));
                            slot.frame = frame;
                            thread::yield_now();
                            writing[slot.index].store(false, Ordering::SeqCst);
                        })
                        .unwrap();
                }
            })
        };

        let mut seen = Vec::new();
        for _ in 0..FRAMES {
            let frame = handoff
                .consumer_wait_and_consume(|slot| {
                    reading[slot.index].store(true, Ordering::SeqCst);
                    assert!(!writing[slot.index].load(Ordering::SeqCst));
                    thread::yield_now();
                    reading[slot.index].store(false, Ordering::SeqCst);
                    slot.frame
                })
                .unwrap();
            seen.push(frame);
        }

        producer.join().unwrap();
        assert_eq!(seen, (1..=FRAMES).collect::<Vec<_>>());
        assert_eq!(handoff.frames_published(), FRAMES);
    }

    #[test]
    fn producer_runs_at_most_one_frame_ahead() {
        let handoff = Arc::new(handoff());
        handoff.producer_wait_and_produce(|slot| slot.frame = 1).unwrap();

        let blocked = {
            let handoff = Arc::clone(&handoff);
            thread::spawn(move || handoff.producer_wait_and_produce(|slot| slot.frame = 2))
        };

        thread::sleep(Duration::from_millis(50));
        assert_eq!(handoff.frames_published(), 1);

        assert_eq!(handoff.consumer_wait_and_consume(|slot| slot.frame), Ok(1));
        assert_eq!(blocked.join().unwrap(), Ok(()));
        assert_eq!(handoff.consumer_wait_and_consume(|slot| slot.frame), Ok(2));
    }

    //=====================================================================
    // Shutdown
    //=====================================================================

    #[test]
    fn close_wakes_blocked_consumer() {
        let handoff = Arc::new(handoff());
        let waiter = {
            let handoff = Arc::clone(&handoff);
            thread::spawn(move || handoff.consumer_wait_and_consume(|slot| slot.frame))
        };

        thread::sleep(Duration::from_millis(20));
        handoff.close();
        assert_eq!(waiter.join().unwrap(), Err(HandoffError::Closed));
    }

    #[test]
    fn pending_frame_survives_close() {
        let handoff = handoff();
        handoff.producer_wait_and_produce(|slot| slot.frame = 9).unwrap();
        handoff.close();

        assert!(handoff.is_closed());
        assert_eq!(handoff.consumer_wait_and_consume(|slot| slot.frame), Ok(9));
        assert_eq!(
            handoff.consumer_wait_and_consume(|slot| slot.frame),
            Err(HandoffError::Closed)
        );
        assert_eq!(
            handoff.producer_wait_and_produce(|slot| slot.frame = 10),
            Err(HandoffError::Closed)
        );
    }
}
