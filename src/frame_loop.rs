// Cancellable per-frame loop

use crate::surface::FrameScheduler;

/// Self-rescheduling frame loop with an explicit stop.
///
/// Each tick that runs asks the scheduler for the next one. Once cancelled, a
/// tick that was already requested still arrives but does nothing.
#[derive(Debug, Default)]
pub struct FrameLoop {
    running: bool,
    frames: u64,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the loop by requesting the first frame. No-op if already running.
    pub fn start(&mut self, scheduler: &dyn FrameScheduler) {
        if self.running {
            return;
        }
        self.running = true;
        scheduler.request_frame();
    }

    /// Run `frame` if the loop is live, then schedule the next tick.
    pub fn tick<F>(&mut self, scheduler: &dyn FrameScheduler, frame: F) -> bool
    where
        F: FnOnce(),
    {
        if !self.running {
            return false;
        }
        frame();
        self.frames += 1;
        scheduler.request_frame();
        true
    }

    pub fn cancel(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Frames executed since start.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Default)]
    struct CountingScheduler {
        requests: Cell<u32>,
    }

    impl FrameScheduler for CountingScheduler {
        fn request_frame(&self) {
            self.requests.set(self.requests.get() + 1);
        }
    }

    #[test]
    fn each_tick_schedules_the_next() {
        let scheduler = CountingScheduler::default();
        let mut frame_loop = FrameLoop::new();
        frame_loop.start(&scheduler);
        frame_loop.start(&scheduler);
        assert_eq!(scheduler.requests.get(), 1);

        let mut ran = 0;
        for _ in 0..3 {
            frame_loop.tick(&scheduler, || ran += 1);
        }
        assert_eq!(ran, 3);
        assert_eq!(frame_loop.frames(), 3);
        assert_eq!(scheduler.requests.get(), 4);
    }

    #[test]
    fn cancelled_loop_ignores_pending_tick() {
        let scheduler = CountingScheduler::default();
        let mut frame_loop = FrameLoop::new();
        frame_loop.start(&scheduler);
        frame_loop.cancel();

        let mut ran = false;
        assert!(!frame_loop.tick(&scheduler, || ran = true));
        assert!(!ran);
        assert_eq!(scheduler.requests.get(), 1);
    }
}
