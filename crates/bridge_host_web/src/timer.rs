//! `setTimeout`-backed scheduler.
//!
//! The returned handle owns the [`gloo_timers::callback::Timeout`]; dropping it clears the timer
//! and frees the JS closure together with everything the task captured.

use std::time::Duration;

use bridge_host::{ScheduledTask, Scheduler};
#[cfg(target_arch = "wasm32")]
use gloo_timers::callback::Timeout;

/// Delay handed to `setTimeout`, saturated to its millisecond range.
pub fn timeout_millis(delay: Duration) -> u32 {
    u32::try_from(delay.as_millis()).unwrap_or(u32::MAX)
}

#[derive(Debug, Clone, Copy, Default)]
/// Schedules one-shot tasks on the window timer queue.
pub struct WindowScheduler;

impl Scheduler for WindowScheduler {
    fn schedule_once(&self, delay: Duration, task: Box<dyn FnOnce()>) -> ScheduledTask {
        #[cfg(target_arch = "wasm32")]
        {
            ScheduledTask::new(Timeout::new(timeout_millis(delay), move || task()))
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            let _ = (delay, task);
            ScheduledTask::detached()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use pretty_assertions::assert_eq;
    #[cfg(target_arch = "wasm32")]
    use wasm_bindgen_test::wasm_bindgen_test;

    use super::*;

    #[cfg(target_arch = "wasm32")]
    wasm_bindgen_test::wasm_bindgen_test_configure!(run_in_browser);

    #[test]
    fn delays_saturate_to_the_timer_range() {
        assert_eq!(timeout_millis(Duration::from_millis(500)), 500);
        assert_eq!(timeout_millis(Duration::from_secs(u64::MAX)), u32::MAX);
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
    #[cfg_attr(not(target_arch = "wasm32"), test)]
    fn cancelled_task_releases_its_captures() {
        let captured = Rc::new(());
        let handle = {
            let captured = captured.clone();
            WindowScheduler
                .schedule_once(Duration::from_secs(60), Box::new(move || drop(captured)))
        };

        handle.cancel();
        assert_eq!(Rc::strong_count(&captured), 1);
    }
}
