//! Developer "level 6" logging for evaluation bench lines.
//!
//! Every line goes to the `stac_static::dev6` target at TRACE. A thread can also open a
//! [`Capture`] to collect its own lines, which keeps assertions free of global logger state.

use serde_json::Value;
use std::cell::RefCell;

thread_local! {
    static CAPTURED: RefCell<Option<Vec<String>>> = const { RefCell::new(None) };
}

/// Collects dev6 lines emitted on the current thread until dropped.
#[must_use = "lines are only captured while the guard is alive"]
pub struct Capture {
    // Thread-bound: the buffer lives in this thread's local storage.
    _not_send: std::marker::PhantomData<*const ()>,
}

/// Starts capturing on the current thread, discarding anything captured before.
pub fn capture() -> Capture {
    CAPTURED.with(|c| *c.borrow_mut() = Some(Vec::new()));
    Capture { _not_send: std::marker::PhantomData }
}

impl Capture {
    /// Removes and returns everything captured so far.
    pub fn take(&self) -> Vec<String> {
        CAPTURED.with(|c| c.borrow_mut().as_mut().map(std::mem::take).unwrap_or_default())
    }

    pub fn peek(&self) -> Vec<String> {
        CAPTURED.with(|c| c.borrow().clone().unwrap_or_default())
    }

    /// Parsed search bench lines for `op` (e.g. `"evaluate"`), leaving the buffer intact.
    pub fn bench_lines(&self, op: &str) -> Vec<Value> {
        self.peek()
            .iter()
            .filter_map(|l| serde_json::from_str::<Value>(l).ok())
            .filter(|v| v["bench"] == "search" && v["op"] == op)
            .collect()
    }
}

impl Drop for Capture {
    fn drop(&mut self) {
        CAPTURED.with(|c| *c.borrow_mut() = None);
    }
}

/// Appends `line` to the current thread's capture, if one is open.
pub fn record(line: &str) {
    CAPTURED.with(|c| {
        if let Some(buf) = c.borrow_mut().as_mut() {
            buf.push(line.to_owned());
        }
    });
}

/// Emit a developer log (level 6) and record it in the thread's capture if one is open.
#[macro_export]
macro_rules! dev6 {
    ($($arg:tt)*) => {{
        let __line = format!($($arg)*);
        $crate::utils::devlog::record(&__line);
        log::log!(target: "stac_static::dev6", log::Level::Trace, "{}", __line);
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bench_lines_are_parsed_by_op() {
        let cap = capture();
        crate::dev6!("{{\"bench\":\"search\",\"op\":\"evaluate\",\"scanned\":{}}}", 3);
        crate::dev6!("{{\"bench\":\"search\",\"op\":\"other\"}}");
        crate::dev6!("not json");
        let lines = cap.bench_lines("evaluate");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["scanned"], 3);
        assert_eq!(cap.take().len(), 3);
        assert!(cap.peek().is_empty());
    }

    #[test]
    fn other_threads_are_not_captured() {
        let cap = capture();
        crate::dev6!("main");
        let child = std::thread::spawn(|| {
            crate::dev6!("child");
        });
        child.join().unwrap();
        assert_eq!(cap.take(), vec!["main".to_string()]);
    }

    #[test]
    fn nothing_recorded_after_drop() {
        {
            let _cap = capture();
            crate::dev6!("inside");
        }
        crate::dev6!("outside");
        let cap = capture();
        assert!(cap.peek().is_empty());
    }
}
