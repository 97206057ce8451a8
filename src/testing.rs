//! Helpers shared by unit tests

use std::cell::RefCell;
use std::sync::Once;

use log::{Level, LevelFilter, Log, Metadata, Record};

thread_local! {
    static WARNINGS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

/// Keeps warning records per thread, so tests running in parallel don't see each other's
struct WarningRecorder;

impl Log for WarningRecorder {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Warn
    }

    fn log(&self, record: &Record) {
        if record.level() == Level::Warn {
            WARNINGS.with(|warnings| warnings.borrow_mut().push(record.args().to_string()));
        }
    }

    fn flush(&self) {}
}

static RECORDER: WarningRecorder = WarningRecorder;
static INSTALL: Once = Once::new();

/// Run `f` and return the warnings it logged on this thread
pub fn capture_warnings<F: FnOnce()>(f: F) -> Vec<String> {
    INSTALL.call_once(|| {
        log::set_logger(&RECORDER).expect("no other logger in tests");
        log::set_max_level(LevelFilter::Warn);
    });
    WARNINGS.with(|warnings| warnings.borrow_mut().clear());
    f();
    WARNINGS.with(|warnings| warnings.borrow_mut().drain(..).collect())
}
