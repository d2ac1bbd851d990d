//! Runtime hook installation point.
//!
//! The runtime tracker is meant to be installed into a host script
//! interpreter's line/call events. This crate has no such interpreter to
//! hook into, so the installation point is a trait: a real embedding
//! implements `HostHookInstaller` against its interpreter's instrumentation
//! API, while `NullHost` exercises the contract in tests.

use crate::error::EngineError;
use std::sync::Arc;

/// Invoked with `(source_path, line)` each time the host interpreter
/// executes a line.
pub type LineHookFn = Arc<dyn Fn(&str, usize) + Send + Sync>;

/// Invoked with `(source_path, line)` each time the host interpreter enters
/// a function call whose definition starts on that line.
pub type CallHookFn = Arc<dyn Fn(&str, usize) + Send + Sync>;

pub trait HostHookInstaller: Send + Sync {
    fn install_line_hook(&self, callback: LineHookFn) -> Result<(), EngineError>;
    fn install_call_hook(&self, callback: CallHookFn) -> Result<(), EngineError>;
    fn uninstall(&self) -> Result<(), EngineError>;
}

/// Test double standing in for a real host interpreter. Records whether
/// hooks were installed and lets tests invoke them directly.
#[derive(Default)]
pub struct NullHost {
    line_hook: std::sync::Mutex<Option<LineHookFn>>,
    call_hook: std::sync::Mutex<Option<CallHookFn>>,
}

impl NullHost {
    pub fn new() -> Self {
        NullHost::default()
    }

    pub fn fire_line(&self, path: &str, line: usize) {
        if let Some(cb) = self.line_hook.lock().unwrap().as_ref() {
            cb(path, line);
        }
    }

    pub fn fire_call(&self, path: &str, line: usize) {
        if let Some(cb) = self.call_hook.lock().unwrap().as_ref() {
            cb(path, line);
        }
    }
}

impl HostHookInstaller for NullHost {
    fn install_line_hook(&self, callback: LineHookFn) -> Result<(), EngineError> {
        *self.line_hook.lock().unwrap() = Some(callback);
        Ok(())
    }

    fn install_call_hook(&self, callback: CallHookFn) -> Result<(), EngineError> {
        *self.call_hook.lock().unwrap() = Some(callback);
        Ok(())
    }

    fn uninstall(&self) -> Result<(), EngineError> {
        *self.line_hook.lock().unwrap() = None;
        *self.call_hook.lock().unwrap() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn null_host_delivers_installed_line_hook() {
        let host = NullHost::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen2 = seen.clone();
        host.install_line_hook(Arc::new(move |_path, line| {
            seen2.store(line, Ordering::SeqCst);
        }))
        .unwrap();
        host.fire_line("widgets.lua", 7);
        assert_eq!(seen.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn uninstall_silences_future_events() {
        let host = NullHost::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen2 = seen.clone();
        host.install_line_hook(Arc::new(move |_path, line| {
            seen2.store(line, Ordering::SeqCst);
        }))
        .unwrap();
        host.uninstall().unwrap();
        host.fire_line("widgets.lua", 7);
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }
}
