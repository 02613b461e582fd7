use super::Theme;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;

/// `WM_SETTINGCHANGE` area string sent when the light/dark preference flips.
pub const THEME_CHANGE_AREA: &str = "ImmersiveColorSet";

pub type Task = Box<dyn FnOnce() + Send>;

/// Runs tasks on the UI's own thread, whatever thread they were posted from.
pub trait UiDispatcher: Send + Sync {
    fn dispatch(&self, task: Task);
}

/// A dispatcher backed by a channel that the UI thread drains through [`TaskQueue`].
pub struct ChannelDispatcher {
    sender: Mutex<Sender<Task>>,
}

impl ChannelDispatcher {
    pub fn new() -> (Self, TaskQueue) {
        let (sender, receiver) = channel();
        (
            Self {
                sender: Mutex::new(sender),
            },
            TaskQueue { receiver },
        )
    }
}

impl UiDispatcher for ChannelDispatcher {
    fn dispatch(&self, task: Task) {
        if self.sender.lock().send(task).is_err() {
            warn!("UI task queue is gone, dropping task");
        }
    }
}

pub struct TaskQueue {
    receiver: Receiver<Task>,
}

impl TaskQueue {
    /// Runs every queued task without blocking. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut count = 0;
        while let Ok(task) = self.receiver.try_recv() {
            task();
            count += 1;
        }
        count
    }

    /// Waits up to `timeout` for one task and runs it.
    ///
    /// Returns `false` on timeout or when every dispatcher has been dropped.
    pub fn run_next(&self, timeout: Duration) -> bool {
        match self.receiver.recv_timeout(timeout) {
            Ok(task) => {
                task();
                true
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }
}

type Detect = Arc<dyn Fn() -> bool + Send + Sync>;

struct Listener {
    detect: Detect,
    dispatcher: Arc<dyn UiDispatcher>,
    callback: Arc<dyn Fn(Theme) + Send + Sync>,
}

// Listeners live for the whole process, there is no unregister.
static LISTENERS: Lazy<Mutex<Vec<Listener>>> = Lazy::new(|| Mutex::new(Vec::new()));

pub(super) fn register(
    detect: Detect,
    dispatcher: Arc<dyn UiDispatcher>,
    callback: Arc<dyn Fn(Theme) + Send + Sync>,
) {
    let mut listeners = LISTENERS.lock();
    listeners.push(Listener {
        detect,
        dispatcher,
        callback,
    });
    if listeners.len() > 1 {
        warn!("{} theme listeners registered", listeners.len());
    }
    drop(listeners);

    #[cfg(windows)]
    super::watcher::ensure_started();
}

/// Entry point for the OS setting-change notification, on whatever thread it arrives.
///
/// Returns how many listeners were notified.
pub fn notify_setting_change(area: &str) -> usize {
    if area != THEME_CHANGE_AREA {
        return 0;
    }
    let listeners: Vec<_> = LISTENERS
        .lock()
        .iter()
        .map(|v| (v.detect.clone(), v.dispatcher.clone(), v.callback.clone()))
        .collect();
    // dispatchers may run tasks inline, which can register listeners
    for (detect, dispatcher, callback) in &listeners {
        let theme = Theme::from_light(detect());
        let callback = callback.clone();
        dispatcher.dispatch(Box::new(move || callback(theme)));
    }
    debug!("theme changed, notified {} listener(s)", listeners.len());
    listeners.len()
}
