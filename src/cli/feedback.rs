//! Terminal implementations of the wizard's notification and navigation hooks.

use std::sync::Mutex;

use crate::cli::output;
use crate::wizard::{Navigator, Notification, NotificationKind, Notifier};

#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        let text = format!("{}: {}", notification.title, notification.description);
        match notification.kind {
            NotificationKind::Success => output::success(text),
            NotificationKind::Error => output::error(text),
            NotificationKind::Info => output::info(text),
        }
    }
}

/// Prints redirects and remembers the last destination.
#[derive(Debug, Default)]
pub struct ConsoleNavigator {
    last: Mutex<Option<String>>,
}

impl ConsoleNavigator {
    pub fn take_destination(&self) -> Option<String> {
        self.last.lock().expect("navigator lock poisoned").take()
    }
}

impl Navigator for ConsoleNavigator {
    fn navigate(&self, destination: &str) {
        output::info(format!("Redirecting to {destination}"));
        *self.last.lock().expect("navigator lock poisoned") = Some(destination.to_string());
    }
}
