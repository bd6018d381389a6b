use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex};

/// Blocking user-facing affordances the session needs.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
    fn confirm(&self, message: &str) -> bool;
    fn open_url(&self, url: &str);
}

/// Terminal notices on stderr, confirmations read from stdin.
pub struct ConsoleNotifier {
    assume_yes: bool,
}

impl ConsoleNotifier {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, message: &str) {
        eprintln!("⚠ {}", message);
    }

    fn confirm(&self, message: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        eprint!("{} [y/N] ", message);
        io::stderr().flush().ok();

        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim(), "y" | "Y" | "yes")
    }

    fn open_url(&self, url: &str) {
        eprintln!("→ {}", url);
    }
}

/// Records notices and answers confirmations with a fixed reply.
#[derive(Clone)]
pub struct MockNotifier {
    notices: Arc<Mutex<Vec<String>>>,
    opened: Arc<Mutex<Vec<String>>>,
    confirm_reply: bool,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self {
            notices: Arc::new(Mutex::new(Vec::new())),
            opened: Arc::new(Mutex::new(Vec::new())),
            confirm_reply: true,
        }
    }

    pub fn with_confirm_reply(mut self, reply: bool) -> Self {
        self.confirm_reply = reply;
        self
    }

    pub fn notices(&self) -> Vec<String> {
        self.notices.lock().unwrap().clone()
    }

    pub fn opened_urls(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

impl Default for MockNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for MockNotifier {
    fn notify(&self, message: &str) {
        self.notices.lock().unwrap().push(message.to_string());
    }

    fn confirm(&self, _message: &str) -> bool {
        self.confirm_reply
    }

    fn open_url(&self, url: &str) {
        self.opened.lock().unwrap().push(url.to_string());
    }
}
