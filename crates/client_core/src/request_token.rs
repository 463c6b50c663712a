use std::sync::atomic::{AtomicU64, Ordering};

/// Independent request streams of a single controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestSlot {
    Lesson,
    Compile,
    Selection,
}

impl RequestSlot {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lesson => "lesson",
            Self::Compile => "compile",
            Self::Selection => "selection",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken {
    slot: RequestSlot,
    seq: u64,
}

impl RequestToken {
    pub fn slot(&self) -> RequestSlot {
        self.slot
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// Monotonic per-slot counters. Only the most recently issued token of a slot
/// is current; responses carrying any older token are dropped by the caller.
#[derive(Debug, Default)]
pub struct RequestTokens {
    lesson: AtomicU64,
    compile: AtomicU64,
    selection: AtomicU64,
}

impl RequestTokens {
    pub fn new() -> Self {
        Self::default()
    }

    fn counter(&self, slot: RequestSlot) -> &AtomicU64 {
        match slot {
            RequestSlot::Lesson => &self.lesson,
            RequestSlot::Compile => &self.compile,
            RequestSlot::Selection => &self.selection,
        }
    }

    pub fn issue(&self, slot: RequestSlot) -> RequestToken {
        let seq = self.counter(slot).fetch_add(1, Ordering::SeqCst) + 1;
        RequestToken { slot, seq }
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.counter(token.slot).load(Ordering::SeqCst) == token.seq
    }

    /// Makes every outstanding token of `slot` stale.
    pub fn invalidate(&self, slot: RequestSlot) {
        self.counter(slot).fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newest_token_is_the_only_current_one() {
        let tokens = RequestTokens::new();
        let first = tokens.issue(RequestSlot::Compile);
        let second = tokens.issue(RequestSlot::Compile);

        assert!(second.seq() > first.seq());
        assert!(!tokens.is_current(first));
        assert!(tokens.is_current(second));
    }

    #[test]
    fn slots_are_independent() {
        let tokens = RequestTokens::new();
        let compile = tokens.issue(RequestSlot::Compile);
        let _selection = tokens.issue(RequestSlot::Selection);

        assert!(tokens.is_current(compile));
    }

    #[test]
    fn invalidate_makes_outstanding_token_stale() {
        let tokens = RequestTokens::new();
        let lesson = tokens.issue(RequestSlot::Lesson);
        tokens.invalidate(RequestSlot::Lesson);

        assert!(!tokens.is_current(lesson));
        assert!(tokens.is_current(tokens.issue(RequestSlot::Lesson)));
    }
}
