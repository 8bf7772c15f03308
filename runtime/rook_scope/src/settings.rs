//! Namespace-scoped interpreter settings and the per-thread view of them.
//!
//! Entering a namespace swaps in that namespace's own settings copy, so
//! number formatting, interrupt behavior and the hot criterion are all
//! scoped to where code was defined rather than where it is called from.

use rook_var::VarSettings;

/// Statements between interruption polls for interruptible threads.
pub const DEFAULT_PEEK_FREQUENCY: u32 = 5;

/// Per-namespace copy of the interpreter settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// Storage and formatting policy for variables declared here.
    pub var: VarSettings,
    /// Active hotkey-context criterion, cleared before a namespace's own
    /// auto-init section runs.
    pub hot_criterion: Option<Box<str>>,
    /// Every thread whose first instruction lies in this namespace starts
    /// critical (uninterruptible until it yields).
    pub launches_critical: bool,
    /// Poll interval for threads launched here that allow interruption.
    pub peek_frequency: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            var: VarSettings::default(),
            hot_criterion: None,
            launches_critical: false,
            peek_frequency: DEFAULT_PEEK_FREQUENCY,
        }
    }
}

/// Interrupt-related state of one logical script thread.
///
/// Cooperative scheduling: the statement loop asks [`ThreadState::should_poll`]
/// between statements; a critical thread skips polling entirely until it
/// voluntarily yields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ThreadState {
    pub critical: bool,
    pub peek_frequency: u32,
    pub allow_interrupt: bool,
}

impl ThreadState {
    /// State for a thread whose first instruction lies in a namespace with
    /// the given settings.
    pub fn launched_in(settings: &Settings) -> Self {
        ThreadState {
            critical: settings.launches_critical,
            peek_frequency: settings.peek_frequency,
            allow_interrupt: !settings.launches_critical,
        }
    }

    /// Whether the statement loop should check for pending interruptions
    /// after `statements_run` statements.
    pub fn should_poll(&self, statements_run: u64) -> bool {
        self.allow_interrupt
            && self.peek_frequency != 0
            && statements_run % u64::from(self.peek_frequency) == 0
    }

    /// Voluntary yield: a critical thread becomes interruptible again.
    pub fn yield_now(&mut self) {
        self.critical = false;
        self.allow_interrupt = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn critical_namespace_suppresses_polling() {
        let settings = Settings {
            launches_critical: true,
            ..Settings::default()
        };
        let mut thread = ThreadState::launched_in(&settings);
        assert!(!thread.should_poll(DEFAULT_PEEK_FREQUENCY as u64));

        thread.yield_now();
        assert!(thread.should_poll(DEFAULT_PEEK_FREQUENCY as u64));
        assert!(!thread.should_poll(DEFAULT_PEEK_FREQUENCY as u64 + 1));
    }

    #[test]
    fn peek_frequency_is_namespace_scoped() {
        let settings = Settings {
            peek_frequency: 2,
            ..Settings::default()
        };
        let thread = ThreadState::launched_in(&settings);
        assert_eq!(thread.peek_frequency, 2);
        assert!(thread.should_poll(4));
        assert!(!thread.should_poll(5));
    }
}
