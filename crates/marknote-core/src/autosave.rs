use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use tracing::trace;

use crate::debounce::Debouncer;

/// Quiet period after the last edit before an autosave happens.
pub const AUTOSAVE_DELAY: Duration = Duration::from_millis(2000);

/// How pending autosaves are tracked across open documents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AutosavePolicy {
    /// One timer per edited document; each document is saved after its own
    /// quiet period.
    #[default]
    PerFile,
    /// A single timer shared by every document. Any edit restarts it and the
    /// firing saves whichever document is active at that moment, so an edit
    /// to a document that is no longer active can stay unsaved.
    Global,
}

/// Pending autosave timers for a session.
#[derive(Clone, Debug)]
pub struct Autosave {
    policy: AutosavePolicy,
    delay: Duration,
    shared: Debouncer,
    per_file: BTreeMap<PathBuf, Debouncer>,
}

impl Autosave {
    pub fn new(policy: AutosavePolicy, delay: Duration) -> Self {
        Self {
            policy,
            delay,
            shared: Debouncer::new(delay),
            per_file: BTreeMap::new(),
        }
    }

    /// Restart the countdown for an edit to `path`.
    pub fn arm(&mut self, path: &Path, now: Instant) {
        trace!(path = %path.display(), policy = ?self.policy, "autosave armed");
        let delay = self.delay;
        match self.policy {
            AutosavePolicy::Global => self.shared.arm(now),
            AutosavePolicy::PerFile => self
                .per_file
                .entry(path.to_path_buf())
                .or_insert_with(|| Debouncer::new(delay))
                .arm(now),
        }
    }

    /// Schedule documents that were already dirty when autosave was turned
    /// on. The shared timer is only armed when the active document is among
    /// them, since that is the document it saves.
    pub fn resume<'a>(
        &mut self,
        dirty: impl IntoIterator<Item = &'a Path>,
        active: Option<&Path>,
        now: Instant,
    ) {
        for path in dirty {
            if self.policy == AutosavePolicy::PerFile || active == Some(path) {
                self.arm(path, now);
            }
        }
    }

    /// Drop whatever pending save would have covered `path`.
    ///
    /// The shared timer only ever saves the active document, so it is left
    /// alone when `path` is some other document.
    pub fn cancel(&mut self, path: &Path, active: Option<&Path>) {
        match self.policy {
            AutosavePolicy::Global => {
                if active == Some(path) {
                    self.shared.cancel();
                }
            }
            AutosavePolicy::PerFile => {
                self.per_file.remove(path);
            }
        }
    }

    pub fn cancel_all(&mut self) {
        self.shared.cancel();
        self.per_file.clear();
    }

    pub fn is_pending(&self, path: &Path) -> bool {
        match self.policy {
            AutosavePolicy::Global => self.shared.is_armed(),
            AutosavePolicy::PerFile => self.per_file.contains_key(path),
        }
    }

    pub fn has_pending(&self) -> bool {
        self.shared.is_armed() || !self.per_file.is_empty()
    }

    /// Earliest instant at which [`Self::take_due`] will return something.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.per_file
            .values()
            .filter_map(Debouncer::deadline)
            .chain(self.shared.deadline())
            .min()
    }

    /// Paths whose timers fired by `now`. Fired timers are disarmed.
    ///
    /// Under [`AutosavePolicy::Global`] the target is resolved at fire time
    /// from `active`, not from the document that armed the timer.
    pub fn take_due(&mut self, now: Instant, active: Option<&Path>) -> Vec<PathBuf> {
        match self.policy {
            AutosavePolicy::Global => {
                if !self.shared.fire(now) {
                    return Vec::new();
                }
                active.map(Path::to_path_buf).into_iter().collect()
            }
            AutosavePolicy::PerFile => {
                let mut due = Vec::new();
                self.per_file.retain(|path, timer| {
                    if timer.fire(now) {
                        due.push(path.clone());
                        false
                    } else {
                        true
                    }
                });
                due
            }
        }
    }
}

impl Default for Autosave {
    fn default() -> Self {
        Self::new(AutosavePolicy::default(), AUTOSAVE_DELAY)
    }
}
