use std::time::Duration;

/// Summary of a successful verification run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified {
    /// Number of script steps evaluated.
    pub steps: usize,
    /// Number of signals consumed, including the subscription.
    pub signals: usize,
    /// True if the script cancelled the subscription.
    pub cancelled: bool,
    /// Logical time reached, for virtual-time runs.
    pub virtual_elapsed: Option<Duration>,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}
