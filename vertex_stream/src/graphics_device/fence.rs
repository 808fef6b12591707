/// Fence handles and wait results

/// Device fence handle
///
/// Signaled once every command submitted before it has completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FenceId(pub u64);

/// Outcome of a client-side fence wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitResult {
    /// The fence was signaled before the wait started
    AlreadySignaled,
    /// The fence became signaled during the wait
    ConditionSatisfied,
    /// The timeout elapsed first
    TimeoutExpired,
    /// The wait itself failed (unknown fence, lost device)
    WaitFailed,
}

impl WaitResult {
    /// Whether the fence is known to be signaled
    pub fn is_signaled(&self) -> bool {
        matches!(self, WaitResult::AlreadySignaled | WaitResult::ConditionSatisfied)
    }
}
