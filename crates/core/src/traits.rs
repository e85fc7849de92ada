//! Core traits for state machines.

/// A state machine that turns commands into actions.
///
/// This is the core abstraction for the simulation lifecycle. Transition
/// logic is implemented as state machines that are:
///
/// - **Synchronous**: No async, no `.await`
/// - **Deterministic**: Same state + command = same actions
/// - **Pure-ish**: Mutates self, but performs no I/O
///
/// # Example
///
/// ```ignore
/// let mut machine = LifecycleMachine::new();
/// for action in machine.handle(Command::Start) {
///     runner.execute(action).await;
/// }
/// ```
pub trait StateMachine {
    /// Inputs the machine reacts to.
    type Command;

    /// Side effects the runner must perform.
    type Action;

    /// Process a command, returning actions to perform.
    ///
    /// # Guarantees
    ///
    /// - **Synchronous**: This method never blocks or awaits
    /// - **Deterministic**: Given the same state and command, always returns the same actions
    /// - **No I/O**: All I/O is performed by the runner via the returned actions
    ///
    /// Actions must be executed in the order returned.
    fn handle(&mut self, command: Self::Command) -> Vec<Self::Action>;
}
