//! Zombie Blaster simulation core
//!
//! A fixed-timestep arcade simulation over a security-remediation backend:
//! eliminating a hostile in the game asks an external service to quarantine
//! the identity it stands for. The crate owns the world, collision, the mode
//! state machine, quests and arcade sessions; rendering and the real security
//! API sit behind traits.

/// Check an internal consistency condition. Logs at error level and panics in
/// debug builds; release builds continue. Evaluates to the condition.
macro_rules! invariant {
    ($cond:expr, $($arg:tt)+) => {{
        let ok = $cond;
        if !ok {
            tracing::error!($($arg)+);
            debug_assert!(ok, $($arg)+);
        }
        ok
    }};
}

pub mod config;
pub mod game;
pub mod remediation;
pub mod util;
