//! Lock-free input submission
//!
//! Any input source (keyboard thread, controller poller, scripted driver)
//! holds an `InputSender`; the game drains everything at the start of a tick
//! and feeds it through `Game::handle_input`.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};

use crate::util::vec2::Vec2;

/// Everything the player can ask the core to do
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum InputAction {
    /// Held direction; `Vec2::ZERO` stops
    Move(Vec2),
    Jump,
    Fire,
    /// Toggles pause
    Pause,
    AcceptQuest,
    DeclineQuest,
    /// Explicit arcade-mode entry from a level
    EnterArcade,
    /// Scripted/debug boss trigger from a level
    SummonBoss,
}

/// Bounded MPSC queue of input actions
pub struct InputBuffer {
    sender: Sender<InputAction>,
    receiver: Receiver<InputAction>,
    capacity: usize,
}

impl InputBuffer {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Create a new sender handle for an input source
    pub fn sender(&self) -> InputSender {
        InputSender {
            sender: self.sender.clone(),
        }
    }

    /// Try to submit an action (non-blocking). False if the buffer is full.
    #[inline]
    pub fn try_submit(&self, action: InputAction) -> bool {
        self.sender.try_send(action).is_ok()
    }

    /// Drain all pending actions, in submission order
    pub fn drain(&self) -> Vec<InputAction> {
        self.receiver.try_iter().collect()
    }

    #[inline]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InputBuffer {
    fn default() -> Self {
        // A human produces a handful of actions per tick at most
        Self::new(256)
    }
}

/// Clonable sender handle
#[derive(Clone)]
pub struct InputSender {
    sender: Sender<InputAction>,
}

impl InputSender {
    #[inline]
    pub fn try_send(&self, action: InputAction) -> Result<(), InputBufferError> {
        self.sender.try_send(action).map_err(|e| match e {
            TrySendError::Full(_) => InputBufferError::Full,
            TrySendError::Disconnected(_) => InputBufferError::Disconnected,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InputBufferError {
    /// Buffer is full (backpressure)
    #[error("input buffer full")]
    Full,
    /// Game loop dropped the buffer
    #[error("input buffer disconnected")]
    Disconnected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_and_drain_in_order() {
        let buffer = InputBuffer::new(10);
        assert!(buffer.try_submit(InputAction::Move(Vec2::RIGHT)));
        assert!(buffer.try_submit(InputAction::Jump));
        assert!(buffer.try_submit(InputAction::Fire));
        assert_eq!(buffer.pending_count(), 3);

        let actions = buffer.drain();
        assert_eq!(
            actions,
            vec![InputAction::Move(Vec2::RIGHT), InputAction::Jump, InputAction::Fire]
        );
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_backpressure() {
        let buffer = InputBuffer::new(2);
        assert!(buffer.try_submit(InputAction::Fire));
        assert!(buffer.try_submit(InputAction::Fire));
        assert!(!buffer.try_submit(InputAction::Fire));

        let sender = buffer.sender();
        assert_eq!(sender.try_send(InputAction::Pause), Err(InputBufferError::Full));

        buffer.drain();
        assert!(sender.try_send(InputAction::Pause).is_ok());
    }

    #[test]
    fn test_senders_from_other_threads() {
        let buffer = InputBuffer::new(100);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let sender = buffer.sender();
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        sender.try_send(InputAction::Fire).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(buffer.drain().len(), 40);
    }

    #[test]
    fn test_default_capacity() {
        assert_eq!(InputBuffer::default().capacity(), 256);
    }
}
