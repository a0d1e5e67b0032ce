//! Core conversation state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;


pub use effect::{ChoiceOption, Effect, LeadCapture};
pub use event::{Event, InboundMessage, InboundPayload};
pub use state::ConvState;
pub use transition::{transition, Disposition, TransitionResult};
