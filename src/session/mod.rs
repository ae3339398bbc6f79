//! Signature capture workflow: the per-field state machine and the controller that wires it to
//! discovery.

pub(crate) mod controller;
pub(crate) mod state;
