//! HTTP handlers of the façades.

pub mod invoke;
pub mod publish;
pub mod state;
pub mod subscribe;
