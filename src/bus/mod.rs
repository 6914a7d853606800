//! Two-wire bus access
//!
//! The bit-banged bus primitives live on the board; the sensor driver only
//! depends on the transaction contract in [`TwoWireBus`]. A simulated bus is
//! provided for running off-target and for tests.

mod sim;
mod traits;

pub use sim::SimulatedBus;
pub use traits::{BusStatus, TwoWireBus};
