// Execution events and the in-process broadcast bus

mod bus;

pub use bus::*;
