//! Dispatch engine.
//!
//! Covers the per-host session worker, the event printer, and the
//! dispatcher control loop that ties them together.

pub mod dispatcher;
pub mod printer;
pub mod worker;

pub use dispatcher::Dispatcher;
pub use printer::Printer;
pub use worker::SessionMode;
