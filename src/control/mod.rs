//! Control module: the operator-facing connect / recover / copy loop

pub mod console;
pub mod runner;
pub mod state;

pub use console::{Console, StdConsole};
pub use runner::ControlLoop;
pub use state::{transition, Event, State};
