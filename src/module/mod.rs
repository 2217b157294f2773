pub mod clock;
pub mod registry;
pub mod scheduler;

pub use scheduler::{tick, Module, ModuleCore, TickOutcome};
