mod engine;
mod error;
pub mod events;
mod sgp4_engine;

pub use engine::OrbitEngine;
pub use error::PredictError;
pub use sgp4_engine::Sgp4Engine;

#[cfg(test)]
pub(crate) use engine::fake::FakeEngine;
