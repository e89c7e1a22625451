//! Ambient scaffolding shared by the rest of the control plane: the
//! dashboard event bus, engine configuration, the repository contracts
//! persistence is expected to satisfy (§6), and an in-memory double of
//! those contracts for tests.

mod config;
mod error;
mod event_bus;
mod repository;
pub mod testing;

pub use config::EngineConfig;
pub use error::RepositoryError;
pub use event_bus::EventBus;
pub use repository::{AgentRepository, ResultRepository, ScenarioRepository, TechniqueRepository};
