pub mod health;
pub mod verify;

pub use health::{health, ready, HealthResponse, ReadyResponse};
pub use verify::{verify, VerifyRequest};
