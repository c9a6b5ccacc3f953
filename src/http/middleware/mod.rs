pub mod admission;
pub mod cors;

pub use admission::{admission_middleware, client_key, AdmissionState};
pub use cors::{cors_middleware, CorsPolicy};
