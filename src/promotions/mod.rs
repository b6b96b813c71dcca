pub mod error;
pub mod evaluator;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;

pub use error::*;
pub use evaluator::*;
pub use handlers::*;
pub use models::*;
pub use repository::*;
pub use service::*;
