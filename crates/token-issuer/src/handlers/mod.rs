pub mod health;

pub use health::{livez, metrics, readyz};
