//! high-five/crates/hf-core/src/lib.rs
//!
//! Domain models, port definitions and the pure logic of the High Five Board:
//! join codes, win validation and the feed reducer.

pub mod clock;
pub mod code;
pub mod error;
pub mod feed;
pub mod live;
pub mod models;
pub mod traits;
pub mod validation;

// Re-exporting for easier access in other crates
pub use clock::*;
pub use code::*;
pub use error::*;
pub use feed::*;
pub use live::*;
pub use models::*;
pub use traits::*;
pub use validation::*;
