pub mod candidate;
pub mod config;
pub mod error;
pub mod orbit;
pub mod tracklet;

pub use candidate::*;
pub use config::Config;
pub use error::*;
pub use orbit::*;
pub use tracklet::*;
