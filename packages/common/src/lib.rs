pub mod config;
pub mod data;
pub mod error;
pub mod ids;
pub mod result;
pub mod visitor;
pub mod zone;

pub use config::*;
pub use data::*;
pub use error::*;
pub use ids::*;
pub use result::*;
pub use visitor::*;
pub use zone::*;
