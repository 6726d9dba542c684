pub mod error;
pub mod templates;
pub mod traits;
pub mod types;

pub use error::*;
pub use templates::*;
pub use traits::*;
pub use types::*;
