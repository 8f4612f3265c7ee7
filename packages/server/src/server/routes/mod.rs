// HTTP routes
pub mod error;
pub mod health;
pub mod pairing;
pub mod session;

pub use error::*;
pub use health::*;
pub use pairing::*;
pub use session::*;
