pub mod frame;
pub mod session;

pub use frame::*;
pub use session::*;
