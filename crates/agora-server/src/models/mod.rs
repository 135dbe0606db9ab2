pub mod category;
pub mod channel;
pub mod community;

pub use category::*;
pub use channel::*;
pub use community::*;
