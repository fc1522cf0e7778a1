pub mod history;
pub mod proxy;
pub mod rotation;

pub use history::*;
pub use proxy::*;
pub use rotation::*;
