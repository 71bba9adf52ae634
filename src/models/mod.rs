pub mod chunk;
pub mod document;
pub mod enums;
pub mod exchange;

pub use chunk::*;
pub use document::*;
pub use enums::*;
pub use exchange::*;
