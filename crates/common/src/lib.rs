pub mod cameras;
pub mod matching;
pub mod normalize;
pub mod pagination;
pub mod validation;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
