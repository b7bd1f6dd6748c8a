pub mod element;
pub mod error;
pub mod pool;
pub mod studio;
pub mod sync;
pub mod ticker;
