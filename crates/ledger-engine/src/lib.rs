pub mod balance_change;
pub mod configure;
pub mod engine;
pub mod finalize;
pub mod flush;
pub mod scanner;
pub mod transfer;

pub use engine::Engine;
pub use flush::spawn_flusher;
pub use scanner::spawn_scanners;
