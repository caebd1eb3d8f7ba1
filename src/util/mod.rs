pub mod fs;
pub mod path;
pub mod pool;
pub mod progress;
