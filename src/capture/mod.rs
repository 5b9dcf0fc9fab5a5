pub mod manager;
pub mod parser;

pub use manager::CaptureManager;
pub use parser::PacketParser;
