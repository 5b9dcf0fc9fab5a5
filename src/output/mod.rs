pub mod crypto;
pub mod csv;
pub mod report;
