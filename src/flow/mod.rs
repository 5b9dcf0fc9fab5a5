pub mod key;
pub mod table;

pub use key::FlowKey;
pub use table::{Flow, FlowTable};
