pub mod node;
pub mod persistence;
pub mod radio_rx;

pub use node::node_task;
pub use persistence::{persistence_task, request_save};
pub use radio_rx::radio_rx_task;
