mod credentials;
mod pending_queue;
mod sheet_transport;

pub use credentials::*;
pub use pending_queue::*;
pub use sheet_transport::*;
