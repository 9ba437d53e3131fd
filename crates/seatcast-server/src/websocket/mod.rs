//! WebSocket transport: connection state, registry, sessions and the
//! upgrade route.

pub mod connection;
pub mod registry;
pub mod session;
pub mod transport;

pub use connection::ClientConnection;
pub use registry::ConnectionRegistry;
pub use transport::{Handshake, Transport, TransportConfig, TransportEvent, TransportHost};
