//! Infrastructure layer: everything that touches a socket.

pub mod network;
