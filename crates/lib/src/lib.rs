//! dogcam core library: the webhook gateway, the fetch RPC service, and the
//! image provider and notification clients both processes are built from.

pub mod config;
pub mod gateway;
pub mod image;
pub mod init;
pub mod notify;
pub mod provider;
pub mod rpc;
pub mod shutdown;
