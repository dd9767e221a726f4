// Cross-process query protocol between host and worker

pub mod client;
pub mod proto;
pub mod server;

pub use client::RpcClient;

/// Env var carrying the magic cookie to the spawned worker. A worker started
/// without it (e.g. by hand) refuses to run.
pub const COOKIE_ENV: &str = "HWINFO_BRIDGE_COOKIE";

/// Shared handshake constant. Not a security measure, just a guard against
/// the worker being launched by something that does not speak the protocol.
pub const MAGIC_COOKIE: &str = "hwinfo-bridge-7f3d9a61";

/// Bumped on any incompatible change to the request/frame shapes.
pub const PROTOCOL_VERSION: u32 = 1;
