//! Library version information

/// Version of the hert libraries, as recorded in the workspace manifest
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
