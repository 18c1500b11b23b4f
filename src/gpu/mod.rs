//! GPU upload boundary
//!
//! The engine never talks to a graphics API itself; it produces the byte
//! buffer and root index a renderer binds as a read-only storage buffer.

mod upload;

pub use upload::GpuUpload;
