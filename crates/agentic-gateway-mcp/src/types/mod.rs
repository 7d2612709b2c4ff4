//! All protocol data types used by the gateway server.

pub mod error;
pub mod handshake;
pub mod message;
pub mod request;
pub mod response;

pub use error::*;
pub use handshake::*;
pub use message::*;
pub use request::*;
pub use response::*;
