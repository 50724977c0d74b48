pub mod network;
pub mod types;

pub use network::{AddressClass, Cidr, CidrParseError, PRIVATE_RANGES, classify, is_private};
pub use types::*;
