//! Parse and build signed cross-chain messages.
//!
//! Messages are carried in a [Vaa] envelope whose payload is untagged: the kind of a payload is
//! recovered by [Payload::parse] from the constants its layout places in every encoding (module
//! names, action ids and payload ids) and from its length.
//!
//! # Example
//!
//! ```
//! use binlayout_payloads::{governance, Payload, PayloadKind};
//!
//! let mut bytes = governance::CORE_MODULE.to_vec();
//! bytes.extend_from_slice(&[0x03, 0x00, 0x00]);
//! bytes.extend_from_slice(&[0x01; 32]);
//!
//! let payload = Payload::parse(&bytes).unwrap();
//! assert_eq!(payload.kind, PayloadKind::SetMessageFee);
//! assert_eq!(payload.value.get("action").unwrap().as_str(), Some("SetMessageFee"));
//! ```

mod error;
pub use error::Error;
pub mod governance;
mod payload;
pub use payload::{Payload, PayloadKind};
pub mod token_bridge;
pub mod vaa;
pub use vaa::{Signature, Vaa};
