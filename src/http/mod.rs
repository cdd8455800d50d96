//! Passive HTTP inspection.
//!
//! The relay never speaks HTTP itself; these modules read the bytes already
//! flowing through a session and pull out just enough protocol to meter
//! Docker API usage.
//!
//! # Architecture
//!
//! - **`head`**: parses a request line and headers out of a byte buffer
//! - **`exchange`**: the classification shared between the two relay
//!   directions of a session
//! - **`sniffer`**: classifies client-to-target chunks and extracts the
//!   image a call names
//! - **`correlator`**: matches target-to-client status lines against the
//!   pending classification and emits usage events
//!
//! # Exchange lifecycle
//!
//! ```text
//!   client chunks ──▶ sniffer ────────────▶ target
//!                        │ expect / set_image
//!                        ▼
//!                  ExchangeState
//!                        ▲
//!                        │ take on status line
//!   client ◀──────── correlator ◀─────── target chunks
//! ```
//!
//! Classification lives exactly from the request that set it to the next
//! chunk that looks like a response head. Anything the sniffer cannot make
//! sense of is still relayed untouched; inspection failures only ever cost
//! an event, never a byte.

pub mod correlator;
pub mod exchange;
pub mod head;
pub mod sniffer;
