//! NFC drink tags: record codec, NDEF framing, sessions and the
//! reader/writer flows.

pub mod codec;
pub mod flow;
pub mod ndef;
pub mod session;

pub use codec::{DecodedTag, DrinkEvent, TagCodec};
pub use flow::{scan_and_validate, write_drink_tag, ScanOutcome, NO_DRINK_DATA_MESSAGE};
pub use session::{TagHardware, TagSession};
