//! Stream Decoding
//!
//! Turns the raw byte stream of the agent's streaming endpoint into
//! [`StreamFrame`]s. The endpoint writes one event per line:
//!
//! ```text
//! data: {"conversation_id":"c1","delta":"The ","done":false}
//! data: {"conversation_id":"c1","delta":"doc covers X.","done":true}
//! ```
//!
//! Lines without the `data: ` prefix are ignored, and lines whose payload is
//! not a valid frame are skipped without interrupting the stream.

mod frame;

pub use frame::{decode_line, FrameDecoder, StreamFrame, DATA_PREFIX};
