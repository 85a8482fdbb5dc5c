//! EARS recording decoding.
//!
//! An EARS file is a sequence of fixed-size records, each holding a small
//! header with a timing counter followed by big-endian 16-bit samples.

mod decode;
mod epoch;
mod record;

pub use decode::{decode_ears_bytes, decode_ears_file, decode_timestamp_ticks};
pub use epoch::Epoch;
pub use record::AcousticRecord;
