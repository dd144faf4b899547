//! Response decoder module
//!
//! Extracts the records of one page from a parsed JSON body using a
//! configured path. Relay edges are unwrapped to their nodes.

mod decoders;
mod types;

pub use decoders::{lookup, lookup_string, JsonDecoder};
pub use types::{DecoderConfig, RecordDecoder};

#[cfg(test)]
mod tests;
