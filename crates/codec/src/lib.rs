// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Binary wire codec for the container runtime: self-describing varints,
//! fixed-width integers/floats, the `Value`/`Dictionary`/`Array`/`Message`
//! encoding, and chunked container framing.

pub mod chunk;
pub mod error;
pub mod fixed;
pub mod value_codec;
pub mod varint;

pub use error::{CodecError, Result};
pub use value_codec::{
    read_array, read_buffer, read_dictionary, read_message, read_string, read_value,
    write_array, write_buffer, write_dictionary, write_message, write_string, write_value,
};
