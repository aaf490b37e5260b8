//! The two families of per-data-series codec: integer-valued and
//! byte-array-valued.

mod byte_array;
mod integer;

pub use self::{byte_array::ByteArray, integer::Integer};
