//! Archive handling for package inputs and outputs.
//!
//! Inputs are classified by extension and extracted with path-traversal
//! protection; outputs are always gzip-compressed tarballs whose single
//! top-level entry is the `package` directory npm expects.

pub mod extract;
pub mod inspect;
pub mod pack;
