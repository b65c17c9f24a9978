//! # Collection of Basic Data Structures
//!
//! - `storage`: Arena-based storage for the IR entities.

pub mod storage;
