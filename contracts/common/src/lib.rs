#![no_std]

//! Building blocks shared by the yield vault, its strategies, the swap router
//! and the keeper contracts.

pub mod clients;
pub mod constants;
pub mod error;
pub mod math;
pub mod storage;
pub mod strategy;

pub use error::Error;
