//! Mnemonic notebook - turns English vocabulary words into Japanese
//! 語呂合わせ with an illustration for each
//!
//! The server side validates input, asks a language model for mnemonic
//! candidates, filters them, and generates an image for the chosen one. The
//! client side keeps a bounded history and a daily quota in local storage.

pub mod ai;
pub mod error;
pub mod illustration;
pub mod mnemonic;
pub mod models;
pub mod prompts;
pub mod safety;
pub mod server;
pub mod session;
pub mod storage;

pub use error::{Error, Result};
