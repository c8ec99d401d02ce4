//! Keyseal - file encryption under a generated key kept in a companion file

#![forbid(unsafe_code)]

pub mod error;
pub mod file_ops;
pub mod keystore;
pub mod secretcrypt;
pub mod varmor;
