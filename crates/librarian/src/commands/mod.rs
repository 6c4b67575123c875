//! Command implementations

pub mod info;

pub mod release;
