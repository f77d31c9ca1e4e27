#![forbid(unsafe_code)]

pub mod bundle;
pub mod check;
pub mod cli;
pub mod config;
pub mod cursor;
pub mod fetch;
pub mod format;
pub mod logging;
pub mod run;
pub mod source;
pub mod xml;

#[cfg(test)]
mod test_support;
