#![crate_type = "lib"]
#![crate_name = "ferrodb"]

pub mod common;
pub mod config;
pub mod storage;
