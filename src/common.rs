// src/common.rs

pub mod cookie;
pub mod error;
pub mod redirect;
pub mod request;
