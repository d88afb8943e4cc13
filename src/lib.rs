#![allow(clippy::doc_markdown)]
#![doc = include_str!("../README.md")]

pub mod billing;
pub mod consumption;
pub mod credit;
pub mod quantity;
pub mod tariff;
pub mod time;
