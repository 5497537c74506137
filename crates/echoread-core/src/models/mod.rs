//! Data models for echoread.

pub mod config;
