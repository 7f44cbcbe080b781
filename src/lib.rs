//! chat-tts: speaks incoming chat messages through an external
//! speech-synthesis command.
//!
//! The core is a small gating pipeline: per-conversation and global
//! activation, keyword-triggered activation, markup cleanup and an ordered
//! replacement table. Host chat clients talk to it over HTTP (`api`) or
//! JSON lines on stdin (`host`).

pub mod activation;
pub mod api;
pub mod command;
pub mod config;
pub mod error;
pub mod host;
pub mod keywords;
pub mod normalize;
pub mod plugin;
pub mod prefs;
pub mod processor;
pub mod replace;
pub mod sink;
