//! The chunk-oriented processing pipeline
//!
//! A pipeline is a source, a transformer, and a sink wired into the
//! [`engine::ChunkEngine`], with optional lifecycle listeners around the job
//! and its step.

pub mod engine;
pub mod listener;
pub mod sink;
pub mod source;
pub mod transform;
