// src/lib.rs

//! Call transcription handlers: on-request transcription jobs, answer
//! feedback capture and `queue_id` backfill.

pub mod clients;
pub mod config;
pub mod error;
pub mod lambda;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;
