// medtop: phrase extraction, clustering, and topic labeling for medical
// narrative text.
//
// This is the library root. Each module corresponds to a stage or
// supporting subsystem of the phrase clustering pipeline.

pub mod clustering;
pub mod config;
pub mod corpus;
pub mod embeddings;
pub mod error;
pub mod evaluation;
pub mod output;
pub mod pipeline;
pub mod scoring;
pub mod topics;
