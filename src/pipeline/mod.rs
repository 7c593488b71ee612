// Pipeline — stage functions and the end-to-end run.
//
// Every stage takes a collection of sentences by value and returns a new
// one with its results attached, so intermediate collections can be kept or
// dropped freely by the caller.

pub mod run;
pub mod stages;
