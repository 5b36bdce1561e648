//! Candidate matching pipeline.
//!
//! Leaves first: `prompts` → `requirement` / `filter` / `scorer` → `writer`
//! → `orchestrator`.

pub mod filter;
pub mod orchestrator;
pub mod prompts;
pub mod requirement;
pub mod scorer;
pub mod writer;
