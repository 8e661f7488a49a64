// Copyright 2025 Cornell University
// released under MIT License

pub mod continuation;
pub mod diagnostic;
pub mod errors;
pub mod extract;
pub mod grammar;
pub mod ir;
pub mod parser;
pub mod relation;
pub mod rewrite;
pub mod serialize;
pub mod simplify;
pub mod synthesis;
