//
// Program representation consumed by the analyses
//
pub mod adapter;
pub mod annot;
pub mod cfg;
pub mod program;
