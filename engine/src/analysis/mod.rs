//
// Abstract interpretation domains
//
pub mod dataflow;
pub mod domain;
pub mod interval;
pub mod parity;
pub mod taint;
