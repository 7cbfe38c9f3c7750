pub mod runner;

pub use runner::{parse_line, ScriptRunner, MAX_LINE_BYTES};
