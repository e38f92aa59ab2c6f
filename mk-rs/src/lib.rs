pub mod cli;
pub mod logger;
pub mod pattern;
pub mod script;
pub mod var;
