pub mod graph;
pub mod program;
pub mod scheduler;
pub mod state;
