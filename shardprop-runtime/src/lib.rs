pub mod algorithms {
    pub mod label_propagation;
}

pub mod graph {
    pub mod mem_graph;
    pub mod rocksdb_graph;
}

pub mod io {
    pub mod file;
}

pub mod plan {
    pub mod job_spec;
    pub mod run_config;
}

pub mod scheduler {
    pub mod always_active;
    pub mod selective;
}

pub mod engine;
pub mod job;
pub mod observability;
pub mod report;
pub mod window;
