pub mod bug;
pub mod copy;
pub mod graph;
pub mod history;
pub mod link;
pub mod related;
pub mod types;
