pub mod parser;
pub mod pipeline;
pub mod registry;
pub mod retention;
pub mod temp_storage;
