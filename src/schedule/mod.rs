pub mod model;
pub mod reader;
