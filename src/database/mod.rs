// Database module
// PostgreSQL holds the document table; the vector extension serves similarity search

pub mod postgres;

pub use postgres::*;
