pub mod config;
pub mod convert;
pub mod document;
pub mod filename;
pub mod record;
pub mod tags;
pub mod writer;
