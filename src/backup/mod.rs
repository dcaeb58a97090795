pub mod compress;
pub mod db;
pub mod pipeline;
