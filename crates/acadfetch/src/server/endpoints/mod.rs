pub mod records;
pub mod status;
pub mod sync;
