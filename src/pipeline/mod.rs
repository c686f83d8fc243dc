pub mod encode;
pub mod scan;
