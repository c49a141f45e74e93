pub mod adf;
pub mod pacer;
