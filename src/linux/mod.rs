pub mod cpu;
pub mod privilege;
