pub mod assumptions;
pub mod company;
pub mod file;
pub mod stdin;
