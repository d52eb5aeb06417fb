pub mod generator;
pub mod grammar;
pub mod service;
pub mod word_bank;
