//! Rule resolution

pub mod repository;

pub use repository::RuleRepository;
