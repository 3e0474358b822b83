pub mod compose;
pub mod config;
pub mod doctor;
pub mod login;
pub mod publish;
