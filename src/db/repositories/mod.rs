pub mod audit;
pub mod catalog;
pub mod journal;
pub mod settings;
pub mod subscriber;
pub mod token;
pub mod user;
