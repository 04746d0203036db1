pub mod audit;
pub mod auth_service;
pub mod auth_service_impl;
pub mod followups;
