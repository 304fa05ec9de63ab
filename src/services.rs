// src/services.rs

pub mod audit;
pub mod auth;
pub mod permissions;
pub mod session_validator;
pub mod tenancy_service;
pub mod tenant_resolver;
pub mod token;
