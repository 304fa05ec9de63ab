// src/models.rs

pub mod audit;
pub mod auth;
pub mod rbac;
pub mod session;
pub mod tenancy;
