// src/handlers.rs

pub mod admin;
pub mod auth;
pub mod pages;
pub mod patients;
pub mod tenancy;
