// src/handlers/mod.rs

pub mod admin;
pub mod health;
pub mod home;
pub mod notification;
pub mod post;
pub mod profile;
