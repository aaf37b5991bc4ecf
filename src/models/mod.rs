// src/models/mod.rs

pub mod engagement;
pub mod moderation;
pub mod notification;
pub mod post;
pub mod profile;
