// src/models/mod.rs

pub mod contest;
pub mod question;
pub mod result;
pub mod submission;
pub mod user;
