//! Input loading for resume and job files

pub mod manager;
