pub mod application;
pub mod health;
pub mod internship;
pub mod notification;
pub mod offer;
pub mod slot;
