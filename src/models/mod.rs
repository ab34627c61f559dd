pub mod application;
pub mod internship;
pub mod notification;
pub mod offer;
pub mod slot;
pub mod user;
