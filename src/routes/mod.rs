pub mod auth;
pub mod map;
pub mod pages;
pub mod places;
pub mod posts;
pub mod profile;
pub mod restaurants;
