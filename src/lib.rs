pub mod api;
pub mod cloudinary;
pub mod config;
pub mod db;
pub mod imgur;
pub mod model;
pub mod pipeline;
pub mod reddit;
pub mod resolver;
pub mod session;
