// Routes module

pub mod complaints;
pub mod health;

pub use complaints::complaints_routes;
pub use health::health_routes;
