pub mod error;
pub mod feed;
pub mod handlers;
pub mod listing;
pub mod middleware;
pub mod routes;
pub mod torrents;

pub use routes::create_router;
