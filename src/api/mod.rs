pub mod handlers;
pub mod params;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::AppState;
