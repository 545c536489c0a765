// Application layer - Use cases and stateful controllers
pub mod aggregator;
pub mod edit_mode;
pub mod live_store;
pub mod overlay;
pub mod patrol_service;
pub mod selection;
