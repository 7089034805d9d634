//! Database setup and seed data shared by the engine's and the server's tests.
pub mod prepare_env;
pub mod seed;
