pub mod app;

pub use app::{auth_header, make_test_app, read_json};
