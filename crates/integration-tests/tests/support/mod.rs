pub mod api_app;
pub mod upstream_mock;
