pub mod capture_delegate;
pub mod native_backend;
