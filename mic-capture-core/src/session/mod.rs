pub mod native_session;
pub mod registry;

#[cfg(test)]
pub(crate) mod test_backend;
