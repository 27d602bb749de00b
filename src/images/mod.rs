pub mod form;
pub mod services;
