// Core modules: records, validation, storage, and error modeling.
pub mod error;
pub mod record;
pub mod store;
pub mod validate;
