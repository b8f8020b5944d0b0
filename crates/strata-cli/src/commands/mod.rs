//! CLI command implementations

pub(crate) mod common;
pub(crate) mod mark;
pub(crate) mod migrate;
pub(crate) mod retry;
pub(crate) mod rollback;
pub(crate) mod status;
pub(crate) mod validate;
