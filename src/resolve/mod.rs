pub(crate) mod raw;
pub(crate) mod resolver;
