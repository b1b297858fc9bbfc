pub(crate) mod color;
pub(crate) mod decode;
pub(crate) mod path;
