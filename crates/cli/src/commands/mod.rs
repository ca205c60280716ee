pub(crate) mod ack;
pub(crate) mod project;
pub(crate) mod replay;
pub(crate) mod validate;
