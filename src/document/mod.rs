pub(crate) mod assemble;
pub(crate) mod composite;
pub(crate) mod geometry;
pub(crate) mod guide;
