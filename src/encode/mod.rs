pub(crate) mod packbits;
pub(crate) mod psd;
