pub(crate) mod access;
pub(crate) mod attempts;
pub(crate) mod grading;
