pub(crate) mod result_release;
pub(crate) mod scheduler;
