pub(crate) mod anonymization;
pub(crate) mod assessment;
pub(crate) mod authorization;
pub(crate) mod complaint_lock;
pub(crate) mod complaints;
pub(crate) mod result_broadcast;
