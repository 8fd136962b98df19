pub(crate) mod assessments;
pub(crate) mod complaints;
pub(crate) mod errors;
pub(crate) mod guards;
pub(crate) mod handlers;
pub(crate) mod router;
