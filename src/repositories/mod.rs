pub(crate) mod complaint_responses;
pub(crate) mod complaints;
pub(crate) mod course_memberships;
pub(crate) mod courses;
pub(crate) mod exercises;
pub(crate) mod feedback;
pub(crate) mod participations;
pub(crate) mod results;
pub(crate) mod submissions;
pub(crate) mod users;
