mod commands;
mod queries;
mod types;

pub(crate) use commands::{
    acquire_grader_course_lock, delete_lock, finalize, insert_lock, mark_broadcast, reopen,
    set_has_complaint, update_draft,
};
pub(crate) use queries::{
    count_active_locks, find_by_id, find_by_id_for_update, find_for_round,
    find_for_round_for_update, latest_round, list_active_locks, list_for_submission,
    list_releasable,
};
pub(crate) use types::NewLock;

const COLUMNS: &str = "\
    id, submission_id, correction_round, assessor_id, completion_date, rated, score, \
    assessment_type, has_complaint, broadcast_at, created_at, updated_at";
