pub(crate) mod certificates;
pub(crate) mod course_access;
pub(crate) mod courses;
pub(crate) mod exam_attempts;
pub(crate) mod payments;
pub(crate) mod users;
pub(crate) mod violations;
