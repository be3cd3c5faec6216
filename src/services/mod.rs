pub(crate) mod attempt_finalize;
pub(crate) mod certificate_export;
pub(crate) mod certificate_issue;
pub(crate) mod certificate_reconcile;
pub(crate) mod storage;
