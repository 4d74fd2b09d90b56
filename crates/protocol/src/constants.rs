//! Coordinator endpoint paths and protocol limits.

/// Opens a multipart upload session.
pub const START_UPLOAD_PATH: &str = "/start-upload";

/// Issues a presigned URL for one part.
pub const SIGNED_URL_PATH: &str = "/get-signed-url";

/// Records a part the object store has accepted.
pub const UPLOAD_PART_PATH: &str = "/upload-part";

/// Assembles all recorded parts into the final object.
pub const COMPLETE_UPLOAD_PATH: &str = "/complete-upload";

/// Highest part number the object store accepts in one multipart upload.
pub const MAX_PART_NUMBER: u32 = 10_000;
