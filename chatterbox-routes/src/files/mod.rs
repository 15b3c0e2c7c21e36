pub mod upload;

use chatterbox_utils::upload::UPLOADS_ROUTE;

use crate::RouteMeta;

/// Stored uploads are served statically from the upload directory.
pub const UPLOADS_META: RouteMeta = RouteMeta {
    method: "GET",
    path: UPLOADS_ROUTE,
    desc: "Download a previously uploaded file.",
};
