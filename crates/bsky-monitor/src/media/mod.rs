//! Media download for post embeds.

mod naming;
mod record;
mod resolver;

pub use naming::{extension_from_mime, sanitize_alt, DownloadTarget, BLOB_DIR, PART_SUFFIX};
pub use record::decode_post_record;
pub use resolver::{EmbedResolver, MediaFailure, MediaResolver, Resolution};
