mod archive;
mod attachments;
mod contact_csv;
mod normalize;
mod storage;
mod transcript;

pub use archive::{
    classify_archive_name, find_transcript, ArchiveIdentity, ArchiveSource, ZipArchiveSource,
};
pub use attachments::{
    attachment_tokens, clean_for_match, index_extracted_files, resolve_message_attachments,
    AttachmentIndex,
};
pub use contact_csv::{read_contact_rows, ContactRow};
pub use normalize::{
    name_key, normalize_date, normalize_phone, normalize_text, phone_suffix, phones_match,
    strip_numeric_prefix,
};
pub use storage::MediaStore;
pub use transcript::{read_transcript, Messages, Transcript};
