pub mod endpoint;
pub mod error;
pub mod multipart;
pub mod progress;
pub mod session;
pub mod transport;
pub mod upload;

pub use endpoint::{UPLOAD_PATH, normalize_upload_url};
pub use error::UploadError;
pub use multipart::{CHUNK_SIZE, FIELD_NAME, TrackFile};
pub use progress::ProgressSink;
pub use session::{MemorySessionStore, NoSession, SessionStore};
pub use transport::{API_KEY_SCHEME, AuthMode, HttpTransport, Transport, UploadRequest};
pub use upload::{NOT_SENT, UploadResult, Uploader};
