//! Wire format shared by the scheduler and its workers.

pub mod codec;
pub mod error;
pub mod io;
pub mod protocol;

pub use codec::{decode, decode_all, encode, Frame, Header, HEADER_SIZE, MAX_PAYLOAD_LEN};
pub use error::WireError;
pub use io::{read_exactly, read_frame, write_frame};
pub use protocol::{Command, ResultPayload, TaskPayload, DEFAULT_PORT};
