// Size of the fixed read/write chunk used by the stream adapters.
pub const STREAM_BUFFER_SIZE: usize = 8 * 1024;

pub const MIN_QUALITY: i32 = 0;
pub const MAX_QUALITY: i32 = 100;

pub const MIN_SCALE_NUMERATOR: i32 = 1;
pub const MAX_SCALE_NUMERATOR: i32 = 16;

// Scale factors are expressed in eighths.
pub const SCALE_DENOMINATOR: u8 = 8;

// Fed to the codec when the wrapped stream runs dry after the first fill.
pub const FAKE_END_OF_IMAGE: [u8; 2] = [0xFF, 0xD9];

// Never handed out by the arena; returned when an allocation fails.
pub const NULL_HANDLE: i64 = 0;
