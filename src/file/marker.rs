//! Single-byte markers preceding each record in the data section

/// Closes a chunk group; the group footer follows
pub const CHUNK_GROUP_FOOTER: u8 = 0x00;

/// Opens a chunk; the chunk header and its pages follow
pub const CHUNK_HEADER: u8 = 0x01;

/// Ends the data section; the trailing metadata follows
pub const SEPARATOR: u8 = 0x02;

/// A version record; a u64 version number follows
pub const VERSION: u8 = 0x03;
