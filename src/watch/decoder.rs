// src/watch/decoder.rs

//! Typed decoding of the inotify read buffer.
//!
//! A single `read(2)` returns a packed sequence of variable-length records:
//!
//! ```text
//! | wd: i32 | mask: u32 | cookie: u32 | len: u32 | name: [u8; len] |
//! ```
//!
//! `name` is NUL-padded and only present (len > 0) for events reported by a
//! directory watch about one of its entries.

use super::inotify::WatchHandle;

/// Size of the fixed record header.
pub const HEADER_LEN: usize = std::mem::size_of::<libc::inotify_event>();

/// One decoded notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub handle: WatchHandle,
    pub mask: u32,
    pub cookie: u32,
    /// Entry name for directory watches; `None` when the kernel sent none.
    pub name: Option<String>,
}

impl EventRecord {
    pub fn is_ignored(&self) -> bool {
        self.mask & libc::IN_IGNORED != 0
    }

    pub fn is_overflow(&self) -> bool {
        self.mask & libc::IN_Q_OVERFLOW != 0
    }

    /// Encode this record the way the kernel lays it out.
    ///
    /// The name is NUL-terminated and padded to a multiple of the header
    /// size, as the kernel does. Used by tests and fakes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let name_field = match &self.name {
            Some(name) => {
                let mut bytes = name.as_bytes().to_vec();
                bytes.push(0);
                bytes.resize(bytes.len().next_multiple_of(HEADER_LEN), 0);
                bytes
            }
            None => Vec::new(),
        };

        let mut out = Vec::with_capacity(HEADER_LEN + name_field.len());
        out.extend_from_slice(&self.handle.0.to_ne_bytes());
        out.extend_from_slice(&self.mask.to_ne_bytes());
        out.extend_from_slice(&self.cookie.to_ne_bytes());
        out.extend_from_slice(&(name_field.len() as u32).to_ne_bytes());
        out.extend_from_slice(&name_field);
        out
    }
}

/// Lazy iterator over the records in one filled buffer.
///
/// Stops at the end of the data, or at a trailing record whose declared
/// length runs past it.
#[derive(Debug, Clone)]
pub struct EventRecords<'a> {
    buf: &'a [u8],
}

/// Decode the filled part of a buffer returned by `read(2)`.
pub fn decode(buf: &[u8]) -> EventRecords<'_> {
    EventRecords { buf }
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[at..at + 4]);
    u32::from_ne_bytes(word)
}

impl Iterator for EventRecords<'_> {
    type Item = EventRecord;

    fn next(&mut self) -> Option<EventRecord> {
        if self.buf.len() < HEADER_LEN {
            self.buf = &[];
            return None;
        }

        let wd = read_u32(self.buf, 0) as i32;
        let mask = read_u32(self.buf, 4);
        let cookie = read_u32(self.buf, 8);
        let name_len = read_u32(self.buf, 12) as usize;

        let Some(total) = HEADER_LEN.checked_add(name_len).filter(|t| *t <= self.buf.len()) else {
            self.buf = &[];
            return None;
        };

        let raw_name = &self.buf[HEADER_LEN..total];
        // Lossy on purpose: watched and excluded paths are stored with
        // `to_string_lossy` too, so both sides of the exclusion compare in the
        // same form. Names differing only in invalid UTF-8 bytes collide.
        let name = raw_name
            .split(|b| *b == 0)
            .next()
            .filter(|n| !n.is_empty())
            .map(|n| String::from_utf8_lossy(n).into_owned());

        self.buf = &self.buf[total..];

        Some(EventRecord {
            handle: WatchHandle(wd),
            mask,
            cookie,
            name,
        })
    }
}
