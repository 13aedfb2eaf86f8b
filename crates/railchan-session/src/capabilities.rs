//! RAIL and Window capability sets.
//!
//! The host places these in its capability exchange; this module only
//! builds the local advertisement and records what the peer reported.

use bytes::{Buf, BufMut, BytesMut};
use serde::{Deserialize, Serialize};

use railchan_pdu::{ensure, DecodeError};

use crate::session::Session;

pub const RAIL_LEVEL_SUPPORTED: u32 = 0x0000_0001;
pub const RAIL_LEVEL_DOCKED_LANGBAR_SUPPORTED: u32 = 0x0000_0002;

pub const WINDOW_LEVEL_NOT_SUPPORTED: u32 = 0x0000_0000;
pub const WINDOW_LEVEL_SUPPORTED: u32 = 0x0000_0001;
pub const WINDOW_LEVEL_SUPPORTED_EX: u32 = 0x0000_0002;

/// Remote Programs capability set body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RailCapset {
    pub level_flags: u32,
}

impl RailCapset {
    /// RailSupportLevel (4).
    pub const SIZE: usize = 4;

    pub fn encode(&self, dst: &mut BytesMut) {
        dst.put_u32_le(self.level_flags);
    }

    pub fn decode(mut src: &[u8]) -> Result<Self, DecodeError> {
        ensure(src, Self::SIZE)?;
        Ok(Self {
            level_flags: src.get_u32_le(),
        })
    }
}

/// Window List capability set body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowCapset {
    pub level_flags: u32,
    pub icon_cache_count: u8,
    pub icon_cache_entries: u16,
}

impl WindowCapset {
    /// WndSupportLevel (4) + NumIconCaches (1) + NumIconCacheEntries (2).
    pub const SIZE: usize = 7;

    pub fn encode(&self, dst: &mut BytesMut) {
        dst.put_u32_le(self.level_flags);
        dst.put_u8(self.icon_cache_count);
        dst.put_u16_le(self.icon_cache_entries);
    }

    pub fn decode(mut src: &[u8]) -> Result<Self, DecodeError> {
        ensure(src, Self::SIZE)?;
        Ok(Self {
            level_flags: src.get_u32_le(),
            icon_cache_count: src.get_u8(),
            icon_cache_entries: src.get_u16_le(),
        })
    }
}

/// The RAIL support level this client always advertises.
pub fn build_local_rail_capset() -> u32 {
    RAIL_LEVEL_SUPPORTED | RAIL_LEVEL_DOCKED_LANGBAR_SUPPORTED
}

/// Record the peer's RAIL support level.
pub fn apply_remote_rail_capset(session: &mut Session, level_flags: u32) {
    session.rail_mode_supported = level_flags & RAIL_LEVEL_SUPPORTED != 0;
    session.docked_langbar_supported = level_flags & RAIL_LEVEL_DOCKED_LANGBAR_SUPPORTED != 0;

    tracing::debug!(
        level_flags,
        rail_mode_supported = session.rail_mode_supported,
        docked_langbar_supported = session.docked_langbar_supported,
        "applied remote rail capset"
    );
}

/// The window capability set this client advertises.
pub fn build_local_window_capset(session: &Session) -> WindowCapset {
    WindowCapset {
        level_flags: WINDOW_LEVEL_SUPPORTED_EX,
        icon_cache_count: session.icon_cache_count,
        icon_cache_entries: session.icon_cache_entries,
    }
}

/// Record the peer's window support level and icon cache sizing.
///
/// The icon cache values overwrite the session's unconditionally, so the
/// last capset applied wins.
pub fn apply_remote_window_capset(session: &mut Session, capset: WindowCapset) {
    let level = capset.level_flags;
    session.window_level_supported =
        level & (WINDOW_LEVEL_SUPPORTED | WINDOW_LEVEL_SUPPORTED_EX) != 0;
    session.window_level_ex_supported = level & WINDOW_LEVEL_SUPPORTED_EX != 0;
    session.icon_cache_count = capset.icon_cache_count;
    session.icon_cache_entries = capset.icon_cache_entries;

    tracing::debug!(
        level_flags = level,
        window_level_supported = session.window_level_supported,
        window_level_ex_supported = session.window_level_ex_supported,
        icon_cache_count = session.icon_cache_count,
        icon_cache_entries = session.icon_cache_entries,
        "applied remote window capset"
    );
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use railchan_transport::{ByteSink, VecSink};

    use super::*;
    use crate::config::SessionConfig;

    fn session() -> Session {
        let sink: Arc<dyn ByteSink> = Arc::new(VecSink::new());
        Session::new(&SessionConfig::default(), &sink)
    }

    #[test]
    fn local_rail_capset_advertises_both_levels() {
        assert_eq!(build_local_rail_capset(), 0x3);
    }

    #[test]
    fn remote_rail_capset_is_bit_extracted() {
        let mut s = session();

        apply_remote_rail_capset(&mut s, RAIL_LEVEL_SUPPORTED);
        assert!(s.rail_mode_supported());
        assert!(!s.docked_langbar_supported());

        apply_remote_rail_capset(
            &mut s,
            RAIL_LEVEL_SUPPORTED | RAIL_LEVEL_DOCKED_LANGBAR_SUPPORTED,
        );
        assert!(s.rail_mode_supported());
        assert!(s.docked_langbar_supported());

        apply_remote_rail_capset(&mut s, 0);
        assert!(!s.rail_mode_supported());
        assert!(!s.docked_langbar_supported());
    }

    #[test]
    fn local_window_capset_uses_configured_cache() {
        let s = session();
        assert_eq!(
            build_local_window_capset(&s),
            WindowCapset {
                level_flags: WINDOW_LEVEL_SUPPORTED_EX,
                icon_cache_count: 2,
                icon_cache_entries: 10,
            }
        );
    }

    #[test]
    fn remote_window_capset_levels() {
        let mut s = session();
        let capset = |level_flags| WindowCapset {
            level_flags,
            icon_cache_count: 3,
            icon_cache_entries: 12,
        };

        apply_remote_window_capset(&mut s, capset(WINDOW_LEVEL_SUPPORTED));
        assert!(s.window_level_supported());
        assert!(!s.window_level_ex_supported());

        apply_remote_window_capset(&mut s, capset(WINDOW_LEVEL_SUPPORTED_EX));
        assert!(s.window_level_supported());
        assert!(s.window_level_ex_supported());

        apply_remote_window_capset(&mut s, capset(WINDOW_LEVEL_NOT_SUPPORTED));
        assert!(!s.window_level_supported());
        assert!(!s.window_level_ex_supported());
    }

    #[test]
    fn last_applied_icon_cache_wins() {
        let mut s = session();
        apply_remote_window_capset(
            &mut s,
            WindowCapset {
                level_flags: WINDOW_LEVEL_SUPPORTED_EX,
                icon_cache_count: 1,
                icon_cache_entries: 40,
            },
        );
        assert_eq!(s.icon_cache_count(), 1);
        assert_eq!(s.icon_cache_entries(), 40);
        assert_eq!(build_local_window_capset(&s).icon_cache_entries, 40);
    }

    #[test]
    fn capset_bodies_round_trip() {
        let window = WindowCapset {
            level_flags: WINDOW_LEVEL_SUPPORTED_EX,
            icon_cache_count: 3,
            icon_cache_entries: 0x0102,
        };
        let mut dst = BytesMut::new();
        window.encode(&mut dst);
        assert_eq!(dst.as_ref(), &[0x02u8, 0, 0, 0, 3, 0x02, 0x01]);
        assert_eq!(WindowCapset::decode(&dst).unwrap(), window);

        let mut dst = BytesMut::new();
        RailCapset { level_flags: 3 }.encode(&mut dst);
        assert_eq!(RailCapset::decode(&dst).unwrap().level_flags, 3);
    }

    #[test]
    fn short_capset_is_truncated() {
        assert_eq!(
            WindowCapset::decode(&[0x02, 0, 0, 0, 3]).unwrap_err(),
            DecodeError::Truncated {
                needed: 7,
                remaining: 5
            }
        );
        assert!(RailCapset::decode(&[1]).is_err());
    }
}
