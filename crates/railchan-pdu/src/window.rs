//! Windowing alternate secondary orders.
//!
//! These arrive on the graphics update stream rather than the RAIL channel,
//! but describe the same remote windows. Each order starts with:
//! ```text
//! OrderSize(2) FieldsPresentFlags(4)
//! ```
//! `OrderSize` also counts the one-byte alternate secondary header that the
//! update stream strips before handing the order over, so an order occupies
//! `OrderSize - 1` bytes here. The flags select the record kind and which
//! optional fields follow, always in a fixed order.

use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;

use crate::codec::{ensure, ensure_items, read_i32, read_u16, read_u32, read_u8};
use crate::error::{DecodeError, EncodeError};
use crate::primitives::{CachedIconInfo, IconInfo, Rect16, UnicodeString};

/// Bytes of the alternate secondary header counted by `OrderSize` but not
/// present in the buffers handled here.
pub const ALTSEC_HEADER_SIZE: usize = 1;

/// OrderSize (2) + FieldsPresentFlags (4).
pub const ORDER_HEADER_SIZE: usize = 6;

pub const TYPE_WINDOW: u32 = 0x0100_0000;
pub const TYPE_NOTIFY: u32 = 0x0200_0000;
pub const TYPE_DESKTOP: u32 = 0x0400_0000;
pub const STATE_NEW: u32 = 0x1000_0000;
pub const STATE_DELETED: u32 = 0x2000_0000;
pub const ICON: u32 = 0x4000_0000;
pub const CACHED_ICON: u32 = 0x8000_0000;

pub const FIELD_OWNER: u32 = 0x0000_0002;
pub const FIELD_TITLE: u32 = 0x0000_0004;
pub const FIELD_STYLE: u32 = 0x0000_0008;
pub const FIELD_SHOW: u32 = 0x0000_0010;
pub const FIELD_WND_RECTS: u32 = 0x0000_0100;
pub const FIELD_VISIBILITY: u32 = 0x0000_0200;
pub const FIELD_WND_SIZE: u32 = 0x0000_0400;
pub const FIELD_WND_OFFSET: u32 = 0x0000_0800;
pub const FIELD_VIS_OFFSET: u32 = 0x0000_1000;
pub const FIELD_ICON_BIG: u32 = 0x0000_2000;
pub const FIELD_CLIENT_AREA_OFFSET: u32 = 0x0000_4000;
pub const FIELD_WND_CLIENT_DELTA: u32 = 0x0000_8000;
pub const FIELD_CLIENT_AREA_SIZE: u32 = 0x0001_0000;
pub const FIELD_RP_CONTENT: u32 = 0x0002_0000;
pub const FIELD_ROOT_PARENT: u32 = 0x0004_0000;

pub const FIELD_NOTIFY_TIP: u32 = 0x0000_0001;
pub const FIELD_NOTIFY_INFO_TIP: u32 = 0x0000_0002;
pub const FIELD_NOTIFY_STATE: u32 = 0x0000_0004;
pub const FIELD_NOTIFY_VERSION: u32 = 0x0000_0008;

pub const FIELD_DESKTOP_NONE: u32 = 0x0000_0001;
pub const FIELD_DESKTOP_HOOKED: u32 = 0x0000_0002;
pub const FIELD_DESKTOP_ARC_COMPLETED: u32 = 0x0000_0004;
pub const FIELD_DESKTOP_ARC_BEGAN: u32 = 0x0000_0008;
pub const FIELD_DESKTOP_ZORDER: u32 = 0x0000_0010;
pub const FIELD_DESKTOP_ACTIVEWND: u32 = 0x0000_0020;

const WINDOW_INFO_FIELDS: u32 = FIELD_OWNER
    | FIELD_TITLE
    | FIELD_STYLE
    | FIELD_SHOW
    | FIELD_WND_RECTS
    | FIELD_VISIBILITY
    | FIELD_WND_SIZE
    | FIELD_WND_OFFSET
    | FIELD_VIS_OFFSET
    | FIELD_CLIENT_AREA_OFFSET
    | FIELD_WND_CLIENT_DELTA
    | FIELD_CLIENT_AREA_SIZE
    | FIELD_RP_CONTENT
    | FIELD_ROOT_PARENT;

const NOTIFY_INFO_FIELDS: u32 = FIELD_NOTIFY_TIP
    | FIELD_NOTIFY_INFO_TIP
    | FIELD_NOTIFY_STATE
    | FIELD_NOTIFY_VERSION
    | ICON
    | CACHED_ICON;

const DESKTOP_DATA_FIELDS: u32 = FIELD_DESKTOP_NONE | FIELD_DESKTOP_ZORDER | FIELD_DESKTOP_ACTIVEWND;

/// Signed 32-bit offset pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Point32 {
    pub x: i32,
    pub y: i32,
}

impl Point32 {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Unsigned 32-bit extent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Size32 {
    pub width: u32,
    pub height: u32,
}

impl Size32 {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WindowStyle {
    pub style: u32,
    pub extended_style: u32,
}

/// Optional properties of a new or updated window.
///
/// Each `Some` field corresponds to one presence bit; the bits are derived
/// from the populated fields when encoding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WindowInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_window_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<WindowStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_state: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<UnicodeString>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_offset: Option<Point32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_area_size: Option<Size32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rp_content: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_parent: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_offset: Option<Point32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_client_delta: Option<Point32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_size: Option<Size32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_rects: Option<Vec<Rect16>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible_offset: Option<Point32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility_rects: Option<Vec<Rect16>>,
}

impl WindowInfo {
    fn field_bits(&self) -> u32 {
        let mut bits = 0;
        let mut set = |present: bool, bit: u32| {
            if present {
                bits |= bit;
            }
        };
        set(self.owner_window_id.is_some(), FIELD_OWNER);
        set(self.style.is_some(), FIELD_STYLE);
        set(self.show_state.is_some(), FIELD_SHOW);
        set(self.title.is_some(), FIELD_TITLE);
        set(self.client_offset.is_some(), FIELD_CLIENT_AREA_OFFSET);
        set(self.client_area_size.is_some(), FIELD_CLIENT_AREA_SIZE);
        set(self.rp_content.is_some(), FIELD_RP_CONTENT);
        set(self.root_parent.is_some(), FIELD_ROOT_PARENT);
        set(self.window_offset.is_some(), FIELD_WND_OFFSET);
        set(self.window_client_delta.is_some(), FIELD_WND_CLIENT_DELTA);
        set(self.window_size.is_some(), FIELD_WND_SIZE);
        set(self.window_rects.is_some(), FIELD_WND_RECTS);
        set(self.visible_offset.is_some(), FIELD_VIS_OFFSET);
        set(self.visibility_rects.is_some(), FIELD_VISIBILITY);
        bits
    }

    fn encoded_len(&self) -> usize {
        let rects = |list: &Option<Vec<Rect16>>| list.as_ref().map_or(0, |r| 4 + r.len() * Rect16::SIZE);
        self.owner_window_id.map_or(0, |_| 4)
            + self.style.map_or(0, |_| 8)
            + self.show_state.map_or(0, |_| 1)
            + self.title.as_ref().map_or(0, UnicodeString::encoded_len)
            + self.client_offset.map_or(0, |_| 8)
            + self.client_area_size.map_or(0, |_| 8)
            + self.rp_content.map_or(0, |_| 1)
            + self.root_parent.map_or(0, |_| 4)
            + self.window_offset.map_or(0, |_| 8)
            + self.window_client_delta.map_or(0, |_| 8)
            + self.window_size.map_or(0, |_| 8)
            + rects(&self.window_rects)
            + self.visible_offset.map_or(0, |_| 8)
            + rects(&self.visibility_rects)
    }

    fn encode(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        if let Some(owner) = self.owner_window_id {
            dst.put_u32_le(owner);
        }
        if let Some(style) = self.style {
            dst.put_u32_le(style.style);
            dst.put_u32_le(style.extended_style);
        }
        if let Some(show) = self.show_state {
            dst.put_u8(show);
        }
        if let Some(title) = &self.title {
            title.encode("TitleInfo", dst)?;
        }
        if let Some(offset) = self.client_offset {
            put_point(dst, offset);
        }
        if let Some(size) = self.client_area_size {
            put_size(dst, size);
        }
        if let Some(rp_content) = self.rp_content {
            dst.put_u8(rp_content);
        }
        if let Some(root_parent) = self.root_parent {
            dst.put_u32_le(root_parent);
        }
        if let Some(offset) = self.window_offset {
            put_point(dst, offset);
        }
        if let Some(delta) = self.window_client_delta {
            put_point(dst, delta);
        }
        if let Some(size) = self.window_size {
            put_size(dst, size);
        }
        if let Some(rects) = &self.window_rects {
            put_rects(dst, "WindowRects", rects)?;
        }
        if let Some(offset) = self.visible_offset {
            put_point(dst, offset);
        }
        if let Some(rects) = &self.visibility_rects {
            put_rects(dst, "VisibilityRects", rects)?;
        }
        Ok(())
    }

    fn decode(src: &mut &[u8], fields: u32) -> Result<Self, DecodeError> {
        let present = |bit: u32| fields & bit != 0;
        let mut info = Self::default();

        if present(FIELD_OWNER) {
            info.owner_window_id = Some(read_u32(src)?);
        }
        if present(FIELD_STYLE) {
            info.style = Some(WindowStyle {
                style: read_u32(src)?,
                extended_style: read_u32(src)?,
            });
        }
        if present(FIELD_SHOW) {
            info.show_state = Some(read_u8(src)?);
        }
        if present(FIELD_TITLE) {
            info.title = Some(UnicodeString::decode(src)?);
        }
        if present(FIELD_CLIENT_AREA_OFFSET) {
            info.client_offset = Some(read_point(src)?);
        }
        if present(FIELD_CLIENT_AREA_SIZE) {
            info.client_area_size = Some(read_size(src)?);
        }
        if present(FIELD_RP_CONTENT) {
            info.rp_content = Some(read_u8(src)?);
        }
        if present(FIELD_ROOT_PARENT) {
            info.root_parent = Some(read_u32(src)?);
        }
        if present(FIELD_WND_OFFSET) {
            info.window_offset = Some(read_point(src)?);
        }
        if present(FIELD_WND_CLIENT_DELTA) {
            info.window_client_delta = Some(read_point(src)?);
        }
        if present(FIELD_WND_SIZE) {
            info.window_size = Some(read_size(src)?);
        }
        if present(FIELD_WND_RECTS) {
            info.window_rects = Some(read_rects(src)?);
        }
        if present(FIELD_VIS_OFFSET) {
            info.visible_offset = Some(read_point(src)?);
        }
        if present(FIELD_VISIBILITY) {
            info.visibility_rects = Some(read_rects(src)?);
        }
        Ok(info)
    }
}

/// What a window order carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum WindowUpdate {
    Deleted,
    CachedIcon(CachedIconInfo),
    Icon(Box<IconInfo>),
    Info(Box<WindowInfo>),
}

/// Window information order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowRecord {
    pub fields_present: u32,
    pub window_id: u32,
    pub update: WindowUpdate,
}

impl WindowRecord {
    /// New or updated window properties.
    pub fn info(window_id: u32, is_new: bool, info: WindowInfo) -> Self {
        Self {
            fields_present: TYPE_WINDOW | new_bit(is_new) | info.field_bits(),
            window_id,
            update: WindowUpdate::Info(Box::new(info)),
        }
    }

    pub fn deleted(window_id: u32) -> Self {
        Self {
            fields_present: TYPE_WINDOW | STATE_DELETED,
            window_id,
            update: WindowUpdate::Deleted,
        }
    }

    /// A window icon to store in the icon cache.
    pub fn icon(window_id: u32, is_new: bool, big: bool, icon: IconInfo) -> Self {
        Self {
            fields_present: TYPE_WINDOW | ICON | new_bit(is_new) | big_bit(big),
            window_id,
            update: WindowUpdate::Icon(Box::new(icon)),
        }
    }

    /// A window icon taken from the icon cache.
    pub fn cached_icon(window_id: u32, is_new: bool, big: bool, cached: CachedIconInfo) -> Self {
        Self {
            fields_present: TYPE_WINDOW | CACHED_ICON | new_bit(is_new) | big_bit(big),
            window_id,
            update: WindowUpdate::CachedIcon(cached),
        }
    }

    pub fn is_new(&self) -> bool {
        self.fields_present & STATE_NEW != 0
    }

    /// True if the icon is the large variant.
    pub fn is_big_icon(&self) -> bool {
        self.fields_present & FIELD_ICON_BIG != 0
    }

    fn wire_flags(&self) -> u32 {
        let base = self.fields_present | TYPE_WINDOW;
        match &self.update {
            WindowUpdate::Deleted => base | STATE_DELETED,
            WindowUpdate::CachedIcon(_) => (base & !STATE_DELETED) | CACHED_ICON,
            WindowUpdate::Icon(_) => (base & !(STATE_DELETED | CACHED_ICON)) | ICON,
            WindowUpdate::Info(info) => {
                (base & !(WINDOW_INFO_FIELDS | STATE_DELETED | ICON | CACHED_ICON)) | info.field_bits()
            }
        }
    }

    fn body_len(&self) -> usize {
        4 + match &self.update {
            WindowUpdate::Deleted => 0,
            WindowUpdate::CachedIcon(_) => CachedIconInfo::SIZE,
            WindowUpdate::Icon(icon) => icon.encoded_len(),
            WindowUpdate::Info(info) => info.encoded_len(),
        }
    }

    fn encode_body(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u32_le(self.window_id);
        match &self.update {
            WindowUpdate::Deleted => Ok(()),
            WindowUpdate::CachedIcon(cached) => {
                cached.encode(dst);
                Ok(())
            }
            WindowUpdate::Icon(icon) => icon.encode(dst),
            WindowUpdate::Info(info) => info.encode(dst),
        }
    }

    fn decode_body(src: &mut &[u8], fields: u32) -> Result<Self, DecodeError> {
        let window_id = read_u32(src)?;
        let update = if fields & STATE_DELETED != 0 {
            WindowUpdate::Deleted
        } else if fields & CACHED_ICON != 0 {
            WindowUpdate::CachedIcon(CachedIconInfo::decode(src)?)
        } else if fields & ICON != 0 {
            WindowUpdate::Icon(Box::new(IconInfo::decode(src)?))
        } else {
            WindowUpdate::Info(Box::new(WindowInfo::decode(src, fields)?))
        };
        Ok(Self {
            fields_present: fields,
            window_id,
            update,
        })
    }
}

/// Balloon tooltip attached to a notification icon.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NotifyIconInfoTip {
    pub timeout: u32,
    pub info_flags: u32,
    pub text: UnicodeString,
    pub title: UnicodeString,
}

impl NotifyIconInfoTip {
    fn encoded_len(&self) -> usize {
        4 + 4 + self.text.encoded_len() + self.title.encoded_len()
    }
}

/// Optional properties of a new or updated notification icon.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NotifyIconInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_tip: Option<UnicodeString>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info_tip: Option<NotifyIconInfoTip>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<IconInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_icon: Option<CachedIconInfo>,
}

impl NotifyIconInfo {
    fn field_bits(&self) -> u32 {
        let mut bits = 0;
        if self.version.is_some() {
            bits |= FIELD_NOTIFY_VERSION;
        }
        if self.tool_tip.is_some() {
            bits |= FIELD_NOTIFY_TIP;
        }
        if self.info_tip.is_some() {
            bits |= FIELD_NOTIFY_INFO_TIP;
        }
        if self.state.is_some() {
            bits |= FIELD_NOTIFY_STATE;
        }
        if self.icon.is_some() {
            bits |= ICON;
        }
        if self.cached_icon.is_some() {
            bits |= CACHED_ICON;
        }
        bits
    }

    fn encoded_len(&self) -> usize {
        self.version.map_or(0, |_| 4)
            + self.tool_tip.as_ref().map_or(0, UnicodeString::encoded_len)
            + self.info_tip.as_ref().map_or(0, NotifyIconInfoTip::encoded_len)
            + self.state.map_or(0, |_| 4)
            + self.icon.as_ref().map_or(0, IconInfo::encoded_len)
            + self.cached_icon.map_or(0, |_| CachedIconInfo::SIZE)
    }

    fn encode(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        if let Some(version) = self.version {
            dst.put_u32_le(version);
        }
        if let Some(tip) = &self.tool_tip {
            tip.encode("ToolTip", dst)?;
        }
        if let Some(info_tip) = &self.info_tip {
            dst.put_u32_le(info_tip.timeout);
            dst.put_u32_le(info_tip.info_flags);
            info_tip.text.encode("InfoTipText", dst)?;
            info_tip.title.encode("Title", dst)?;
        }
        if let Some(state) = self.state {
            dst.put_u32_le(state);
        }
        if let Some(icon) = &self.icon {
            icon.encode(dst)?;
        }
        if let Some(cached) = &self.cached_icon {
            cached.encode(dst);
        }
        Ok(())
    }

    fn decode(src: &mut &[u8], fields: u32) -> Result<Self, DecodeError> {
        let present = |bit: u32| fields & bit != 0;
        let mut info = Self::default();

        if present(FIELD_NOTIFY_VERSION) {
            info.version = Some(read_u32(src)?);
        }
        if present(FIELD_NOTIFY_TIP) {
            info.tool_tip = Some(UnicodeString::decode(src)?);
        }
        if present(FIELD_NOTIFY_INFO_TIP) {
            info.info_tip = Some(NotifyIconInfoTip {
                timeout: read_u32(src)?,
                info_flags: read_u32(src)?,
                text: UnicodeString::decode(src)?,
                title: UnicodeString::decode(src)?,
            });
        }
        if present(FIELD_NOTIFY_STATE) {
            info.state = Some(read_u32(src)?);
        }
        if present(ICON) {
            info.icon = Some(IconInfo::decode(src)?);
        }
        if present(CACHED_ICON) {
            info.cached_icon = Some(CachedIconInfo::decode(src)?);
        }
        Ok(info)
    }
}

/// What a notification icon order carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum NotifyIconUpdate {
    Deleted,
    Info(Box<NotifyIconInfo>),
}

/// Notification icon information order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotifyIconRecord {
    pub fields_present: u32,
    pub window_id: u32,
    pub notify_icon_id: u32,
    pub update: NotifyIconUpdate,
}

impl NotifyIconRecord {
    pub fn info(window_id: u32, notify_icon_id: u32, is_new: bool, info: NotifyIconInfo) -> Self {
        Self {
            fields_present: TYPE_NOTIFY | new_bit(is_new) | info.field_bits(),
            window_id,
            notify_icon_id,
            update: NotifyIconUpdate::Info(Box::new(info)),
        }
    }

    pub fn deleted(window_id: u32, notify_icon_id: u32) -> Self {
        Self {
            fields_present: TYPE_NOTIFY | STATE_DELETED,
            window_id,
            notify_icon_id,
            update: NotifyIconUpdate::Deleted,
        }
    }

    pub fn is_new(&self) -> bool {
        self.fields_present & STATE_NEW != 0
    }

    fn wire_flags(&self) -> u32 {
        let base = self.fields_present | TYPE_NOTIFY;
        match &self.update {
            NotifyIconUpdate::Deleted => base | STATE_DELETED,
            NotifyIconUpdate::Info(info) => {
                (base & !(NOTIFY_INFO_FIELDS | STATE_DELETED)) | info.field_bits()
            }
        }
    }

    fn body_len(&self) -> usize {
        8 + match &self.update {
            NotifyIconUpdate::Deleted => 0,
            NotifyIconUpdate::Info(info) => info.encoded_len(),
        }
    }

    fn encode_body(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u32_le(self.window_id);
        dst.put_u32_le(self.notify_icon_id);
        match &self.update {
            NotifyIconUpdate::Deleted => Ok(()),
            NotifyIconUpdate::Info(info) => info.encode(dst),
        }
    }

    fn decode_body(src: &mut &[u8], fields: u32) -> Result<Self, DecodeError> {
        let window_id = read_u32(src)?;
        let notify_icon_id = read_u32(src)?;
        let update = if fields & STATE_DELETED != 0 {
            NotifyIconUpdate::Deleted
        } else {
            NotifyIconUpdate::Info(Box::new(NotifyIconInfo::decode(src, fields)?))
        };
        Ok(Self {
            fields_present: fields,
            window_id,
            notify_icon_id,
            update,
        })
    }
}

/// Desktop properties carried by a monitored desktop order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DesktopInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_window_id: Option<u32>,
    /// Window ids front to back. At most 255 entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z_order: Option<Vec<u32>>,
}

impl DesktopInfo {
    fn field_bits(&self) -> u32 {
        let mut bits = 0;
        if self.active_window_id.is_some() {
            bits |= FIELD_DESKTOP_ACTIVEWND;
        }
        if self.z_order.is_some() {
            bits |= FIELD_DESKTOP_ZORDER;
        }
        bits
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum DesktopUpdate {
    /// The server stopped monitoring the desktop.
    NonMonitored,
    Info(DesktopInfo),
}

/// Desktop information order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DesktopRecord {
    pub fields_present: u32,
    pub update: DesktopUpdate,
}

impl DesktopRecord {
    pub fn non_monitored() -> Self {
        Self {
            fields_present: TYPE_DESKTOP | FIELD_DESKTOP_NONE,
            update: DesktopUpdate::NonMonitored,
        }
    }

    /// `flags` may carry the HOOKED and ARC bits, which have no data.
    pub fn info(flags: u32, info: DesktopInfo) -> Self {
        Self {
            fields_present: TYPE_DESKTOP | (flags & !DESKTOP_DATA_FIELDS) | info.field_bits(),
            update: DesktopUpdate::Info(info),
        }
    }

    pub fn is_hooked(&self) -> bool {
        self.fields_present & FIELD_DESKTOP_HOOKED != 0
    }

    pub fn arc_began(&self) -> bool {
        self.fields_present & FIELD_DESKTOP_ARC_BEGAN != 0
    }

    pub fn arc_completed(&self) -> bool {
        self.fields_present & FIELD_DESKTOP_ARC_COMPLETED != 0
    }

    fn wire_flags(&self) -> u32 {
        let base = self.fields_present | TYPE_DESKTOP;
        match &self.update {
            DesktopUpdate::NonMonitored => base | FIELD_DESKTOP_NONE,
            DesktopUpdate::Info(info) => (base & !DESKTOP_DATA_FIELDS) | info.field_bits(),
        }
    }

    fn body_len(&self) -> usize {
        match &self.update {
            DesktopUpdate::NonMonitored => 0,
            DesktopUpdate::Info(info) => {
                info.active_window_id.map_or(0, |_| 4)
                    + info.z_order.as_ref().map_or(0, |ids| 1 + ids.len() * 4)
            }
        }
    }

    fn encode_body(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        let DesktopUpdate::Info(info) = &self.update else {
            return Ok(());
        };
        if let Some(active) = info.active_window_id {
            dst.put_u32_le(active);
        }
        if let Some(ids) = &info.z_order {
            let count = u8::try_from(ids.len()).map_err(|_| EncodeError::FieldTooLong {
                field: "NumWindowIds",
                len: ids.len(),
                max: u8::MAX as usize,
            })?;
            dst.put_u8(count);
            for id in ids {
                dst.put_u32_le(*id);
            }
        }
        Ok(())
    }

    fn decode_body(src: &mut &[u8], fields: u32) -> Result<Self, DecodeError> {
        if fields & FIELD_DESKTOP_NONE != 0 {
            return Ok(Self {
                fields_present: fields,
                update: DesktopUpdate::NonMonitored,
            });
        }

        let mut info = DesktopInfo::default();
        if fields & FIELD_DESKTOP_ACTIVEWND != 0 {
            info.active_window_id = Some(read_u32(src)?);
        }
        if fields & FIELD_DESKTOP_ZORDER != 0 {
            let count = usize::from(read_u8(src)?);
            ensure_items(src, count, 4)?;
            let ids = (0..count)
                .map(|_| read_u32(src))
                .collect::<Result<Vec<_>, _>>()?;
            info.z_order = Some(ids);
        }
        Ok(Self {
            fields_present: fields,
            update: DesktopUpdate::Info(info),
        })
    }
}

/// One windowing alternate secondary order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "record", content = "body", rename_all = "snake_case")]
pub enum WindowOrder {
    Window(WindowRecord),
    NotifyIcon(NotifyIconRecord),
    Desktop(DesktopRecord),
}

impl WindowOrder {
    /// The FieldsPresentFlags this order was decoded with or will carry.
    pub fn fields_present(&self) -> u32 {
        match self {
            Self::Window(record) => record.wire_flags(),
            Self::NotifyIcon(record) => record.wire_flags(),
            Self::Desktop(record) => record.wire_flags(),
        }
    }

    fn body_len(&self) -> usize {
        match self {
            Self::Window(record) => record.body_len(),
            Self::NotifyIcon(record) => record.body_len(),
            Self::Desktop(record) => record.body_len(),
        }
    }
}

/// Encode an order, recomputing `OrderSize`.
pub fn encode_window_order(order: &WindowOrder) -> Result<Bytes, EncodeError> {
    let total = ORDER_HEADER_SIZE + order.body_len();
    let order_size = u16::try_from(total + ALTSEC_HEADER_SIZE).map_err(|_| EncodeError::FieldTooLong {
        field: "OrderSize",
        len: total + ALTSEC_HEADER_SIZE,
        max: u16::MAX as usize,
    })?;

    let mut dst = BytesMut::with_capacity(total);
    dst.put_u16_le(order_size);
    dst.put_u32_le(order.fields_present());
    match order {
        WindowOrder::Window(record) => record.encode_body(&mut dst)?,
        WindowOrder::NotifyIcon(record) => record.encode_body(&mut dst)?,
        WindowOrder::Desktop(record) => record.encode_body(&mut dst)?,
    }
    debug_assert_eq!(dst.len(), total, "window order length mismatch");
    Ok(dst.freeze())
}

/// Decode one order starting at its `OrderSize` field.
///
/// The record kind is chosen by the first of TYPE_WINDOW, TYPE_NOTIFY and
/// TYPE_DESKTOP that is set; input with none of them is rejected.
pub fn decode_window_order(src: &[u8]) -> Result<WindowOrder, DecodeError> {
    let mut cursor = src;
    let order_size = usize::from(read_u16(&mut cursor)?);
    let fields = read_u32(&mut cursor)?;

    let min = ORDER_HEADER_SIZE + ALTSEC_HEADER_SIZE;
    if order_size < min {
        return Err(DecodeError::Inconsistent(format!(
            "OrderSize {order_size} is shorter than the {min}-byte order header"
        )));
    }
    let len = order_size - ALTSEC_HEADER_SIZE;
    ensure(src, len)?;
    let mut body = &src[ORDER_HEADER_SIZE..len];

    let order = if fields & TYPE_WINDOW != 0 {
        WindowOrder::Window(WindowRecord::decode_body(&mut body, fields)?)
    } else if fields & TYPE_NOTIFY != 0 {
        WindowOrder::NotifyIcon(NotifyIconRecord::decode_body(&mut body, fields)?)
    } else if fields & TYPE_DESKTOP != 0 {
        WindowOrder::Desktop(DesktopRecord::decode_body(&mut body, fields)?)
    } else {
        return Err(DecodeError::UnknownOrder {
            kind: "window order type",
            value: fields,
        });
    };

    if !body.is_empty() {
        tracing::trace!(
            fields_present = fields,
            trailing = body.len(),
            "tolerating trailing window order bytes"
        );
    }
    Ok(order)
}

fn new_bit(is_new: bool) -> u32 {
    if is_new {
        STATE_NEW
    } else {
        0
    }
}

fn big_bit(big: bool) -> u32 {
    if big {
        FIELD_ICON_BIG
    } else {
        0
    }
}

fn put_point(dst: &mut BytesMut, point: Point32) {
    dst.put_i32_le(point.x);
    dst.put_i32_le(point.y);
}

fn read_point(src: &mut &[u8]) -> Result<Point32, DecodeError> {
    Ok(Point32 {
        x: read_i32(src)?,
        y: read_i32(src)?,
    })
}

fn put_size(dst: &mut BytesMut, size: Size32) {
    dst.put_u32_le(size.width);
    dst.put_u32_le(size.height);
}

fn read_size(src: &mut &[u8]) -> Result<Size32, DecodeError> {
    Ok(Size32 {
        width: read_u32(src)?,
        height: read_u32(src)?,
    })
}

fn put_rects(dst: &mut BytesMut, field: &'static str, rects: &[Rect16]) -> Result<(), EncodeError> {
    let count = u32::try_from(rects.len()).map_err(|_| EncodeError::FieldTooLong {
        field,
        len: rects.len(),
        max: u32::MAX as usize,
    })?;
    dst.put_u32_le(count);
    for rect in rects {
        rect.encode(dst);
    }
    Ok(())
}

fn read_rects(src: &mut &[u8]) -> Result<Vec<Rect16>, DecodeError> {
    let count = read_u32(src)? as usize;
    ensure_items(src, count, Rect16::SIZE)?;
    (0..count).map(|_| Rect16::decode(src)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_window_info() -> WindowInfo {
        WindowInfo {
            owner_window_id: Some(0x100),
            style: Some(WindowStyle {
                style: 0x14CF_0000,
                extended_style: 0x0000_0100,
            }),
            show_state: Some(5),
            title: Some(UnicodeString::from_utf16("Untitled - Notepad")),
            client_offset: Some(Point32::new(8, 51)),
            client_area_size: Some(Size32::new(640, 480)),
            rp_content: Some(1),
            root_parent: Some(0x200),
            window_offset: Some(Point32::new(-4, -4)),
            window_client_delta: Some(Point32::new(8, 51)),
            window_size: Some(Size32::new(656, 539)),
            window_rects: Some(vec![Rect16::new(0, 0, 656, 539)]),
            visible_offset: Some(Point32::new(0, 0)),
            visibility_rects: Some(vec![Rect16::new(0, 0, 100, 100), Rect16::new(100, 0, 656, 539)]),
        }
    }

    fn samples() -> Vec<WindowOrder> {
        vec![
            WindowOrder::Window(WindowRecord::info(0x10, true, full_window_info())),
            WindowOrder::Window(WindowRecord::info(
                0x10,
                false,
                WindowInfo {
                    show_state: Some(0),
                    ..Default::default()
                },
            )),
            WindowOrder::Window(WindowRecord::info(0x11, false, WindowInfo::default())),
            WindowOrder::Window(WindowRecord::deleted(0x10)),
            WindowOrder::Window(WindowRecord::icon(
                0x10,
                true,
                true,
                IconInfo {
                    cache_info: CachedIconInfo {
                        cache_id: 1,
                        cache_entry_id: 3,
                    },
                    bpp: 8,
                    width: 16,
                    height: 16,
                    color_table: Some(vec![0x55; 8]),
                    bits_mask: vec![0xFF; 32],
                    bits_color: vec![0x01; 256],
                },
            )),
            WindowOrder::Window(WindowRecord::cached_icon(
                0x10,
                false,
                false,
                CachedIconInfo {
                    cache_id: 1,
                    cache_entry_id: 3,
                },
            )),
            WindowOrder::NotifyIcon(NotifyIconRecord::info(
                0x10,
                7,
                true,
                NotifyIconInfo {
                    version: Some(4),
                    tool_tip: Some(UnicodeString::from_utf16("Volume")),
                    info_tip: Some(NotifyIconInfoTip {
                        timeout: 10_000,
                        info_flags: 1,
                        text: UnicodeString::from_utf16("Muted"),
                        title: UnicodeString::default(),
                    }),
                    state: Some(1),
                    icon: Some(IconInfo {
                        bpp: 32,
                        width: 16,
                        height: 16,
                        bits_color: vec![0; 64],
                        ..Default::default()
                    }),
                    cached_icon: None,
                },
            )),
            WindowOrder::NotifyIcon(NotifyIconRecord::info(
                0x10,
                7,
                false,
                NotifyIconInfo {
                    cached_icon: Some(CachedIconInfo {
                        cache_id: 0,
                        cache_entry_id: 9,
                    }),
                    ..Default::default()
                },
            )),
            WindowOrder::NotifyIcon(NotifyIconRecord::deleted(0x10, 7)),
            WindowOrder::Desktop(DesktopRecord::non_monitored()),
            WindowOrder::Desktop(DesktopRecord::info(
                FIELD_DESKTOP_HOOKED | FIELD_DESKTOP_ARC_BEGAN,
                DesktopInfo {
                    active_window_id: Some(0x10),
                    z_order: Some(vec![0x10, 0x20, 0x30]),
                },
            )),
            WindowOrder::Desktop(DesktopRecord::info(
                FIELD_DESKTOP_ARC_COMPLETED,
                DesktopInfo::default(),
            )),
        ]
    }

    #[test]
    fn every_order_round_trips() {
        for order in samples() {
            let encoded = encode_window_order(&order).unwrap();
            let order_size = u16::from_le_bytes([encoded[0], encoded[1]]);
            assert_eq!(usize::from(order_size), encoded.len() + ALTSEC_HEADER_SIZE);
            assert_eq!(decode_window_order(&encoded).unwrap(), order);
        }
    }

    #[test]
    fn every_prefix_is_truncated() {
        for order in samples() {
            let encoded = encode_window_order(&order).unwrap();
            for cut in 0..encoded.len() {
                assert!(matches!(
                    decode_window_order(&encoded[..cut]),
                    Err(DecodeError::Truncated { .. })
                ));
            }
        }
    }

    #[test]
    fn deleted_window_reads_only_the_id() {
        // OrderSize 11, TYPE_WINDOW | STATE_DELETED | FIELD_TITLE, window id 5.
        let bytes = [
            0x0Bu8, 0x00, 0x04, 0x00, 0x00, 0x21, 0x05, 0x00, 0x00, 0x00,
        ];
        let order = decode_window_order(&bytes).unwrap();
        let WindowOrder::Window(record) = order else {
            panic!("expected window record");
        };
        assert_eq!(record.window_id, 5);
        assert_eq!(record.update, WindowUpdate::Deleted);
    }

    #[test]
    fn notify_cached_icon_uses_its_own_flag() {
        let order = WindowOrder::NotifyIcon(NotifyIconRecord::info(
            1,
            2,
            false,
            NotifyIconInfo {
                cached_icon: Some(CachedIconInfo {
                    cache_id: 4,
                    cache_entry_id: 5,
                }),
                ..Default::default()
            },
        ));
        let flags = order.fields_present();
        assert_ne!(flags & CACHED_ICON, 0);
        assert_eq!(flags & ICON, 0);
    }

    #[test]
    fn window_type_wins_over_notify() {
        let order = WindowOrder::Window(WindowRecord::deleted(3));
        let mut encoded = encode_window_order(&order).unwrap().to_vec();
        encoded[5] |= (TYPE_NOTIFY >> 24) as u8;
        assert!(matches!(
            decode_window_order(&encoded).unwrap(),
            WindowOrder::Window(_)
        ));
    }

    #[test]
    fn missing_type_bit_is_unknown() {
        let bytes = [0x07u8, 0x00, 0x04, 0x00, 0x00, 0x00];
        assert_eq!(
            decode_window_order(&bytes).unwrap_err(),
            DecodeError::UnknownOrder {
                kind: "window order type",
                value: FIELD_TITLE
            }
        );
    }

    #[test]
    fn order_size_below_header_is_inconsistent() {
        let bytes = [0x03u8, 0x00, 0x00, 0x00, 0x00, 0x01];
        assert!(matches!(
            decode_window_order(&bytes),
            Err(DecodeError::Inconsistent(_))
        ));
    }

    #[test]
    fn huge_rect_count_fails_before_allocating() {
        let mut bytes = vec![0u8; 2];
        bytes.extend_from_slice(&(TYPE_WINDOW | FIELD_WND_RECTS).to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        let size = (bytes.len() + ALTSEC_HEADER_SIZE) as u16;
        bytes[..2].copy_from_slice(&size.to_le_bytes());

        assert!(matches!(
            decode_window_order(&bytes),
            Err(DecodeError::Truncated { .. })
        ));
    }

    #[test]
    fn desktop_flags_are_reported() {
        let record = DesktopRecord::info(
            FIELD_DESKTOP_HOOKED | FIELD_DESKTOP_ARC_BEGAN,
            DesktopInfo::default(),
        );
        assert!(record.is_hooked());
        assert!(record.arc_began());
        assert!(!record.arc_completed());
    }

    #[test]
    fn oversized_z_order_is_rejected() {
        let order = WindowOrder::Desktop(DesktopRecord::info(
            0,
            DesktopInfo {
                active_window_id: None,
                z_order: Some(vec![0; 256]),
            },
        ));
        assert!(matches!(
            encode_window_order(&order),
            Err(EncodeError::FieldTooLong { .. })
        ));
    }
}
