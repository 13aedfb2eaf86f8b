//! RAIL order types and protocol flag values.
//!
//! Order types identify the payload that follows the 4-byte PDU header.
//! Some types are valid in one direction only; [`is_valid_for`] tells
//! which.

use serde::Serialize;

/// Client Execute PDU.
pub const EXEC: u16 = 0x0001;
/// Client Activate PDU.
pub const ACTIVATE: u16 = 0x0002;
/// System parameters update, either direction.
pub const SYSPARAM: u16 = 0x0003;
/// Client System Command PDU.
pub const SYSCOMMAND: u16 = 0x0004;
/// Handshake PDU, either direction.
pub const HANDSHAKE: u16 = 0x0005;
/// Client Notify Event PDU.
pub const NOTIFY_EVENT: u16 = 0x0006;
/// Client Window Move PDU.
pub const WINDOWMOVE: u16 = 0x0008;
/// Server Move/Size Start and End PDUs.
pub const LOCALMOVESIZE: u16 = 0x0009;
/// Server Min Max Info PDU.
pub const MINMAXINFO: u16 = 0x000A;
/// Client Information PDU.
pub const CLIENTSTATUS: u16 = 0x000B;
/// Client System Menu PDU.
pub const SYSMENU: u16 = 0x000C;
/// Language Bar Information PDU, either direction.
pub const LANGBARINFO: u16 = 0x000D;
/// Client Get Application ID PDU.
pub const GET_APPID_REQ: u16 = 0x000E;
/// Server Get Application ID Response PDU.
pub const GET_APPID_RESP: u16 = 0x000F;
/// Server Execute Result PDU.
pub const EXEC_RESULT: u16 = 0x0080;

/// Client build number sent in the client Handshake PDU.
pub const CLIENT_BUILD_NUMBER: u32 = 0x0000_1DB0;

/// Client Information flag: the client supports local move/size.
pub const CLIENTSTATUS_ALLOWLOCALMOVESIZE: u32 = 0x0000_0001;

/// Exec flag: expand environment variables in the working directory.
pub const EXEC_FLAG_EXPAND_WORKINGDIRECTORY: u16 = 0x0001;
/// Exec flag: translate local file paths to server paths.
pub const EXEC_FLAG_TRANSLATE_FILES: u16 = 0x0002;
/// Exec flag: the executable field names a file to open.
pub const EXEC_FLAG_FILE: u16 = 0x0004;
/// Exec flag: expand environment variables in the arguments.
pub const EXEC_FLAG_EXPAND_ARGUMENTS: u16 = 0x0008;

/// Exec result: the application was launched.
pub const EXEC_S_OK: u16 = 0x0000;
/// Exec result: the shell hook is not loaded.
pub const EXEC_E_HOOK_NOT_LOADED: u16 = 0x0001;
/// Exec result: the request could not be decoded.
pub const EXEC_E_DECODE_FAILED: u16 = 0x0002;
/// Exec result: the application is not on the server allow list.
pub const EXEC_E_NOT_IN_ALLOWLIST: u16 = 0x0003;
/// Exec result: the executable was not found.
pub const EXEC_E_FILE_NOT_FOUND: u16 = 0x0005;
/// Exec result: generic launch failure.
pub const EXEC_E_FAIL: u16 = 0x0006;
/// Exec result: the remote session is locked.
pub const EXEC_E_SESSION_LOCKED: u16 = 0x0007;

/// Which side of the channel sent a PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    ClientToServer,
    ServerToClient,
}

/// Returns a human-readable name for an order type.
pub fn order_name(order_type: u16) -> &'static str {
    match order_type {
        EXEC => "EXEC",
        ACTIVATE => "ACTIVATE",
        SYSPARAM => "SYSPARAM",
        SYSCOMMAND => "SYSCOMMAND",
        HANDSHAKE => "HANDSHAKE",
        NOTIFY_EVENT => "NOTIFY_EVENT",
        WINDOWMOVE => "WINDOWMOVE",
        LOCALMOVESIZE => "LOCALMOVESIZE",
        MINMAXINFO => "MINMAXINFO",
        CLIENTSTATUS => "CLIENTSTATUS",
        SYSMENU => "SYSMENU",
        LANGBARINFO => "LANGBARINFO",
        GET_APPID_REQ => "GET_APPID_REQ",
        GET_APPID_RESP => "GET_APPID_RESP",
        EXEC_RESULT => "EXEC_RESULT",
        _ => "UNKNOWN",
    }
}

/// Returns true if `order_type` may be sent in `direction`.
pub fn is_valid_for(order_type: u16, direction: Direction) -> bool {
    match direction {
        Direction::ClientToServer => matches!(
            order_type,
            EXEC | ACTIVATE
                | SYSPARAM
                | SYSCOMMAND
                | HANDSHAKE
                | NOTIFY_EVENT
                | WINDOWMOVE
                | CLIENTSTATUS
                | SYSMENU
                | LANGBARINFO
                | GET_APPID_REQ
        ),
        Direction::ServerToClient => matches!(
            order_type,
            HANDSHAKE
                | EXEC_RESULT
                | SYSPARAM
                | LOCALMOVESIZE
                | MINMAXINFO
                | LANGBARINFO
                | GET_APPID_RESP
        ),
    }
}

/// Returns a human-readable name for an exec result code.
pub fn exec_result_name(code: u16) -> &'static str {
    match code {
        EXEC_S_OK => "S_OK",
        EXEC_E_HOOK_NOT_LOADED => "E_HOOK_NOT_LOADED",
        EXEC_E_DECODE_FAILED => "E_DECODE_FAILED",
        EXEC_E_NOT_IN_ALLOWLIST => "E_NOT_IN_ALLOWLIST",
        EXEC_E_FILE_NOT_FOUND => "E_FILE_NOT_FOUND",
        EXEC_E_FAIL => "E_FAIL",
        EXEC_E_SESSION_LOCKED => "E_SESSION_LOCKED",
        _ => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_orders_are_valid_both_ways() {
        for order in [HANDSHAKE, SYSPARAM, LANGBARINFO] {
            assert!(is_valid_for(order, Direction::ClientToServer));
            assert!(is_valid_for(order, Direction::ServerToClient));
        }
    }

    #[test]
    fn one_way_orders() {
        assert!(is_valid_for(EXEC, Direction::ClientToServer));
        assert!(!is_valid_for(EXEC, Direction::ServerToClient));
        assert!(is_valid_for(EXEC_RESULT, Direction::ServerToClient));
        assert!(!is_valid_for(EXEC_RESULT, Direction::ClientToServer));
        assert!(!is_valid_for(0x0007, Direction::ClientToServer));
    }

    #[test]
    fn names() {
        assert_eq!(order_name(GET_APPID_RESP), "GET_APPID_RESP");
        assert_eq!(order_name(0x1234), "UNKNOWN");
        assert_eq!(exec_result_name(EXEC_E_FILE_NOT_FOUND), "E_FILE_NOT_FOUND");
    }
}
