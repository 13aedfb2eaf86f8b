use railchan_pdu::{
    decode_server_pdu, decode_window_order, encode_server_pdu, encode_window_order, ExecResultPdu,
    ServerPdu, ServerSysParam, UnicodeString, WindowInfo, WindowOrder, WindowRecord,
};

#[test]
fn server_pdu_serializes_with_order_tag() {
    let pdu = ServerPdu::ExecResult(ExecResultPdu {
        flags: 0,
        exec_result: 3,
        raw_result: 0,
        exe_or_file: UnicodeString::from_utf16("calc.exe"),
    });
    let bytes = encode_server_pdu(&pdu).unwrap();
    let decoded = decode_server_pdu(&bytes).unwrap();

    let value = serde_json::to_value(&decoded).unwrap();
    assert_eq!(value["order"], "exec_result");
    assert_eq!(value["body"]["exe_or_file"], "calc.exe");
    assert_eq!(value["body"]["exec_result"], 3);
}

#[test]
fn sysparam_serializes_with_param_tag() {
    let value = serde_json::to_value(ServerSysParam::ScreenSaveActive(true)).unwrap();
    assert_eq!(value["param"], "screen_save_active");
    assert_eq!(value["value"], true);
}

#[test]
fn window_order_omits_absent_fields() {
    let order = WindowOrder::Window(WindowRecord::info(
        0x42,
        true,
        WindowInfo {
            title: Some(UnicodeString::from_utf16("Calculator")),
            ..Default::default()
        },
    ));
    let decoded = decode_window_order(&encode_window_order(&order).unwrap()).unwrap();

    let value = serde_json::to_value(&decoded).unwrap();
    assert_eq!(value["record"], "window");
    assert_eq!(value["body"]["window_id"], 0x42);
    let info = &value["body"]["update"]["data"];
    assert_eq!(info["title"], "Calculator");
    assert!(info.get("owner_window_id").is_none());
}
