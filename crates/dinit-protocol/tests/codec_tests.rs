//! Round-trip tests for the command line and socket codecs.

use dinit_protocol::{
    DecodeError, decode, decode_payload, encode, encode_payload, resolve_program, split, wire,
};

fn split_words(cmdline: &str) -> Vec<String> {
    cmdline.split_whitespace().map(str::to_string).collect()
}

#[test]
fn test_command_line_round_trip() {
    let cmdline = "-r /bin/sleep 10 -r /bin/echo -- \\-r";
    let decoded = decode(split_words(cmdline)).unwrap();

    assert!(decoded.flags.is_empty());
    assert_eq!(encode(&decoded.commands).join(" "), cmdline);
}

#[test]
fn test_round_trip_keeps_argument_with_spaces() {
    let cmdline = vec!["-r", "/bin/sh", "-c", "/bin/sleep 10"];
    let decoded = decode(cmdline.clone()).unwrap();

    assert!(decoded.flags.is_empty());
    assert_eq!(encode(&decoded.commands), cmdline);
}

#[test]
fn test_split_of_encoding_is_identity() {
    let decoded = decode(["-r", "/bin/echo", "\\-r", "-r", "/bin/sh", "-c", "exit 3"]).unwrap();
    let again = split(encode(&decoded.commands)).unwrap();

    assert_eq!(again.commands, decoded.commands);
    let argvs: Vec<_> = again.commands.iter().map(|c| c.argv().to_vec()).collect();
    assert_eq!(argvs[0], vec!["/bin/echo", "-r"]);
    assert_eq!(argvs[1], vec!["/bin/sh", "-c", "exit 3"]);
}

#[test]
fn test_payload_round_trip() {
    let decoded = decode(["-r", "/bin/sh", "-c", "echo \"a b\" && sleep 1", "-r", "/bin/echo", "\\-r"]).unwrap();

    let payload = encode_payload(&decoded.commands).unwrap();
    let received = decode_payload(&payload).unwrap();

    assert!(received.flags.is_empty());
    assert_eq!(received.commands, decoded.commands);
}

#[test]
fn test_payload_matches_token_stream() {
    let decoded = decode(["-r", "/bin/sh", "-c", "sleep 10"]).unwrap();
    let payload = encode_payload(&decoded.commands).unwrap();

    assert_eq!(wire::from_bytes(&payload).unwrap(), encode(&decoded.commands));
}

#[test]
fn test_empty_payload_is_decode_error() {
    let err = decode_payload(b"").unwrap_err();
    assert!(matches!(err, DecodeError::Wire(_)));
}

#[test]
fn test_payload_with_trailing_run_flag() {
    let err = decode_payload(b"-r /bin/sh -r\n").unwrap_err();
    assert!(matches!(err, DecodeError::MissingCommand));
}

#[test]
fn test_arguments_expand_environment() {
    let var = "DINIT_CODEC_TEST_VAR";

    // SAFETY: the variable name is unique to this test.
    unsafe { std::env::set_var(var, "") };
    let decoded = decode(["-r", "/bin/echo", "$DINIT_CODEC_TEST_VAR"]).unwrap();
    assert_eq!(decoded.commands.iter().next().unwrap().args(), [""]);

    unsafe { std::env::set_var(var, "blah") };
    let decoded = decode(["-r", "/bin/echo", "$DINIT_CODEC_TEST_VAR.morestuff"]).unwrap();
    assert_eq!(
        decoded.commands.iter().next().unwrap().args(),
        ["blah.morestuff"]
    );

    let decoded = decode(["-r", "/bin/echo", "${DINIT_CODEC_TEST_VAR}x"]).unwrap();
    assert_eq!(decoded.commands.iter().next().unwrap().args(), ["blahx"]);
}

#[test]
fn test_flags_stop_at_first_command() {
    let decoded = decode(["dinit", "--primary", "-r", "/bin/echo", "--primary"]).unwrap();

    assert_eq!(decoded.flags, vec!["dinit", "--primary"]);
    assert_eq!(decoded.commands.iter().next().unwrap().args(), ["--primary"]);
}

#[test]
fn test_expanded_values_survive_round_trip() {
    // Values that look like a variable reference or an escape must not be
    // expanded or unescaped a second time.
    // SAFETY: the variable names are unique to this test.
    unsafe {
        std::env::set_var("DINIT_CODEC_DOLLAR_VAR", "$HOME");
        std::env::set_var("DINIT_CODEC_ESCAPE_VAR", "\\-r");
    }
    let decoded = decode([
        "-r",
        "/bin/echo",
        "$DINIT_CODEC_DOLLAR_VAR",
        "$DINIT_CODEC_ESCAPE_VAR",
        "\\-r",
    ])
    .unwrap();
    let spec = decoded.commands.iter().next().unwrap();
    assert_eq!(spec.args(), ["$HOME", "\\-r", "-r"]);

    let again = split(encode(&decoded.commands)).unwrap();
    assert_eq!(again.commands, decoded.commands);

    let payload = encode_payload(&decoded.commands).unwrap();
    assert_eq!(decode_payload(&payload).unwrap().commands, decoded.commands);
}

#[test]
fn test_payload_leaves_executable_unresolved() {
    let decoded = decode_payload(b"-r sleep $HOME").unwrap();
    let spec = decoded.commands.iter().next().unwrap().clone();
    assert_eq!(spec.argv(), ["sleep", "$HOME"]);

    let resolved = resolve_program(spec).unwrap();
    assert!(resolved.program().ends_with("/sleep"));
    assert_eq!(resolved.args(), ["$HOME"]);

    let missing = decode_payload(b"-r dinit-no-such-binary-anywhere").unwrap();
    let spec = missing.commands.iter().next().unwrap().clone();
    assert!(matches!(
        resolve_program(spec),
        Err(DecodeError::Unresolvable { .. })
    ));
}
