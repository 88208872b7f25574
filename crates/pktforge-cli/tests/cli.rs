use assert_cmd::Command;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use serde_json::Value;
use tempfile::TempDir;

/// IPv4 / UDP 12345 -> 53 / DNS query for "a." with RD set.
const DNS_QUERY_HEX: &str = "4500002f00010000401100000a0000010a000002\
                             30390035001b0000\
                             12340100000100000000000001610000010001";

fn cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("pktforge"))
}

fn dns_query_bytes() -> Vec<u8> {
    let digits: String = DNS_QUERY_HEX.split_whitespace().collect();
    (0..digits.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&digits[i..i + 2], 16).expect("hex"))
        .collect()
}

#[test]
fn help_lists_decode() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("decode"));
    cmd().arg("decode").arg("--help").assert().success();
}

#[test]
fn hex_input_renders_every_layer() {
    cmd()
        .arg("decode")
        .arg("--hex")
        .arg(DNS_QUERY_HEX)
        .assert()
        .success()
        .stdout(
            contains("[IPv4 Header")
                .and(contains("[UDP Header"))
                .and(contains("[DNS Header")),
        );
}

#[test]
fn json_output_is_a_layer_tree() {
    let assert = cmd()
        .arg("decode")
        .arg("--hex")
        .arg(DNS_QUERY_HEX)
        .arg("--json")
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout");
    let value: Value = serde_json::from_str(&stdout).expect("valid json");
    assert_eq!(value["protocol"], "IPv4");
    assert_eq!(value["payload"]["protocol"], "UDP");
    assert_eq!(value["payload"]["payload"]["protocol"], "DNS");
}

#[test]
fn file_input_and_protocol_flag() {
    let temp = TempDir::new().expect("tempdir");
    let input = temp.path().join("udp.bin");
    std::fs::write(&input, &dns_query_bytes()[20..]).expect("write input");

    cmd()
        .arg("decode")
        .arg(&input)
        .arg("--protocol")
        .arg("udp")
        .arg("--json")
        .arg("--pretty")
        .assert()
        .success()
        .stdout(contains("\"protocol\": \"UDP\""));
}

#[test]
fn glob_matching_several_files_is_rejected() {
    let temp = TempDir::new().expect("tempdir");
    for name in ["a.bin", "b.bin"] {
        std::fs::write(temp.path().join(name), [0u8; 4]).expect("write input");
    }
    let pattern = temp.path().join("*.bin");

    cmd()
        .arg("decode")
        .arg(pattern)
        .assert()
        .failure()
        .code(2)
        .stderr(contains("multiple files match").and(contains("hint:")));
}

#[test]
fn missing_input_shows_error_and_hint() {
    let temp = TempDir::new().expect("tempdir");
    let missing = temp.path().join("missing.bin");

    cmd()
        .arg("decode")
        .arg(missing)
        .assert()
        .failure()
        .code(2)
        .stderr(contains("error:").and(contains("hint:")));
}

#[test]
fn bad_hex_is_rejected() {
    cmd()
        .arg("decode")
        .arg("--hex")
        .arg("45z0")
        .assert()
        .failure()
        .stderr(contains("invalid hex byte"));
    cmd()
        .arg("decode")
        .arg("--hex")
        .arg("450")
        .assert()
        .failure()
        .stderr(contains("odd number of hex digits"));
}

#[test]
fn truncated_packet_reports_decode_error() {
    cmd()
        .arg("decode")
        .arg("--hex")
        .arg("4500")
        .assert()
        .failure()
        .code(2)
        .stderr(contains("decode failed").and(contains("--protocol")));
}

#[test]
fn pretty_requires_json() {
    cmd()
        .arg("decode")
        .arg("--hex")
        .arg(DNS_QUERY_HEX)
        .arg("--pretty")
        .assert()
        .failure();
}
