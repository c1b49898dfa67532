//! Parser tests for console command line parsing

use rust_net_cw_keyer::console::parser::{parse_line, ParsedCommand};

#[test]
fn test_parse_simple_command() {
    let cmd = parse_line("help");
    assert_eq!(cmd.command, "help");
    assert_eq!(cmd.args[0], None);
}

#[test]
fn test_parse_command_with_one_arg() {
    let cmd = parse_line("debug trace");
    assert_eq!(cmd.command, "debug");
    assert_eq!(cmd.args[0], Some("trace"));
    assert_eq!(cmd.args[1], None);
}

#[test]
fn test_parse_command_with_two_args() {
    let cmd = parse_line("set wpm 25");
    assert_eq!(cmd.command, "set");
    assert_eq!(cmd.args[0], Some("wpm"));
    assert_eq!(cmd.args[1], Some("25"));
    assert_eq!(cmd.args[2], None);
}

#[test]
fn test_parse_trims_whitespace() {
    let cmd = parse_line("  play   2  ");
    assert_eq!(cmd.command, "play");
    assert_eq!(cmd.args[0], Some("2"));
}

#[test]
fn test_parse_empty_line() {
    let cmd = parse_line("");
    assert_eq!(cmd.command, "");
}

#[test]
fn test_parse_max_args() {
    let cmd = parse_line("store 1 CQ DE TEST");
    assert_eq!(cmd.command, "store");
    assert_eq!(cmd.args[0], Some("1"));
    assert_eq!(cmd.args[1], Some("CQ"));
    assert_eq!(cmd.args[2], Some("DE"));
    // "TEST" is only reachable through rest_from
}

#[test]
fn test_rest_of_line_keeps_inner_spacing() {
    let cmd = parse_line("send  CQ  CQ DE TEST");
    assert_eq!(cmd.rest_from(0), Some("CQ  CQ DE TEST"));

    let cmd = parse_line("store 3 73 ES GL");
    assert_eq!(cmd.arg(0), Some("3"));
    assert_eq!(cmd.rest_from(1), Some("73 ES GL"));
    assert_eq!(cmd.rest_from(4), None);
}

#[test]
fn test_empty_command_is_blank() {
    let cmd = ParsedCommand::empty();
    assert_eq!(cmd.command, "");
    assert_eq!(cmd.arg(0), None);
}
