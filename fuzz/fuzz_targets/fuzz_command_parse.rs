//! Fuzz target: `RemoteCommand::parse`
//!
//! Drives arbitrary message bodies into the command parser and asserts
//! that it never panics, that every accepted command has a name and
//! re-encodes within the body limit, and that re-encoding an accepted command parses back to the same command
//! (unless its last argument is empty, which encodes as a trailing NUL).
//!
//! cargo fuzz run fuzz_command_parse

#![no_main]

use libfuzzer_sys::fuzz_target;
use pinsync::app::commands::RemoteCommand;

fuzz_target!(|data: &[u8]| {
    let Ok(cmd) = RemoteCommand::parse(data) else {
        return;
    };
    assert!(!cmd.name.is_empty(), "parser accepted an empty name");

    let body = cmd.encode().expect("accepted command must fit the body limit");
    if !cmd.args.last().is_some_and(|a| a.is_empty()) {
        let again = RemoteCommand::parse(&body).expect("encoded command must parse");
        assert_eq!(again, cmd);
    }
});
