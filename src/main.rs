use std::env::args_os;
use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    let status = decus_grep_rust::run(args_os().skip(1), io::stdout().lock(), io::stderr().lock());
    let _ = io::stdout().flush();
    ExitCode::from(status)
}
