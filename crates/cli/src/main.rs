use std::process::ExitCode;

fn main() -> ExitCode {
    crosssell_cli::run()
}
