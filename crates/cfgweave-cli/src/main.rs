use std::process::ExitCode;

fn main() -> ExitCode {
    cfgweave_cli::run()
}
