use std::process::ExitCode;

fn main() -> ExitCode {
    staywise_cli::run()
}
