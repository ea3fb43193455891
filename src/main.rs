use std::process::ExitCode;

fn main() -> ExitCode {
    match simple_changeset::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
